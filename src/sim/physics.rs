//! Rigid-body world for circular pieces
//!
//! `PhysicsWorld` is the narrow contract gameplay needs from a physics
//! engine: add/remove bodies, read position and velocity, push bodies
//! around, step, and report pairs that *began* touching. `RapierWorld`
//! implements it on top of a rapier2d pipeline.
//!
//! # Determinism
//!
//! rapier2d is built with `enhanced-determinism`. Contact pairs are sorted by
//! body handle before they are handed to gameplay, so a fixed timestep and a
//! seeded RNG replay the same run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Opaque body identifier (monotonic, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// What a body represents, used by the collision boundary filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyLabel {
    Wall,
    Piece,
    /// Cosmetic burst particle; never collides
    Particle,
}

/// Parameters for a dynamic circle body
#[derive(Debug, Clone, Copy)]
pub struct CircleDesc {
    pub pos: Vec2,
    pub radius: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Fraction of velocity lost per 1/60 s
    pub linear_drag: f32,
    pub label: BodyLabel,
    /// False = collision mask 0 (passes through everything)
    pub collides: bool,
}

impl CircleDesc {
    /// Gameplay ball with the standard material
    pub fn piece(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            restitution: BALL_RESTITUTION,
            friction: BALL_FRICTION,
            linear_drag: BALL_LINEAR_DRAG,
            label: BodyLabel::Piece,
            collides: true,
        }
    }

    /// Non-interacting effect particle
    pub fn particle(pos: Vec2, radius: f32, linear_drag: f32) -> Self {
        Self {
            pos,
            radius,
            restitution: 0.0,
            friction: 0.0,
            linear_drag,
            label: BodyLabel::Particle,
            collides: false,
        }
    }
}

/// Physics collaborator contract
pub trait PhysicsWorld {
    /// Static axis-aligned box (boundary wall)
    fn add_static_box(&mut self, center: Vec2, half_extents: Vec2) -> BodyHandle;
    fn add_circle(&mut self, desc: CircleDesc) -> BodyHandle;
    /// Returns false if the body was already gone
    fn remove(&mut self, handle: BodyHandle) -> bool;
    fn label(&self, handle: BodyHandle) -> Option<BodyLabel>;
    fn position(&self, handle: BodyHandle) -> Option<Vec2>;
    fn velocity(&self, handle: BodyHandle) -> Option<Vec2>;
    /// Instantaneous velocity change
    fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2);
    /// Continuous acceleration applied during the next step only
    fn apply_force(&mut self, handle: BodyHandle, accel: Vec2);
    fn step(&mut self, dt: f32);
    /// Drain "bodies began touching" pairs, in report order
    fn take_contacts(&mut self) -> Vec<(BodyHandle, BodyHandle)>;
    /// Bodies currently in contact with `handle` (ascending)
    fn touching(&self, handle: BodyHandle) -> Vec<BodyHandle>;
}

/// Drag per 1/60 s expressed as rapier's `1 / (1 + dt * damping)` damping
fn damping_for_drag(drag: f32) -> Real {
    let drag = drag.clamp(0.0, 0.99);
    60.0 * drag / (1.0 - drag)
}

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    body: RigidBodyHandle,
    label: BodyLabel,
}

/// rapier2d-backed world of circles and static boxes
pub struct RapierWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    entries: BTreeMap<BodyHandle, Entry>,
    collider_to_body: HashMap<ColliderHandle, BodyHandle>,
    /// Accelerations for the next step only
    pending_accel: BTreeMap<BodyHandle, Vec2>,
    contacts: Vec<(BodyHandle, BodyHandle)>,
    next_id: u32,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, GRAVITY))
    }
}

impl RapierWorld {
    pub fn new(gravity: Vec2) -> Self {
        let mut integration_params = IntegrationParameters::default();
        // Lengths are in pixels
        integration_params.length_unit = 100.0;
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: to_vector(gravity),
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            entries: BTreeMap::new(),
            collider_to_body: HashMap::new(),
            pending_accel: BTreeMap::new(),
            contacts: Vec::new(),
            next_id: 1,
        }
    }

    /// World with bottom/left/right walls around the play field (open top)
    pub fn with_field_walls() -> Self {
        let mut world = Self::default();
        let half_wall = WALL_THICKNESS / 2.0;
        // Bottom
        world.add_static_box(
            Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT + half_wall),
            Vec2::new(FIELD_WIDTH / 2.0, half_wall),
        );
        // Left
        world.add_static_box(
            Vec2::new(-half_wall, FIELD_HEIGHT / 2.0),
            Vec2::new(half_wall, FIELD_HEIGHT / 2.0),
        );
        // Right
        world.add_static_box(
            Vec2::new(FIELD_WIDTH + half_wall, FIELD_HEIGHT / 2.0),
            Vec2::new(half_wall, FIELD_HEIGHT / 2.0),
        );
        world
    }

    /// Handles of all bodies with the given label (ascending)
    pub fn bodies_with_label(&self, label: BodyLabel) -> Vec<BodyHandle> {
        self.entries
            .iter()
            .filter(|(_, e)| e.label == label)
            .map(|(h, _)| *h)
            .collect()
    }

    fn insert(&mut self, body: RigidBody, collider: Collider, label: BodyLabel) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;

        let body = self.rigid_body_set.insert(body);
        let collider = self
            .collider_set
            .insert_with_parent(collider, body, &mut self.rigid_body_set);
        self.collider_to_body.insert(collider, handle);
        self.entries.insert(handle, Entry { body, label });
        handle
    }

    fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        let entry = self.entries.get(&handle)?;
        self.rigid_body_set.get(entry.body)
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let entry = self.entries.get(&handle)?;
        self.rigid_body_set.get_mut(entry.body)
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_static_box(&mut self, center: Vec2, half_extents: Vec2) -> BodyHandle {
        let body = RigidBodyBuilder::fixed().translation(to_vector(center)).build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .restitution(0.0)
            .friction(BALL_FRICTION)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.insert(body, collider, BodyLabel::Wall)
    }

    fn add_circle(&mut self, desc: CircleDesc) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(desc.pos))
            .linear_damping(damping_for_drag(desc.linear_drag))
            .build();

        let mut collider = ColliderBuilder::ball(desc.radius)
            .restitution(desc.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .friction(desc.friction);
        collider = if desc.collides {
            collider.active_events(ActiveEvents::COLLISION_EVENTS)
        } else {
            collider.collision_groups(InteractionGroups::new(Group::NONE, Group::NONE))
        };
        self.insert(body, collider.build(), desc.label)
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let Some(entry) = self.entries.remove(&handle) else {
            return false;
        };
        self.pending_accel.remove(&handle);
        self.collider_to_body.retain(|_, h| *h != handle);
        self.rigid_body_set
            .remove(
                entry.body,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    fn label(&self, handle: BodyHandle) -> Option<BodyLabel> {
        self.entries.get(&handle).map(|e| e.label)
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.body(handle).map(|rb| to_vec2(rb.translation()))
    }

    fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.body(handle).map(|rb| to_vec2(rb.linvel()))
    }

    fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2) {
        if let Some(rb) = self.body_mut(handle) {
            if rb.is_dynamic() {
                rb.set_linvel(to_vector(vel), true);
            }
        }
    }

    fn apply_force(&mut self, handle: BodyHandle, accel: Vec2) {
        if self.entries.contains_key(&handle) {
            *self.pending_accel.entry(handle).or_insert(Vec2::ZERO) += accel;
        }
    }

    fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt as Real;

        // Mass-independent push, folded into velocity before the solve
        let pending = std::mem::take(&mut self.pending_accel);
        for (handle, accel) in pending {
            if let Some(rb) = self.body_mut(handle) {
                if rb.is_dynamic() {
                    let vel = to_vec2(rb.linvel()) + accel * dt;
                    rb.set_linvel(to_vector(vel), true);
                }
            }
        }

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        // Channel order is not stable; report sorted by (lower, higher) handle
        let mut started = BTreeSet::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(c1, c2, _flags) = event {
                let a = self.collider_to_body.get(&c1).copied();
                let b = self.collider_to_body.get(&c2).copied();
                if let (Some(a), Some(b)) = (a, b) {
                    started.insert((a.min(b), a.max(b)));
                }
            }
        }
        self.contacts.extend(started);
    }

    fn take_contacts(&mut self) -> Vec<(BodyHandle, BodyHandle)> {
        std::mem::take(&mut self.contacts)
    }

    fn touching(&self, handle: BodyHandle) -> Vec<BodyHandle> {
        let Some(rb) = self.body(handle) else {
            return Vec::new();
        };
        let mut others = BTreeSet::new();
        for &collider in rb.colliders() {
            for pair in self.narrow_phase.contact_pairs_with(collider) {
                if !pair.has_any_active_contact {
                    continue;
                }
                let other = if pair.collider1 == collider {
                    pair.collider2
                } else {
                    pair.collider1
                };
                if let Some(&h) = self.collider_to_body.get(&other) {
                    others.insert(h);
                }
            }
        }
        others.into_iter().collect()
    }
}
