//! Entity factory
//!
//! Rolls new piece descriptors and turns descriptors into live bodies.

use glam::Vec2;
use rand::Rng;

use super::physics::{BodyHandle, CircleDesc, PhysicsWorld};
use super::piece::{OperatorKind, Piece, PieceDescriptor};
use super::state::GameState;
use super::timers::Deferred;
use crate::consts::*;
use crate::settings::Settings;

/// Roll a random descriptor for the preview queue
///
/// Operators come up with `operator_chance`; otherwise a tier-0 number with
/// magnitude in `[1, starting_max_magnitude]` and a random sign.
pub fn generate_descriptor<R: Rng + ?Sized>(rng: &mut R, settings: &Settings) -> PieceDescriptor {
    if rng.random_bool(settings.operator_chance.clamp(0.0, 1.0)) {
        let op = if rng.random_bool(0.5) {
            OperatorKind::Multiply
        } else {
            OperatorKind::Divide
        };
        return PieceDescriptor::operator(op);
    }

    let max = settings.starting_max_magnitude.clamp(1, VALUE_CAP);
    let magnitude = rng.random_range(1..=max);
    let value = if rng.random_bool(0.5) { -magnitude } else { magnitude };
    PieceDescriptor::number(value, 0)
}

/// Spawn a dropped piece. It starts fresh; the grace period is cleared by a
/// deferred callback that no-ops if the piece is gone by then.
pub fn build_from_descriptor<W: PhysicsWorld>(
    state: &mut GameState,
    world: &mut W,
    desc: &PieceDescriptor,
    pos: Vec2,
) -> BodyHandle {
    let handle = world.add_circle(CircleDesc::piece(pos, desc.radius));
    state.pieces.insert(handle, Piece::from_descriptor(desc, true));
    let grace = state.settings.fresh_grace_ticks();
    state.schedule(grace, Deferred::ClearFresh(handle));
    handle
}

/// Spawn the product of a merge (never fresh, may merge immediately)
pub fn build_merged<W: PhysicsWorld>(
    state: &mut GameState,
    world: &mut W,
    value: i32,
    tier: u32,
    pos: Vec2,
) -> BodyHandle {
    let desc = PieceDescriptor::number(value, tier);
    let handle = world.add_circle(CircleDesc::piece(pos, desc.radius));
    state.pieces.insert(handle, Piece::from_descriptor(&desc, false));
    handle
}

/// Cosmetic particle bursts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Burst {
    /// Plain merge sparks
    Merge,
    /// Ring when something hits exactly zero
    Zero,
    /// Rainbow burst for operator use
    Operator,
}

impl Burst {
    /// (count, radius, drag, speed, lifetime ms)
    fn params(&self) -> (u32, f32, f32, f32, u64) {
        match self {
            Burst::Merge => (6, 4.0, 0.08, 300.0, 250),
            Burst::Zero => (12, 6.0, 0.03, 720.0, 400),
            Burst::Operator => (10, 5.0, 0.05, 480.0, 350),
        }
    }
}

/// Spawn a particle burst. Particles never collide and despawn on a timer.
pub fn spawn_burst<W: PhysicsWorld>(state: &mut GameState, world: &mut W, pos: Vec2, burst: Burst) {
    let (count, radius, drag, speed, life_ms) = burst.params();
    for i in 0..count {
        let vel = match burst {
            Burst::Merge => {
                let rng = state.rng_mut();
                Vec2::new(
                    (rng.random::<f32>() - 0.5) * speed,
                    (rng.random::<f32>() - 0.5) * speed - 180.0,
                )
            }
            Burst::Zero | Burst::Operator => {
                let angle = i as f32 / count as f32 * std::f32::consts::TAU;
                let lift = if burst == Burst::Operator { -120.0 } else { 0.0 };
                Vec2::new(angle.cos() * speed, angle.sin() * speed + lift)
            }
        };
        let handle = world.add_circle(CircleDesc::particle(pos, radius, drag));
        world.set_velocity(handle, vel);
        state.schedule(ms_to_ticks(life_ms), Deferred::RemoveParticle(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::piece::{PieceKind, Tier};
    use crate::sim::physics::{BodyLabel, RapierWorld};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_generated_numbers_in_range() {
        let mut rng = Pcg32::seed_from_u64(7);
        let settings = Settings {
            operator_chance: 0.0,
            ..Settings::default()
        };
        let mut saw_negative = false;
        let mut saw_positive = false;
        for _ in 0..500 {
            let d = generate_descriptor(&mut rng, &settings);
            match d.kind {
                PieceKind::Number { value, tier } => {
                    assert_eq!(tier, 0);
                    assert!((1..=STARTING_MAX_MAGNITUDE).contains(&value.abs()));
                    saw_negative |= value < 0;
                    saw_positive |= value > 0;
                }
                PieceKind::Operator { .. } => panic!("operator with chance 0"),
            }
        }
        assert!(saw_negative && saw_positive);
    }

    #[test]
    fn test_operator_rate_roughly_matches() {
        let mut rng = Pcg32::seed_from_u64(99);
        let settings = Settings::default();
        let n = 5000;
        let ops = (0..n)
            .filter(|_| generate_descriptor(&mut rng, &settings).kind.is_operator())
            .count();
        let rate = ops as f64 / n as f64;
        assert!((0.17..0.23).contains(&rate), "rate = {rate}");
    }

    #[test]
    fn test_all_operators_are_wildcards() {
        let mut rng = Pcg32::seed_from_u64(3);
        let settings = Settings {
            operator_chance: 1.0,
            ..Settings::default()
        };
        let mut kinds = Vec::new();
        for _ in 0..100 {
            let d = generate_descriptor(&mut rng, &settings);
            assert_eq!(d.kind.tier(), Tier::Wildcard);
            assert_eq!(d.radius, OPERATOR_RADIUS);
            if let PieceKind::Operator { op, operand } = d.kind {
                assert_eq!(operand, OPERATOR_OPERAND);
                kinds.push(op);
            }
        }
        assert!(kinds.contains(&OperatorKind::Multiply));
        assert!(kinds.contains(&OperatorKind::Divide));
    }

    #[test]
    fn test_build_marks_fresh_and_schedules_clear() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::with_field_walls();
        let desc = PieceDescriptor::number(3, 0);
        let h = build_from_descriptor(&mut state, &mut world, &desc, Vec2::new(100.0, 50.0));

        assert!(state.pieces[&h].fresh);
        assert_eq!(world.label(h), Some(BodyLabel::Piece));
        let due = state.timers.take_due(u64::MAX);
        assert!(due.iter().any(|&(_, action)| action == Deferred::ClearFresh(h)));
    }

    #[test]
    fn test_merged_piece_not_fresh() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::with_field_walls();
        let h = build_merged(&mut state, &mut world, 4, 2, Vec2::new(100.0, 50.0));
        let piece = &state.pieces[&h];
        assert!(!piece.fresh);
        assert_eq!(piece.kind, PieceKind::Number { value: 4, tier: 2 });
        let due = state.timers.take_due(u64::MAX);
        assert!(!due.iter().any(|&(_, action)| action == Deferred::ClearFresh(h)));
    }

    #[test]
    fn test_burst_particles_scheduled_for_removal() {
        let mut state = GameState::new(Settings::default(), 1);
        let mut world = RapierWorld::new(Vec2::ZERO);
        spawn_burst(&mut state, &mut world, Vec2::ZERO, Burst::Zero);
        assert_eq!(world.bodies_with_label(BodyLabel::Particle).len(), 12);
        assert_eq!(state.timers.take_due(u64::MAX).len(), 12);
    }
}
