//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;

use super::collision::resolve_contact;
use super::factory::build_from_descriptor;
use super::physics::PhysicsWorld;
use super::state::{GameEvent, GamePhase, GameState};
use super::timers::Deferred;
use crate::consts::*;
use crate::{clamp_drop_x, field_center};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Drop the current piece at this x (click/tap/space)
    pub drop_x: Option<f32>,
    /// Start over
    pub restart: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick<W: PhysicsWorld>(state: &mut GameState, world: &mut W, input: &TickInput) {
    if input.restart {
        state.restart(world);
    }

    state.time_ticks += 1;

    // Deferred work (stale epochs are filtered inside)
    for (epoch, action) in state.timers.take_due(state.time_ticks) {
        state.run_deferred(world, epoch, action);
    }

    if let Some(x) = input.drop_x {
        try_drop(state, world, x);
    }

    // Settling animation: draw everything toward the middle
    if state.phase() == GamePhase::Transitioning {
        let center = field_center();
        let handles: Vec<_> = state.pieces.keys().copied().collect();
        for handle in handles {
            if let Some(pos) = world.position(handle) {
                let dir = (center - pos).normalize_or_zero();
                world.apply_force(handle, dir * TRANSITION_PULL);
            }
        }
    }

    world.step(SIM_DT);

    // A finished run keeps its board as it is
    let contacts = world.take_contacts();
    if !state.game_over {
        for (a, b) in contacts {
            resolve_contact(state, world, a, b);
        }
    }

    if state.time_ticks >= state.next_poll_tick {
        state.next_poll_tick = state.time_ticks + state.settings.game_over_poll_ticks();
        if state.phase() == GamePhase::Playing && board_overflowed(state, world) {
            state.end_game();
        }
    }
}

/// Drop the current piece if the cooldown allows it
///
/// Returns true if a piece was spawned.
pub fn try_drop<W: PhysicsWorld>(state: &mut GameState, world: &mut W, x: f32) -> bool {
    if !state.drop_ready() {
        return false;
    }
    let Some(desc) = state.advance_preview() else {
        return false;
    };
    let pos = Vec2::new(clamp_drop_x(x, desc.radius), -desc.radius);
    let handle = build_from_descriptor(state, world, &desc, pos);

    state.can_drop = false;
    let cooldown = state.settings.drop_cooldown_ticks();
    state.schedule(cooldown, Deferred::EnableDrop);

    log::debug!("Dropped {} at x={:.0}", desc.kind.label(), pos.x);
    state.events.push(GameEvent::Dropped(handle));
    true
}

/// A settled piece sits between the top edge and the danger line
fn board_overflowed<W: PhysicsWorld>(state: &GameState, world: &W) -> bool {
    let danger = state.settings.danger_line;
    let settled = state.settings.settled_speed;
    state.pieces.iter().any(|(&handle, piece)| {
        if piece.merging {
            return false;
        }
        let (Some(pos), Some(vel)) = (world.position(handle), world.velocity(handle)) else {
            return false;
        };
        pos.y > 0.0 && pos.y < danger && vel.y.abs() < settled
    })
}
