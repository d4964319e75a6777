//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body handle)
//! - No rendering or platform dependencies

pub mod collision;
pub mod factory;
pub mod level;
pub mod physics;
pub mod piece;
pub mod state;
pub mod tick;
pub mod timers;
pub mod value;

pub use collision::{MergeEvent, Resolution, resolve, resolve_contact};
pub use factory::{Burst, build_from_descriptor, build_merged, generate_descriptor, spawn_burst};
pub use level::{LevelOutcome, LevelPhase, LevelProgression};
pub use physics::{BodyHandle, BodyLabel, CircleDesc, PhysicsWorld, RapierWorld};
pub use piece::{OperatorKind, Piece, PieceDescriptor, PieceKind, Tier};
pub use state::{ComboBanner, GameEvent, GamePhase, GameState};
pub use tick::{TickInput, tick, try_drop};
pub use timers::{Deferred, Timers};
pub use value::{TierStyle, radius_for, style_for_tier};
