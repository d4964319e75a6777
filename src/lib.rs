//! Merge to Zero - A physics number-merging puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pieces, merges, levels, game session)
//! - `persistence`: Key-value storage (LocalStorage on web)
//! - `records`: Best score / best level / time played
//! - `session`: Frame driver that persists records as the game runs
//! - `settings`: Rule variant and tuning
//! - `lobby`: Presence roster for the social lobby screen

pub mod lobby;
pub mod persistence;
pub mod records;
pub mod session;
pub mod settings;
pub mod sim;

pub use records::Records;
pub use settings::{RuleVariant, Settings};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Simulation ticks per second
    pub const TICKS_PER_SECOND: u64 = 120;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Play field dimensions (y grows downward, 0 = top edge)
    pub const FIELD_WIDTH: f32 = 400.0;
    pub const FIELD_HEIGHT: f32 = 500.0;
    pub const WALL_THICKNESS: f32 = 20.0;
    /// Downward acceleration (pixels/s²)
    pub const GRAVITY: f32 = 1000.0;

    /// Numbers cap at ±VALUE_CAP
    pub const VALUE_CAP: i32 = 10;
    /// Freshly generated numbers only go up to ±5
    pub const STARTING_MAX_MAGNITUDE: i32 = 5;

    /// Ball sizing
    pub const BALL_MIN_RADIUS: f32 = 18.0;
    /// Radius increase per unit of absolute value
    pub const BALL_RADIUS_SCALE: f32 = 4.0;
    pub const OPERATOR_RADIUS: f32 = 25.0;

    /// Operator balls (×2 / ÷2)
    pub const OPERATOR_CHANCE: f64 = 0.2;
    pub const OPERATOR_OPERAND: i32 = 2;

    /// Body material
    pub const BALL_RESTITUTION: f32 = 0.3;
    pub const BALL_FRICTION: f32 = 0.1;
    pub const BALL_LINEAR_DRAG: f32 = 0.01;

    /// Number of queued pieces behind the current one
    pub const PREVIEW_LEN: usize = 3;

    /// Timings (milliseconds)
    pub const DROP_COOLDOWN_MS: u64 = 500;
    pub const FRESH_GRACE_MS: u64 = 100;
    pub const GAME_OVER_POLL_MS: u64 = 500;
    pub const TRANSITION_MS: u64 = 1500;
    pub const COMBO_DISPLAY_MS: u64 = 600;
    pub const TIME_TALLY_MS: u64 = 10_000;

    /// Settled pieces above this line end the run
    pub const DANGER_LINE: f32 = 60.0;
    /// Vertical speed below which a piece counts as settled (pixels/s)
    pub const SETTLED_SPEED: f32 = 30.0;

    /// Pull toward field center during a level transition (pixels/s²)
    pub const TRANSITION_PULL: f32 = 400.0;

    /// Last playable level of the tiered campaign
    pub const MAX_LEVEL: u32 = 9;

    /// Scoring
    pub const MERGE_POINTS: u64 = 10;
    pub const ZERO_MERGE_POINTS: u64 = 50;
    pub const OPERATOR_ZERO_POINTS: u64 = 100;
    pub const OPERATOR_BONUS: u64 = 25;

    /// Convert a millisecond duration to whole simulation ticks (rounded up)
    #[inline]
    pub const fn ms_to_ticks(ms: u64) -> u64 {
        (ms * TICKS_PER_SECOND).div_ceil(1000)
    }
}

/// Clamp a horizontal drop position so a ball of `radius` stays inside the field
#[inline]
pub fn clamp_drop_x(x: f32, radius: f32) -> f32 {
    x.clamp(radius, consts::FIELD_WIDTH - radius)
}

/// Field center (attraction target during level transitions)
#[inline]
pub fn field_center() -> glam::Vec2 {
    glam::Vec2::new(consts::FIELD_WIDTH / 2.0, consts::FIELD_HEIGHT / 2.0)
}
