//! Value model: sizing and tier styling
//!
//! Pure lookups, no physics. Rendering and the entity factory both read
//! from here so a piece's size always agrees with its value.

use serde::Serialize;

use crate::consts::*;

/// Visual descriptor for a merge tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStyle {
    /// Fill color (CSS hex)
    pub color: &'static str,
    /// Display name
    pub name: &'static str,
}

/// Rainbow progression by merge count. The last entry is the "legendary"
/// plateau shared by every tier at or beyond it.
pub const TIER_STYLES: [TierStyle; 11] = [
    TierStyle { color: "#a1a1aa", name: "gray" },
    TierStyle { color: "#4ade80", name: "green" },
    TierStyle { color: "#22d3ee", name: "cyan" },
    TierStyle { color: "#60a5fa", name: "blue" },
    TierStyle { color: "#a78bfa", name: "purple" },
    TierStyle { color: "#e879f9", name: "fuchsia" },
    TierStyle { color: "#f472b6", name: "pink" },
    TierStyle { color: "#fb7185", name: "rose" },
    TierStyle { color: "#f97316", name: "orange" },
    TierStyle { color: "#fbbf24", name: "gold" },
    TierStyle { color: "#fef08a", name: "legendary" },
];

/// Map an absolute value to a ball radius
///
/// Step function of the magnitude, clamped to `[1, VALUE_CAP]` so every
/// magnitude at or past the cap shares the largest size.
pub fn radius_for(abs_value: u32) -> f32 {
    let clamped = abs_value.clamp(1, VALUE_CAP as u32);
    BALL_MIN_RADIUS + (clamped - 1) as f32 * BALL_RADIUS_SCALE
}

/// Style for a tier (tiers past the table share the last entry)
pub fn style_for_tier(tier: u32) -> TierStyle {
    let index = (tier as usize).min(TIER_STYLES.len() - 1);
    TIER_STYLES[index]
}
