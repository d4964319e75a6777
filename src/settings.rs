//! Game rules and tuning
//!
//! Persisted in LocalStorage next to the records. Every knob has a default
//! so a partial or stale JSON blob still loads.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::persistence::{self, KeyValueStore};

/// Rule variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RuleVariant {
    /// Endless: merge tiers grow without bound
    #[default]
    Plain,
    /// Campaign: stored tiers cap at the current level, zero-merges at the
    /// level's tier advance the campaign
    Tiered,
}

impl RuleVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleVariant::Plain => "Plain",
            RuleVariant::Tiered => "Tiered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "plain" | "endless" => Some(RuleVariant::Plain),
            "tiered" | "campaign" => Some(RuleVariant::Tiered),
            _ => None,
        }
    }

    pub fn is_tiered(&self) -> bool {
        *self == RuleVariant::Tiered
    }
}

/// Game rules/tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub variant: RuleVariant,

    // === Generation ===
    /// Chance a generated piece is an operator ball
    pub operator_chance: f64,
    /// Generated numbers are drawn from ±[1, starting_max_magnitude]
    pub starting_max_magnitude: i32,
    /// Queued pieces behind the current one
    pub preview_len: usize,

    // === Timing (ms) ===
    pub drop_cooldown_ms: u64,
    pub fresh_grace_ms: u64,
    pub game_over_poll_ms: u64,
    pub transition_ms: u64,
    pub combo_display_ms: u64,

    // === Campaign ===
    /// Last playable level; finishing it is victory
    pub max_level: u32,

    // === Game over ===
    pub danger_line: f32,
    pub settled_speed: f32,

    /// Run seed (None = pick one at startup)
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            variant: RuleVariant::Plain,

            operator_chance: OPERATOR_CHANCE,
            starting_max_magnitude: STARTING_MAX_MAGNITUDE,
            preview_len: PREVIEW_LEN,

            drop_cooldown_ms: DROP_COOLDOWN_MS,
            fresh_grace_ms: FRESH_GRACE_MS,
            game_over_poll_ms: GAME_OVER_POLL_MS,
            transition_ms: TRANSITION_MS,
            combo_display_ms: COMBO_DISPLAY_MS,

            max_level: MAX_LEVEL,

            danger_line: DANGER_LINE,
            settled_speed: SETTLED_SPEED,

            seed: None,
        }
    }
}

impl Settings {
    /// Defaults for a rule variant
    pub fn for_variant(variant: RuleVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    /// Parse settings JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Settings>(json).map(Settings::sanitized)
    }

    /// Clamp every knob into its legal range
    pub fn sanitized(mut self) -> Self {
        self.operator_chance = self.operator_chance.clamp(0.0, 1.0);
        self.starting_max_magnitude = self.starting_max_magnitude.clamp(1, VALUE_CAP);
        self.preview_len = self.preview_len.max(1);
        self.game_over_poll_ms = self.game_over_poll_ms.max(1);
        self
    }

    pub fn drop_cooldown_ticks(&self) -> u64 {
        ms_to_ticks(self.drop_cooldown_ms)
    }

    pub fn fresh_grace_ticks(&self) -> u64 {
        ms_to_ticks(self.fresh_grace_ms)
    }

    pub fn game_over_poll_ticks(&self) -> u64 {
        ms_to_ticks(self.game_over_poll_ms).max(1)
    }

    pub fn transition_ticks(&self) -> u64 {
        ms_to_ticks(self.transition_ms)
    }

    pub fn combo_display_ticks(&self) -> u64 {
        ms_to_ticks(self.combo_display_ms)
    }

    /// Storage key
    const STORAGE_KEY: &'static str = "merge_to_zero_settings";

    /// Load settings from the store, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match persistence::load_json::<Settings>(store, Self::STORAGE_KEY) {
            Some(settings) => {
                log::info!("Loaded settings ({} rules)", settings.variant.as_str());
                settings.sanitized()
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        if persistence::save_json(store, Self::STORAGE_KEY, self) {
            log::info!("Settings saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_variant_from_str() {
        assert_eq!(RuleVariant::from_str("Tiered"), Some(RuleVariant::Tiered));
        assert_eq!(RuleVariant::from_str("campaign"), Some(RuleVariant::Tiered));
        assert_eq!(RuleVariant::from_str("PLAIN"), Some(RuleVariant::Plain));
        assert_eq!(RuleVariant::from_str("hard"), None);
        assert_eq!(RuleVariant::Tiered.as_str(), "Tiered");
    }

    #[test]
    fn test_default_ticks() {
        let s = Settings::default();
        assert_eq!(s.drop_cooldown_ticks(), 60);
        assert_eq!(s.fresh_grace_ticks(), 12);
        assert_eq!(s.transition_ticks(), 180);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let s = Settings::from_json(r#"{"variant":"Tiered","max_level":3}"#).unwrap();
        assert_eq!(s.variant, RuleVariant::Tiered);
        assert_eq!(s.max_level, 3);
        assert_eq!(s.drop_cooldown_ms, DROP_COOLDOWN_MS);
    }

    #[test]
    fn test_sanitize_clamps() {
        let s = Settings::from_json(
            r#"{"operator_chance":4.0,"starting_max_magnitude":99,"preview_len":0}"#,
        )
        .unwrap();
        assert_eq!(s.operator_chance, 1.0);
        assert_eq!(s.starting_max_magnitude, VALUE_CAP);
        assert_eq!(s.preview_len, 1);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(Settings::from_json("{not json").is_err());
    }

    #[test]
    fn test_load_save_roundtrip_through_store() {
        let mut store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());

        let mut s = Settings::for_variant(RuleVariant::Tiered);
        s.seed = Some(42);
        s.save(&mut store);
        assert_eq!(Settings::load(&store), s);
    }
}
