//! Tiered campaign progression
//!
//! `Active(level)` → `Transitioning(level)` → `Active(level + 1)`, or
//! `Victory` once the last level is cleared. A level is cleared by a
//! number+number zero-merge whose common tier equals the level.

use serde::{Deserialize, Serialize};

use crate::settings::RuleVariant;

/// Campaign phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelPhase {
    Active,
    /// Settling animation; drops and goal checks suspended
    Transitioning,
    /// Terminal
    Victory,
}

/// Result of finishing a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOutcome {
    Advanced(u32),
    Victory,
}

/// Campaign position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelProgression {
    pub current_level: u32,
    pub phase: LevelPhase,
    /// Last playable level
    pub max_level: u32,
}

impl LevelProgression {
    pub fn new(max_level: u32) -> Self {
        Self {
            current_level: 0,
            phase: LevelPhase::Active,
            max_level,
        }
    }

    pub fn reset(&mut self) {
        self.current_level = 0;
        self.phase = LevelPhase::Active;
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase == LevelPhase::Transitioning
    }

    /// Tier stored on a merged piece. Tiered rules cap it at the current
    /// level; plain rules let it grow.
    pub fn stored_tier(&self, variant: RuleVariant, raw_tier: u32) -> u32 {
        match variant {
            RuleVariant::Plain => raw_tier,
            RuleVariant::Tiered => raw_tier.min(self.current_level),
        }
    }

    /// Whether a zero-merge at `common_tier` clears the current level
    pub fn is_goal(&self, variant: RuleVariant, common_tier: u32) -> bool {
        variant.is_tiered()
            && self.phase == LevelPhase::Active
            && common_tier == self.current_level
    }

    /// Enter the settling phase. Returns false unless currently active.
    pub fn begin_transition(&mut self) -> bool {
        if self.phase != LevelPhase::Active {
            return false;
        }
        self.phase = LevelPhase::Transitioning;
        true
    }

    /// Leave the settling phase, advancing exactly one level
    pub fn finish_transition(&mut self) -> Option<LevelOutcome> {
        if self.phase != LevelPhase::Transitioning {
            return None;
        }
        self.current_level += 1;
        if self.current_level > self.max_level {
            self.phase = LevelPhase::Victory;
            Some(LevelOutcome::Victory)
        } else {
            self.phase = LevelPhase::Active;
            Some(LevelOutcome::Advanced(self.current_level))
        }
    }
}
