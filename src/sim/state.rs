//! Game state and session bookkeeping
//!
//! One `GameState` per play session: score, drop availability, terminal
//! flags, campaign position, the preview queue, and the game data attached
//! to every live piece body. The physics world owns the bodies; this owns
//! what they mean.

use std::collections::{BTreeMap, VecDeque};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::{MergeEvent, resolve_contact};
use super::factory::generate_descriptor;
use super::level::{LevelOutcome, LevelPhase, LevelProgression};
use super::physics::{BodyHandle, PhysicsWorld};
use super::piece::{Piece, PieceDescriptor};
use super::timers::{Deferred, Timers};
use crate::settings::Settings;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    /// Level cleared; board settling before the next level
    Transitioning,
    /// Run ended (board overflowed)
    GameOver,
    /// Campaign finished
    Victory,
}

/// Things that happened during a tick, drained by the session driver
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Dropped(BodyHandle),
    Merge(MergeEvent),
    TransitionStarted { level: u32 },
    LevelAdvanced { level: u32 },
    Victory { score: u64, level: u32 },
    GameOver { score: u64 },
    Restarted,
}

/// Combo banner currently on screen
#[derive(Debug, Clone, PartialEq)]
pub struct ComboBanner {
    pub seq: u64,
    pub text: String,
    pub pos: Vec2,
    pub highlight: bool,
}

/// Complete session state (deterministic for a given seed and input)
#[derive(Debug, Clone)]
pub struct GameState {
    pub settings: Settings,
    /// Run seed for reproducibility
    pub seed: u64,
    rng: Pcg32,
    pub score: u64,
    /// Drop cooldown finished
    pub can_drop: bool,
    pub game_over: bool,
    pub level: LevelProgression,
    /// Piece that drops next
    pub current: Option<PieceDescriptor>,
    /// Lookahead behind `current`
    pub queue: VecDeque<PieceDescriptor>,
    /// Game data of live pieces (ordered by handle for determinism)
    pub pieces: BTreeMap<BodyHandle, Piece>,
    pub timers: Timers,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Bumped on restart; deferred work from older epochs is ignored
    pub epoch: u32,
    /// Next game-over poll
    pub next_poll_tick: u64,
    pub combo: Option<ComboBanner>,
    combo_seq: u64,
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new session with the given seed
    pub fn new(settings: Settings, seed: u64) -> Self {
        let poll = settings.game_over_poll_ticks();
        let max_level = settings.max_level;
        let mut state = Self {
            settings,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            score: 0,
            can_drop: true,
            game_over: false,
            level: LevelProgression::new(max_level),
            current: None,
            queue: VecDeque::new(),
            pieces: BTreeMap::new(),
            timers: Timers::new(),
            time_ticks: 0,
            epoch: 0,
            next_poll_tick: poll,
            combo: None,
            combo_seq: 0,
            events: Vec::new(),
        };
        state.refill_preview();
        state
    }

    pub fn rng_mut(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    pub fn phase(&self) -> GamePhase {
        if self.game_over {
            return GamePhase::GameOver;
        }
        match self.level.phase {
            LevelPhase::Active => GamePhase::Playing,
            LevelPhase::Transitioning => GamePhase::Transitioning,
            LevelPhase::Victory => GamePhase::Victory,
        }
    }

    /// Whether a drop would be accepted right now
    pub fn drop_ready(&self) -> bool {
        self.can_drop && self.phase() == GamePhase::Playing && self.current.is_some()
    }

    /// Regenerate the whole preview pipeline (current + queue)
    pub fn refill_preview(&mut self) {
        self.queue.clear();
        for _ in 0..self.settings.preview_len {
            let desc = generate_descriptor(&mut self.rng, &self.settings);
            self.queue.push_back(desc);
        }
        self.current = self.queue.pop_front();
        let desc = generate_descriptor(&mut self.rng, &self.settings);
        self.queue.push_back(desc);
    }

    /// Pop the current piece and append one new descriptor
    pub fn advance_preview(&mut self) -> Option<PieceDescriptor> {
        let taken = self.current.take();
        self.current = self.queue.pop_front();
        let desc = generate_descriptor(&mut self.rng, &self.settings);
        self.queue.push_back(desc);
        taken
    }

    /// Schedule deferred work in the current epoch
    pub fn schedule(&mut self, delay_ticks: u64, action: Deferred) {
        self.timers.schedule(self.time_ticks, delay_ticks, self.epoch, action);
    }

    /// Remove a piece body and its game data
    pub fn remove_piece<W: PhysicsWorld>(&mut self, world: &mut W, handle: BodyHandle) {
        self.pieces.remove(&handle);
        world.remove(handle);
    }

    /// Remove every live piece
    pub fn clear_board<W: PhysicsWorld>(&mut self, world: &mut W) {
        for handle in std::mem::take(&mut self.pieces).into_keys() {
            world.remove(handle);
        }
    }

    /// Put a merge banner on screen for the combo display duration
    pub fn show_combo(&mut self, event: &MergeEvent) {
        self.combo_seq += 1;
        let seq = self.combo_seq;
        self.combo = Some(ComboBanner {
            seq,
            text: event.combo_text(),
            pos: event.pos,
            highlight: event.is_highlight(),
        });
        let ticks = self.settings.combo_display_ticks();
        self.schedule(ticks, Deferred::HideCombo(seq));
    }

    /// Level goal met: suspend drops and start the settling phase
    pub fn begin_level_transition(&mut self) {
        if self.game_over || !self.level.begin_transition() {
            return;
        }
        self.can_drop = false;
        let ticks = self.settings.transition_ticks();
        self.schedule(ticks, Deferred::FinishTransition);
        let level = self.level.current_level;
        log::info!("Level {} cleared, settling board", level);
        self.events.push(GameEvent::TransitionStarted { level });
    }

    /// Settling finished: clear the board and open the next level
    pub fn finish_level_transition<W: PhysicsWorld>(&mut self, world: &mut W) {
        if self.game_over {
            return;
        }
        let Some(outcome) = self.level.finish_transition() else {
            return;
        };
        self.clear_board(world);
        match outcome {
            LevelOutcome::Advanced(level) => {
                self.refill_preview();
                self.can_drop = true;
                log::info!("Level {} started", level);
                self.events.push(GameEvent::LevelAdvanced { level });
            }
            LevelOutcome::Victory => {
                self.can_drop = false;
                let level = self.level.current_level;
                log::info!("Campaign complete! Final score {}", self.score);
                self.events.push(GameEvent::Victory {
                    score: self.score,
                    level,
                });
            }
        }
    }

    /// End the run (idempotent)
    pub fn end_game(&mut self) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        self.can_drop = false;
        log::info!("Game over with score {}", self.score);
        self.events.push(GameEvent::GameOver { score: self.score });
    }

    /// Start over: empty board, zero score, fresh preview, level 0
    pub fn restart<W: PhysicsWorld>(&mut self, world: &mut W) {
        self.clear_board(world);
        self.epoch += 1;
        self.score = 0;
        self.game_over = false;
        self.can_drop = true;
        self.level.reset();
        self.combo = None;
        self.refill_preview();
        self.next_poll_tick = self.time_ticks + self.settings.game_over_poll_ticks();
        log::info!("Game restarted");
        self.events.push(GameEvent::Restarted);
    }

    /// Run one piece of deferred work. Stale or orphaned work is a no-op.
    pub fn run_deferred<W: PhysicsWorld>(&mut self, world: &mut W, epoch: u32, action: Deferred) {
        if epoch != self.epoch && !action.survives_restart() {
            return;
        }
        match action {
            Deferred::ClearFresh(handle) => {
                let Some(piece) = self.pieces.get_mut(&handle) else {
                    return;
                };
                piece.fresh = false;
                // Contacts that began during the grace period are not reported again
                for other in world.touching(handle) {
                    resolve_contact(self, world, handle.min(other), handle.max(other));
                }
            }
            Deferred::EnableDrop => {
                if self.phase() == GamePhase::Playing {
                    self.can_drop = true;
                }
            }
            Deferred::FinishTransition => self.finish_level_transition(world),
            Deferred::HideCombo(seq) => {
                if self.combo.as_ref().is_some_and(|c| c.seq == seq) {
                    self.combo = None;
                }
            }
            Deferred::RemoveParticle(handle) => {
                world.remove(handle);
            }
        }
    }
}
