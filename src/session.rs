//! Play session driver
//!
//! Owns the simulation, the physics world and the records store, converts
//! variable frame time into fixed ticks, and writes personal bests and the
//! play-time tally as they happen.

use crate::consts::*;
use crate::persistence::KeyValueStore;
use crate::records::Records;
use crate::settings::Settings;
use crate::sim::{GameEvent, GamePhase, GameState, PhysicsWorld, TickInput, tick};

pub struct Session<W: PhysicsWorld, S: KeyValueStore> {
    pub state: GameState,
    pub world: W,
    pub store: S,
    pub records: Records,
    /// Pending input, consumed by the next tick
    pub input: TickInput,
    accumulator: f32,
    /// Active ticks not yet added to the time tally
    untallied_ticks: u64,
}

impl<W: PhysicsWorld, S: KeyValueStore> Session<W, S> {
    pub fn new(settings: Settings, seed: u64, world: W, store: S) -> Self {
        let records = Records::load(&store);
        log::info!(
            "Session started ({} rules, seed {})",
            settings.variant.as_str(),
            seed
        );
        Self {
            state: GameState::new(settings, seed),
            world,
            store,
            records,
            input: TickInput::default(),
            accumulator: 0.0,
            untallied_ticks: 0,
        }
    }

    pub fn queue_drop(&mut self, x: f32) {
        self.input.drop_x = Some(x);
    }

    pub fn queue_restart(&mut self) {
        self.input.restart = true;
    }

    /// Advance by a frame's worth of time, returning what happened
    pub fn update(&mut self, dt: f32) -> Vec<GameEvent> {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut events = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            events.extend(self.step());
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        // Drop the backlog rather than spiral
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        events
    }

    /// Run exactly one tick
    pub fn step(&mut self) -> Vec<GameEvent> {
        let input = std::mem::take(&mut self.input);
        tick(&mut self.state, &mut self.world, &input);

        if matches!(
            self.state.phase(),
            GamePhase::Playing | GamePhase::Transitioning
        ) {
            self.tally_time();
        }

        let events = std::mem::take(&mut self.state.events);
        for event in &events {
            self.record(event);
        }
        events
    }

    fn tally_time(&mut self) {
        self.untallied_ticks += 1;
        if self.untallied_ticks >= ms_to_ticks(TIME_TALLY_MS) {
            self.untallied_ticks = 0;
            self.records.add_time(TIME_TALLY_MS);
            self.records.save_time_played(&mut self.store);
        }
    }

    fn record(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::GameOver { score } => self.record_score(score),
            GameEvent::LevelAdvanced { level } => self.record_level(level),
            GameEvent::Victory { score, level } => {
                self.record_score(score);
                self.record_level(level);
            }
            _ => {}
        }
    }

    fn record_score(&mut self, score: u64) {
        if self.records.submit_score(score) {
            log::info!("New best score: {}", score);
            self.records.save_best_score(&mut self.store);
        }
    }

    fn record_level(&mut self, level: u32) {
        if self.records.submit_level(level) {
            log::info!("New best level: {}", level);
            self.records.save_best_level(&mut self.store);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::persistence::MemoryStore;
    use crate::settings::RuleVariant;
    use crate::sim::{CircleDesc, Piece, PieceDescriptor, RapierWorld};

    fn session(settings: Settings, store: MemoryStore) -> Session<RapierWorld, MemoryStore> {
        Session::new(settings, 3, RapierWorld::new(Vec2::ZERO), store)
    }

    fn place(s: &mut Session<RapierWorld, MemoryStore>, value: i32, pos: Vec2) {
        let desc = PieceDescriptor::number(value, 0);
        let h = s.world.add_circle(CircleDesc::piece(pos, desc.radius));
        s.state.pieces.insert(h, Piece::from_descriptor(&desc, false));
    }

    fn run_until_over(s: &mut Session<RapierWorld, MemoryStore>) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..s.state.settings.game_over_poll_ticks() * 2 {
            events.extend(s.step());
        }
        events
    }

    #[test]
    fn test_game_over_never_lowers_best() {
        let mut store = MemoryStore::new();
        store.set("mergeToZeroBest", "1000");
        let mut s = session(Settings::default(), store);
        s.state.score = 40;
        place(&mut s, 3, Vec2::new(200.0, 30.0));

        let events = run_until_over(&mut s);
        assert!(events.iter().any(|e| matches!(e, GameEvent::GameOver { score: 40 })));
        assert_eq!(s.records.best_score, 1000);
        assert_eq!(s.store.get("mergeToZeroBest").as_deref(), Some("1000"));
    }

    #[test]
    fn test_game_over_writes_new_best() {
        let mut s = session(Settings::default(), MemoryStore::new());
        s.state.score = 250;
        place(&mut s, 3, Vec2::new(200.0, 30.0));
        run_until_over(&mut s);
        assert_eq!(s.store.get("mergeToZeroBest").as_deref(), Some("250"));
    }

    #[test]
    fn test_level_advance_writes_best_level() {
        let settings = Settings::for_variant(RuleVariant::Tiered);
        let transition = settings.transition_ticks();
        let mut s = session(settings, MemoryStore::new());
        place(&mut s, 1, Vec2::new(200.0, 300.0));
        place(&mut s, -1, Vec2::new(230.0, 300.0));
        for _ in 0..=transition {
            s.step();
        }
        assert_eq!(s.records.best_level, 1);
        assert_eq!(s.store.get("mergeToZeroBestLevel").as_deref(), Some("1"));
    }

    #[test]
    fn test_finished_run_writes_no_best_level() {
        let settings = Settings::for_variant(RuleVariant::Tiered);
        let transition = settings.transition_ticks();
        let mut s = session(settings, MemoryStore::new());
        s.state.end_game();
        place(&mut s, 1, Vec2::new(200.0, 300.0));
        place(&mut s, -1, Vec2::new(230.0, 300.0));
        for _ in 0..=transition {
            s.step();
        }
        assert_eq!(s.records.best_level, 0);
        assert_eq!(s.store.get("mergeToZeroBestLevel"), None);
        assert_eq!(s.state.level.current_level, 0);
    }

    #[test]
    fn test_time_tally_saved_every_interval() {
        let mut s = session(Settings::default(), MemoryStore::new());
        let interval = ms_to_ticks(TIME_TALLY_MS);
        for _ in 0..interval - 1 {
            s.step();
        }
        assert_eq!(s.store.get("mergeToZeroTimePlayed"), None);
        s.step();
        assert_eq!(s.store.get("mergeToZeroTimePlayed").as_deref(), Some("10000"));
        assert_eq!(s.records.time_played_ms, TIME_TALLY_MS);
    }

    #[test]
    fn test_update_caps_substeps() {
        let mut s = session(Settings::default(), MemoryStore::new());
        s.update(1.0);
        assert_eq!(s.state.time_ticks, MAX_SUBSTEPS as u64);
    }

    #[test]
    fn test_queued_input_is_one_shot() {
        let mut s = session(Settings::default(), MemoryStore::new());
        s.queue_drop(200.0);
        let events = s.step();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Dropped(_))));
        assert!(s.input.drop_x.is_none());
        s.step();
        assert_eq!(s.state.pieces.len(), 1);
    }
}
