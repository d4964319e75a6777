//! Deferred callbacks keyed by tick deadline
//!
//! Nothing in the simulation blocks: grace periods, cooldowns and phase
//! changes are scheduled here and fired by `tick()` once their deadline
//! passes. Entries are never cancelled. Each one carries the session epoch
//! it was scheduled in, and a restart bumps the epoch so stale entries
//! fire as no-ops.

use super::physics::BodyHandle;

/// Work to run when a deadline passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// End the just-dropped grace period of a piece
    ClearFresh(BodyHandle),
    /// Drop cooldown finished
    EnableDrop,
    /// Level transition settling phase finished
    FinishTransition,
    /// Hide the combo banner if it still shows combo `seq`
    HideCombo(u64),
    /// Despawn a cosmetic particle
    RemoveParticle(BodyHandle),
}

impl Deferred {
    /// Cosmetic cleanup runs even after a restart
    pub fn survives_restart(&self) -> bool {
        matches!(self, Deferred::RemoveParticle(_))
    }
}

#[derive(Debug, Clone)]
struct Scheduled {
    due: u64,
    seq: u64,
    epoch: u32,
    action: Deferred,
}

/// Pending deferred work, fired in (deadline, schedule order)
#[derive(Debug, Clone, Default)]
pub struct Timers {
    pending: Vec<Scheduled>,
    next_seq: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire `delay_ticks` after `now`
    pub fn schedule(&mut self, now: u64, delay_ticks: u64, epoch: u32, action: Deferred) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled {
            due: now + delay_ticks,
            seq,
            epoch,
            action,
        });
    }

    /// Remove and return everything due at or before `now`
    pub fn take_due(&mut self, now: u64) -> Vec<(u32, Deferred)> {
        let mut due: Vec<Scheduled> = Vec::new();
        self.pending.retain(|s| {
            if s.due <= now {
                due.push(s.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|s| (s.due, s.seq));
        due.into_iter().map(|s| (s.epoch, s.action)).collect()
    }

}
