// Explicit bot state: progress phase, timers, counters and escalation.
//
// Every method takes `now` so the control loop decides what time it is and
// tests can drive the timers directly.
use super::types::{Counters, Phase, RunSummary, StatsSnapshot};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct BotState {
    pub phase: Phase,
    /// Last forward progress. Read by the recovery ladder.
    pub last_activity: Instant,
    /// Last time an activity was actually entered. Recoveries never move it.
    pub entered_activity: Instant,
    pub escalation_level: usize,
    pub consecutive_timeouts: u32,
    pub recovery_attempted: bool,
    pub last_jump: Option<Instant>,
    pub counters: Counters,
    pub session_start: Instant,
}

impl BotState {
    pub fn new(now: Instant) -> Self {
        Self {
            phase: Phase::Idle,
            last_activity: now,
            entered_activity: now,
            escalation_level: 0,
            consecutive_timeouts: 0,
            recovery_attempted: false,
            last_jump: None,
            counters: Counters::default(),
            session_start: now,
        }
    }

    /// Marks forward progress and re-arms soft recovery.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
        self.recovery_attempted = false;
    }

    pub fn stale_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn since_entry(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.entered_activity)
    }

    pub fn reset_phase(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Phase back to idle and the timeout streak forgotten.
    pub fn reset_progress(&mut self) {
        self.phase = Phase::Idle;
        self.consecutive_timeouts = 0;
    }

    pub fn enter_queue(&mut self, now: Instant) {
        self.phase = Phase::Queued { since: now };
    }

    pub fn enter_activity(&mut self, wave: u8, now: Instant) {
        self.phase = Phase::InActivity { wave };
        if now > self.entered_activity {
            self.entered_activity = now;
        }
        self.last_jump = None;
        self.consecutive_timeouts = 0;
        self.touch(now);
    }

    /// Records a freshly observed wave indicator. Returns true when the wave changed.
    /// Outside an activity this does nothing; a missing indicator never reaches here.
    pub fn observe_wave(&mut self, wave: u8) -> bool {
        match &mut self.phase {
            Phase::InActivity { wave: current } if *current != wave => {
                *current = wave;
                true
            }
            _ => false,
        }
    }

    pub fn complete_cycle(&mut self, now: Instant) {
        self.counters.completed_cycles += 1;
        self.reset_progress();
        self.touch(now);
    }

    /// Counts a queue timeout. Returns true once the consecutive ceiling is reached.
    pub fn record_queue_timeout(&mut self, ceiling: u32) -> bool {
        self.counters.queue_timeouts += 1;
        self.consecutive_timeouts += 1;
        self.consecutive_timeouts >= ceiling
    }

    /// Opens a soft recovery attempt for the current stale window.
    pub fn begin_soft_recovery(&mut self) -> u32 {
        self.recovery_attempted = true;
        self.counters.recoveries += 1;
        self.reset_phase();
        self.counters.recoveries
    }

    pub fn record_restart(&mut self, now: Instant) {
        self.reset_progress();
        self.touch(now);
    }

    /// Post-effects of a hard reset. `levels` is the length of the threshold list.
    pub fn record_hard_reset(&mut self, now: Instant, levels: usize) {
        self.reset_progress();
        if now > self.entered_activity {
            self.entered_activity = now;
        }
        self.escalation_level = (self.escalation_level + 1).min(levels.saturating_sub(1));
        self.touch(now);
    }

    pub fn jump_due(&self, now: Instant, interval: Duration) -> bool {
        self.last_jump
            .is_none_or(|last| now.saturating_duration_since(last) >= interval)
    }

    /// Moves every run timer forward, used to freeze time across a pause.
    pub fn shift_timers(&mut self, by: Duration) {
        self.last_activity += by;
        self.entered_activity += by;
        if let Some(last) = self.last_jump.as_mut() {
            *last += by;
        }
        if let Phase::Queued { since } = &mut self.phase {
            *since += by;
        }
    }

    pub fn runtime(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.session_start)
    }

    pub fn snapshot(&self, now: Instant) -> StatsSnapshot {
        StatsSnapshot {
            completed_cycles: self.counters.completed_cycles,
            queue_timeouts: self.counters.queue_timeouts,
            recoveries: self.counters.recoveries,
            restarts: self.counters.restarts,
            hard_resets: self.counters.hard_resets,
            runtime: self.runtime(now),
            phase_label: self.phase.label(),
            wave: self.phase.wave(),
        }
    }

    pub fn summary(&self, now: Instant) -> RunSummary {
        RunSummary {
            counters: self.counters,
            runtime: self.runtime(now),
        }
    }
}
