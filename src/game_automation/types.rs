// Types and enums for game automation
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Bot lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopped,
}

/// Coarse progress phase. Exactly one holds at a time, which is what keeps
/// "queued" and "in activity" mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Queued { since: Instant },
    InActivity { wave: u8 },
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "RUNNING",
            Phase::Queued { .. } => "QUEUED",
            Phase::InActivity { .. } => "IN ACTIVITY",
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Phase::Queued { .. })
    }

    pub fn is_in_activity(&self) -> bool {
        matches!(self, Phase::InActivity { .. })
    }

    pub fn wave(&self) -> Option<u8> {
        match self {
            Phase::InActivity { wave } => Some(*wave),
            _ => None,
        }
    }
}

/// Cumulative counters of one run session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub completed_cycles: u32,
    pub queue_timeouts: u32,
    pub recoveries: u32,
    pub restarts: u32,
    pub hard_resets: u32,
}

/// Immutable stats snapshot pushed to observers once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub completed_cycles: u32,
    pub queue_timeouts: u32,
    pub recoveries: u32,
    pub restarts: u32,
    pub hard_resets: u32,
    pub runtime: Duration,
    pub phase_label: &'static str,
    pub wave: Option<u8>,
}

/// Final summary of a run, returned by `QuestBot::start` and logged on stop.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub counters: Counters,
    pub runtime: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.runtime.as_secs();
        write!(
            f,
            "runtime {:02}:{:02}:{:02}, PQs completed {}, queue timeouts {}, recoveries {}, restarts {}, hard resets {}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60,
            self.counters.completed_cycles,
            self.counters.queue_timeouts,
            self.counters.recoveries,
            self.counters.restarts,
            self.counters.hard_resets
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationCommand {
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    StateChanged(LifecycleState),
    StatsUpdated(StatsSnapshot),
    Log(String),
}
