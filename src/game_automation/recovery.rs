// Recovery escalation ladder.
//
// Purely time driven: it looks at the timers in `BotState` and never at the screen.
use super::state::BotState;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Kill the game through recent apps plus a force-stop.
    HardReset { without_entry: Duration },
    /// Back out of everything and go home.
    Restart { stale: Duration },
    /// One best-effort tap on whatever looks actionable.
    SoftRecovery { stale: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderLimits {
    pub stuck_timeout: Duration,
    /// Increasing "no activity entered" thresholds, indexed by escalation level.
    pub thresholds: Vec<Duration>,
}

impl LadderLimits {
    pub fn soft_timeout(&self) -> Duration {
        self.stuck_timeout / 2
    }

    pub fn threshold(&self, level: usize) -> Option<Duration> {
        self.thresholds
            .get(level)
            .or_else(|| self.thresholds.last())
            .copied()
    }
}

/// Picks the most severe recovery whose trigger holds, if any.
pub fn evaluate(state: &BotState, limits: &LadderLimits, now: Instant) -> Option<Recovery> {
    let without_entry = state.since_entry(now);
    if let Some(threshold) = limits.threshold(state.escalation_level)
        && without_entry >= threshold
    {
        return Some(Recovery::HardReset { without_entry });
    }

    let stale = state.stale_for(now);
    if stale >= limits.stuck_timeout {
        return Some(Recovery::Restart { stale });
    }
    if stale >= limits.soft_timeout() && !state.recovery_attempted {
        return Some(Recovery::SoftRecovery { stale });
    }
    None
}
