// Recognizable screens as data: what to look for, what to do, and how it
// moves the bot along. Table order is priority order.
use std::time::Duration;

/// Logical 960x540 coordinates.
pub mod positions {
    pub const CENTER: (u32, u32) = (480, 270);
    pub const STOP_QUEUE: (u32, u32) = (750, 480);
    pub const CLEAR_ALL: (u32, u32) = (480, 500);
}

/// Fixed template names.
pub mod names {
    pub const LOST_CONNECTION: &str = "lost_connection";
    pub const EVENT: &str = "event";
    pub const LEAVE_PARTY: &str = "leave_party";
    pub const EXIT: &str = "exit";
    pub const CONFIRM: &str = "confirm";
    pub const START_QUEUE: &str = "start_queue";
    pub const STOP_QUEUE: &str = "stop_queue";
    pub const PQ_BUTTON: &str = "pq_button";
    pub const MAIN_MENU: &str = "main_menu";
    pub const APP_BUTTON: &str = "app_button";
    pub const CLEAR: &str = "clear";
    pub const FAILED: &str = "failed";
    pub const RED_ALERT: &str = "red_alert";
    pub const JUMP: &str = "jump";
    pub const CLEAR_ALL: &str = "clear_all";
    pub const LOADING: &[&str] = &[
        "loading_screen",
        "loading_screen2",
        "loading_screen3",
        "loading_screen4",
        "loading_screen5",
    ];
}

/// How a screen is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detect {
    Template(&'static str),
    AnyOf(&'static [&'static str]),
    /// The quest-specific "still queued" indicator.
    QueueIndicator,
    /// The configured quest on the quest selector.
    QuestChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenAction {
    Click,
    Observe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEffect {
    Keep,
    /// Start the queue clock unless already queued.
    EnterQueue,
    /// Back to idle and the timeout streak forgotten.
    ResetProgress,
}

#[derive(Debug, Clone, Copy)]
pub struct ScreenRule {
    pub detect: Detect,
    pub action: ScreenAction,
    pub effect: PhaseEffect,
    pub touches_activity: bool,
    pub settle: Duration,
    /// `{quest}` is replaced with the configured quest.
    pub message: &'static str,
}

const fn rule(
    detect: Detect,
    action: ScreenAction,
    effect: PhaseEffect,
    touches_activity: bool,
    settle_ms: u64,
    message: &'static str,
) -> ScreenRule {
    ScreenRule {
        detect,
        action,
        effect,
        touches_activity,
        settle: Duration::from_millis(settle_ms),
        message,
    }
}

/// Checked on every tick before anything else, whatever the phase.
pub const INTERRUPTS: &[ScreenRule] = &[
    rule(
        Detect::Template(names::LOST_CONNECTION),
        ScreenAction::Click,
        PhaseEffect::ResetProgress,
        true,
        2000,
        "!!! LOST CONNECTION - Clicking OK !!!",
    ),
    rule(
        Detect::Template(names::EVENT),
        ScreenAction::Click,
        PhaseEffect::Keep,
        false,
        1000,
        "Event popup - closing",
    ),
    rule(
        Detect::Template(names::LEAVE_PARTY),
        ScreenAction::Click,
        PhaseEffect::Keep,
        false,
        1000,
        "In party mode - leaving party",
    ),
];

/// Phase detection outside an activity and the queue.
pub const GENERIC_SCREENS: &[ScreenRule] = &[
    rule(
        Detect::AnyOf(names::LOADING),
        ScreenAction::Observe,
        PhaseEffect::Keep,
        true,
        1000,
        "Loading...",
    ),
    rule(
        Detect::QueueIndicator,
        ScreenAction::Observe,
        PhaseEffect::EnterQueue,
        true,
        0,
        "Now in queue!",
    ),
    rule(
        Detect::Template(names::START_QUEUE),
        ScreenAction::Click,
        PhaseEffect::EnterQueue,
        true,
        1000,
        "Clicking START QUEUE",
    ),
    rule(
        Detect::QuestChoice,
        ScreenAction::Click,
        PhaseEffect::Keep,
        true,
        1000,
        "Selecting {quest}...",
    ),
    rule(
        Detect::Template(names::PQ_BUTTON),
        ScreenAction::Click,
        PhaseEffect::Keep,
        true,
        1000,
        "Clicking PQ button",
    ),
    rule(
        Detect::Template(names::MAIN_MENU),
        ScreenAction::Click,
        PhaseEffect::Keep,
        true,
        2500,
        "Opening main menu",
    ),
    rule(
        Detect::Template(names::APP_BUTTON),
        ScreenAction::Click,
        PhaseEffect::Keep,
        true,
        3000,
        "Opening game",
    ),
    rule(
        Detect::Template(names::STOP_QUEUE),
        ScreenAction::Observe,
        PhaseEffect::EnterQueue,
        true,
        0,
        "In queue (stop visible)",
    ),
];

/// Soft recovery clicks the first of these that is visible.
pub const RECOVERY_SCAN: &[Detect] = &[
    Detect::Template(names::LOST_CONNECTION),
    Detect::Template(names::EXIT),
    Detect::Template(names::EVENT),
    Detect::Template(names::LEAVE_PARTY),
    Detect::Template(names::CLEAR),
    Detect::Template(names::CONFIRM),
    Detect::Template(names::START_QUEUE),
    Detect::QuestChoice,
    Detect::Template(names::PQ_BUTTON),
    Detect::Template(names::MAIN_MENU),
    Detect::Template(names::APP_BUTTON),
    Detect::Template(names::STOP_QUEUE),
];

/// Wave on which the red alert hazard can show up.
pub const HAZARD_WAVE: u8 = 3;

/// Template names that depend on the chosen quest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestTemplates {
    quest: String,
    /// Highest wave first.
    waves: Vec<(u8, String)>,
    queue_indicator: &'static str,
}

impl QuestTemplates {
    pub fn new(quest: &str) -> Self {
        // Ludibrium's indicators were cut with doubled digits
        let ludibrium = quest == "ludibrium";
        let waves = (1..=HAZARD_WAVE)
            .rev()
            .map(|n| {
                let name = if ludibrium {
                    format!("{quest}_wave_{n}{n}")
                } else {
                    format!("{quest}_wave_{n}")
                };
                (n, name)
            })
            .collect();
        Self {
            quest: quest.to_string(),
            waves,
            queue_indicator: if ludibrium { "in_queue_ludi" } else { "in_queue" },
        }
    }

    pub fn quest(&self) -> &str {
        &self.quest
    }

    pub fn waves(&self) -> impl Iterator<Item = (u8, &str)> {
        self.waves.iter().map(|(n, name)| (*n, name.as_str()))
    }

    pub fn queue_indicator(&self) -> &'static str {
        self.queue_indicator
    }

    pub fn message(&self, rule: &ScreenRule) -> String {
        rule.message.replace("{quest}", &self.quest)
    }
}
