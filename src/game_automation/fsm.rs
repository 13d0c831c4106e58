// Quest bot state machine and control loop
use super::channels::EventSink;
use super::error::BotError;
use super::match_image::MatchResult;
use super::ports::{Actions, Perception};
use super::recovery::{self, LadderLimits, Recovery};
use super::screens::{
    Detect, GENERIC_SCREENS, HAZARD_WAVE, INTERRUPTS, PhaseEffect, QuestTemplates, RECOVERY_SCAN,
    ScreenAction, ScreenRule, names, positions,
};
use super::state::BotState;
use super::types::{AutomationCommand, AutomationEvent, LifecycleState, Phase, RunSummary};
use crate::adb::{AdbError, keycode};
use log::Level;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

/// Base pause between two ticks, on top of whatever the tick asked for.
const TICK_INTERVAL: Duration = Duration::from_millis(200);
const PAUSE_POLL: Duration = Duration::from_millis(300);
const CAPTURE_RETRY: Duration = Duration::from_millis(500);
const ACTIVITY_POLL: Duration = Duration::from_millis(500);
const ACTIVITY_ENTERED_SETTLE: Duration = Duration::from_secs(3);
const UNKNOWN_SCREEN_SETTLE: Duration = Duration::from_secs(2);
const SHORT_SETTLE: Duration = Duration::from_secs(1);
const FAILED_DISMISS_WAIT: Duration = Duration::from_millis(1500);
const HAZARD_DOUBLE_TAP_GAP: Duration = Duration::from_millis(50);
const JUMP_DOUBLE_TAP_GAP: Duration = Duration::from_millis(100);
const BACK_PRESSES: usize = 5;
const BACK_PRESS_GAP: Duration = Duration::from_millis(300);
const CANCEL_BACK_GAP: Duration = Duration::from_millis(300);
const RESET_STEP: Duration = Duration::from_secs(1);
const RESET_SETTLE: Duration = Duration::from_secs(2);
const QUEUE_REPORT_EVERY_SECS: u64 = 10;
/// Consecutive lost-transport captures before trying to reconnect (and again every N after).
const RECONNECT_AFTER: u32 = 5;

/// Tunables of one bot run.
#[derive(Debug, Clone, PartialEq)]
pub struct BotSettings {
    pub quest: String,
    pub queue_timeout: Duration,
    pub stuck_timeout: Duration,
    pub max_queue_timeouts: u32,
    pub random_jump: bool,
    pub jump_interval: Duration,
    pub escalation_thresholds: Vec<Duration>,
    pub game_package: String,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            quest: "sleepywood".to_string(),
            queue_timeout: Duration::from_secs(30),
            stuck_timeout: Duration::from_secs(120),
            max_queue_timeouts: 5,
            random_jump: true,
            jump_interval: Duration::from_secs(30),
            escalation_thresholds: vec![Duration::from_secs(450), Duration::from_secs(900)],
            game_package: "com.nexon.maplem.global".to_string(),
        }
    }
}

impl BotSettings {
    pub fn ladder_limits(&self) -> LadderLimits {
        LadderLimits {
            stuck_timeout: self.stuck_timeout,
            thresholds: self.escalation_thresholds.clone(),
        }
    }
}

pub struct QuestBot<P: Perception, A: Actions> {
    perception: P,
    actions: A,
    settings: BotSettings,
    limits: LadderLimits,
    templates: QuestTemplates,
    state: BotState,
    lifecycle: LifecycleState,
    command_rx: mpsc::Receiver<AutomationCommand>,
    events: EventSink,
    paused_since: Option<Instant>,
    stop_requested: bool,
    last_log: Option<String>,
    lost_captures: u32,
}

impl<P: Perception, A: Actions> QuestBot<P, A> {
    pub fn new(
        perception: P,
        actions: A,
        settings: BotSettings,
        command_rx: mpsc::Receiver<AutomationCommand>,
        events: EventSink,
    ) -> Self {
        Self {
            perception,
            actions,
            limits: settings.ladder_limits(),
            templates: QuestTemplates::new(&settings.quest),
            settings,
            state: BotState::new(Instant::now()),
            lifecycle: LifecycleState::Idle,
            command_rx,
            events,
            paused_since: None,
            stop_requested: false,
            last_log: None,
            lost_captures: 0,
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    // ============================================================
    // LIFECYCLE
    // ============================================================

    /// Runs until stopped. Always ends `Stopped`.
    pub async fn start(&mut self) -> Result<RunSummary, BotError> {
        if self.lifecycle != LifecycleState::Idle {
            return Err(BotError::InvalidTransition {
                from: self.lifecycle,
                to: LifecycleState::Running,
            });
        }

        self.state = BotState::new(Instant::now());
        self.say("========================================");
        self.say("  MapleStory Idle Bot");
        self.say("========================================");
        self.say(format!("Quest: {}", self.settings.quest));
        self.say(format!(
            "Queue timeout: {}s",
            self.settings.queue_timeout.as_secs()
        ));
        self.say(format!(
            "Stuck timeout: {}s",
            self.settings.stuck_timeout.as_secs()
        ));
        self.set_lifecycle(LifecycleState::Running);

        let loaded = self.perception.preload();
        self.say(format!("Loaded {loaded} templates"));

        self.run_loop().await;
        let summary = self.state.summary(Instant::now());
        self.set_lifecycle(LifecycleState::Stopped);
        self.say(format!("Stopped. {summary}"));
        Ok(summary)
    }

    fn set_lifecycle(&mut self, next: LifecycleState) {
        if self.lifecycle != next {
            log::debug!("🎮 Bot state: {:?} -> {:?}", self.lifecycle, next);
            self.lifecycle = next;
            self.events.emit(AutomationEvent::StateChanged(next));
        }
    }

    async fn run_loop(&mut self) {
        loop {
            self.drain_commands();
            if self.stop_requested {
                return;
            }
            if self.paused_since.is_some() {
                sleep(PAUSE_POLL).await;
                continue;
            }
            let settle = self.tick().await;
            sleep(settle + TICK_INTERVAL).await;
        }
    }

    fn drain_commands(&mut self) {
        // Check for commands (non-blocking). A closed channel just means no more commands.
        while let Ok(command) = self.command_rx.try_recv() {
            self.process_command(command);
        }
    }

    fn process_command(&mut self, command: AutomationCommand) {
        match command {
            AutomationCommand::Stop => {
                if !self.stop_requested {
                    log::info!("⏹️ Stop requested");
                }
                self.stop_requested = true;
            }
            AutomationCommand::Pause => {
                if self.paused_since.is_none() {
                    self.paused_since = Some(Instant::now());
                    self.say("⏸️ Paused");
                }
            }
            AutomationCommand::Resume => {
                if let Some(since) = self.paused_since.take() {
                    let paused_for = since.elapsed();
                    // Paused time is neither progress nor staleness
                    self.state.shift_timers(paused_for);
                    self.say(format!("▶️ Resumed after {}s", paused_for.as_secs()));
                }
            }
        }
    }

    // ============================================================
    // LOGGING
    // ============================================================

    /// Logs and forwards to observers, skipping a line identical to the previous one.
    fn emit_log(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        if self.last_log.as_deref() == Some(message.as_str()) {
            return;
        }
        log::log!(level, "{message}");
        self.events.emit(AutomationEvent::Log(message.clone()));
        self.last_log = Some(message);
    }

    fn say(&mut self, message: impl Into<String>) {
        self.emit_log(Level::Info, message);
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.emit_log(Level::Warn, message);
    }

    // ============================================================
    // ACTION HELPERS (failures are logged and otherwise ignored)
    // ============================================================

    async fn tap(&mut self, (x, y): (u32, u32)) {
        if let Err(e) = self.actions.tap(x, y).await {
            log::debug!("Tap ({x},{y}) failed: {e}");
        }
    }

    async fn click(&mut self, target: &MatchResult) {
        log::debug!(
            "🎯 {} ({:.2}) at {:?}",
            target.name,
            target.confidence,
            target.center()
        );
        self.tap(target.center()).await;
    }

    async fn key(&mut self, code: u32) {
        if let Err(e) = self.actions.key_event(code).await {
            log::debug!("Key event {code} failed: {e}");
        }
    }

    async fn double_tap(&mut self, target: &MatchResult, gap: Duration) {
        self.click(target).await;
        sleep(gap).await;
        self.click(target).await;
    }

    // ============================================================
    // PERCEPTION HELPERS
    // ============================================================

    fn detect(&mut self, screen: &P::Screen, detect: &Detect) -> Option<MatchResult> {
        match detect {
            Detect::Template(name) => self.perception.find(screen, name),
            Detect::AnyOf(candidates) => candidates
                .iter()
                .find_map(|name| self.perception.find(screen, name)),
            Detect::QueueIndicator => {
                let name = self.templates.queue_indicator();
                self.perception.find(screen, name)
            }
            Detect::QuestChoice => self.perception.find(screen, self.templates.quest()),
        }
    }

    /// Highest visible wave indicator, if any.
    fn check_wave(&mut self, screen: &P::Screen) -> Option<u8> {
        self.templates
            .waves()
            .find(|(_, name)| self.perception.find(screen, name).is_some())
            .map(|(n, _)| n)
    }

    async fn check_and_click(&mut self, screen: &P::Screen, name: &str) -> bool {
        match self.perception.find(screen, name) {
            Some(found) => {
                self.click(&found).await;
                true
            }
            None => false,
        }
    }

    // ============================================================
    // TICK
    // ============================================================

    /// One perception-decision-action cycle. Returns how long to let the game settle.
    pub(crate) async fn tick(&mut self) -> Duration {
        self.events
            .emit(AutomationEvent::StatsUpdated(self.state.snapshot(Instant::now())));

        let screen = match self.perception.capture(false).await {
            Ok(screen) => {
                self.lost_captures = 0;
                screen
            }
            Err(e) => {
                self.capture_failed(e).await;
                return CAPTURE_RETRY;
            }
        };

        for rule in INTERRUPTS {
            if let Some(settle) = self.apply_rule(&screen, rule).await {
                return settle;
            }
        }

        if let Some(recovery) = recovery::evaluate(&self.state, &self.limits, Instant::now()) {
            return self.recover(recovery, &screen).await;
        }

        if let Phase::InActivity { wave } = self.state.phase {
            return self.in_activity(&screen, wave).await;
        }
        self.out_of_activity(&screen).await
    }

    /// A failed capture only skips the tick. A device that dropped off gets reconnected.
    async fn capture_failed(&mut self, error: AdbError) {
        if !error.is_transport_lost() {
            log::debug!("📸 Capture failed, skipping tick: {error}");
            return;
        }
        self.lost_captures += 1;
        log::warn!(
            "📵 Device unreachable ({} in a row): {error}",
            self.lost_captures
        );
        if self.lost_captures % RECONNECT_AFTER != 0 {
            return;
        }
        self.warn("Device lost - Reconnecting...");
        match self.perception.reconnect().await {
            Ok(()) => self.say("Reconnected"),
            Err(e) => log::warn!("🔌 Reconnect failed, will keep retrying: {e}"),
        }
    }

    /// Applies a screen rule if its template is visible.
    async fn apply_rule(&mut self, screen: &P::Screen, rule: &ScreenRule) -> Option<Duration> {
        let found = self.detect(screen, &rule.detect)?;
        if rule.action == ScreenAction::Click {
            self.click(&found).await;
        }
        let message = self.templates.message(rule);
        self.say(message);

        let now = Instant::now();
        match rule.effect {
            PhaseEffect::Keep => {}
            PhaseEffect::EnterQueue => {
                if !self.state.phase.is_queued() {
                    self.state.enter_queue(now);
                }
            }
            PhaseEffect::ResetProgress => self.state.reset_progress(),
        }
        if rule.touches_activity {
            self.state.touch(now);
        }
        Some(rule.settle)
    }

    async fn in_activity(&mut self, screen: &P::Screen, wave: u8) -> Duration {
        // Watching an activity is progress; a stuck one is bounded by the entry timer
        self.state.touch(Instant::now());

        if wave == HAZARD_WAVE {
            self.check_hazard(screen).await;
        }

        if self.perception.find(screen, names::FAILED).is_some() {
            self.warn("!!! PQ FAILED - Recovering !!!");
            return self.recover_from_failure().await;
        }

        if self.check_and_click(screen, names::START_QUEUE).await {
            // The fail screen came and went without us seeing it
            self.warn("!!! PQ FAILED (detected via start_queue) - Restarting queue !!!");
            let now = Instant::now();
            self.state.touch(now);
            self.state.enter_queue(now);
            return SHORT_SETTLE;
        }

        if self.perception.find(screen, names::CLEAR).is_some() {
            self.say("PQ finished!");
            self.state.complete_cycle(Instant::now());
            let completed = self.state.counters.completed_cycles;
            self.say(format!("=== PQ #{completed} Complete! ==="));
            return SHORT_SETTLE;
        }

        // Indicators only show briefly at wave start, so the wave is sticky
        if let Some(seen) = self.check_wave(screen)
            && self.state.observe_wave(seen)
        {
            self.say(format!("Wave {seen}"));
            if seen == HAZARD_WAVE {
                self.check_hazard(screen).await;
            }
        }

        self.try_periodic_jump(screen).await;
        ACTIVITY_POLL
    }

    async fn recover_from_failure(&mut self) -> Duration {
        self.state.reset_phase();
        self.state.touch(Instant::now());
        self.tap(positions::CENTER).await;
        sleep(FAILED_DISMISS_WAIT).await;

        match self.perception.capture(false).await {
            Ok(next) => {
                if self.check_and_click(&next, names::START_QUEUE).await {
                    self.say("Restarting queue after failure");
                    self.state.enter_queue(Instant::now());
                } else {
                    self.tap(positions::CENTER).await;
                }
            }
            Err(e) => log::debug!("📸 Capture after failure screen failed: {e}"),
        }
        SHORT_SETTLE
    }

    /// Red alert on the last wave: double jump right away.
    async fn check_hazard(&mut self, screen: &P::Screen) -> bool {
        if self.perception.find(screen, names::RED_ALERT).is_none() {
            return false;
        }
        self.warn("!!! RED ALERT - JUMPING !!!");
        let Some(jump) = self.perception.find(screen, names::JUMP) else {
            self.say("Jump button not found!");
            return false;
        };
        self.double_tap(&jump, HAZARD_DOUBLE_TAP_GAP).await;
        self.state.last_jump = Some(Instant::now());
        true
    }

    async fn try_periodic_jump(&mut self, screen: &P::Screen) {
        if !self.settings.random_jump
            || !self
                .state
                .jump_due(Instant::now(), self.settings.jump_interval)
        {
            return;
        }
        if let Some(jump) = self.perception.find(screen, names::JUMP) {
            self.say("Jumping!");
            self.double_tap(&jump, JUMP_DOUBLE_TAP_GAP).await;
            self.state.last_jump = Some(Instant::now());
        }
    }

    async fn out_of_activity(&mut self, screen: &P::Screen) -> Duration {
        if self.check_and_click(screen, names::CONFIRM).await {
            self.say(">>> CONFIRM clicked!");
            self.state.touch(Instant::now());
            return SHORT_SETTLE;
        }

        if let Some(wave) = self.check_wave(screen) {
            self.say(format!("Entered PQ! Wave {wave}"));
            self.state.enter_activity(wave, Instant::now());
            return ACTIVITY_ENTERED_SETTLE;
        }

        if let Phase::Queued { since } = self.state.phase {
            return self.handle_queue(screen, since).await;
        }
        self.detect_and_act(screen).await
    }

    async fn detect_and_act(&mut self, screen: &P::Screen) -> Duration {
        for rule in GENERIC_SCREENS {
            if let Some(settle) = self.apply_rule(screen, rule).await {
                return settle;
            }
        }
        // Isolated unknown screens are normal (animations, transitions)
        self.say("Unknown screen, tapping...");
        self.tap(positions::CENTER).await;
        UNKNOWN_SCREEN_SETTLE
    }

    // ============================================================
    // QUEUE
    // ============================================================

    async fn handle_queue(&mut self, screen: &P::Screen, since: Instant) -> Duration {
        let elapsed = Instant::now().saturating_duration_since(since);
        let timeout = self.settings.queue_timeout;

        if elapsed >= timeout {
            self.warn(format!(
                "Queue timeout ({}s)! Canceling...",
                timeout.as_secs()
            ));
            if self
                .state
                .record_queue_timeout(self.settings.max_queue_timeouts)
            {
                let streak = self.state.consecutive_timeouts;
                self.warn(format!(
                    "!!! {streak} consecutive queue timeouts - Restarting app !!!"
                ));
                return self.restart().await;
            }
            return self.cancel_queue(screen).await;
        }

        let secs = elapsed.as_secs();
        if secs > 0 && secs % QUEUE_REPORT_EVERY_SECS == 0 {
            self.say(format!("Queue: {secs}s / {}s", timeout.as_secs()));
        }

        if self.detect(screen, &Detect::QueueIndicator).is_some() {
            return Duration::ZERO;
        }

        if let Some(wave) = self.check_wave(screen) {
            self.say("PQ starting!");
            self.state.enter_activity(wave, Instant::now());
            return Duration::ZERO;
        }

        // Cancel button still up: same queue screen
        if self.perception.find(screen, names::STOP_QUEUE).is_some() {
            return Duration::ZERO;
        }

        self.say("Left queue");
        self.state.reset_phase();
        self.detect_and_act(screen).await
    }

    async fn cancel_queue(&mut self, screen: &P::Screen) -> Duration {
        self.state.reset_phase();
        if self.check_and_click(screen, names::STOP_QUEUE).await {
            self.say("Clicked stop queue");
            return SHORT_SETTLE;
        }
        self.tap(positions::STOP_QUEUE).await;
        sleep(CANCEL_BACK_GAP).await;
        self.key(keycode::BACK).await;
        SHORT_SETTLE
    }

    // ============================================================
    // RECOVERY LADDER
    // ============================================================

    async fn recover(&mut self, recovery: Recovery, screen: &P::Screen) -> Duration {
        match recovery {
            Recovery::HardReset { without_entry } => {
                let secs = without_entry.as_secs();
                self.warn(format!(
                    "!!! NO PQ FOR {secs}s ({}min) - Hard reset !!!",
                    secs / 60
                ));
                self.hard_reset().await
            }
            Recovery::Restart { stale } => {
                self.warn(format!(
                    "!!! HARD STUCK for {}s - Restarting app !!!",
                    stale.as_secs()
                ));
                self.restart().await
            }
            Recovery::SoftRecovery { stale } => {
                self.warn(format!(
                    "!!! SOFT STUCK for {}s - Attempting recovery !!!",
                    stale.as_secs()
                ));
                self.soft_recovery(screen).await
            }
        }
    }

    async fn soft_recovery(&mut self, screen: &P::Screen) -> Duration {
        let attempt = self.state.begin_soft_recovery();
        self.warn(format!("Recovery #{attempt} - Scanning all templates..."));

        for detect in RECOVERY_SCAN {
            if let Some(found) = self.detect(screen, detect) {
                self.say(format!("Recovery: Found '{}' - clicking!", found.name));
                self.click(&found).await;
                self.state.touch(Instant::now());
                return SHORT_SETTLE;
            }
        }

        self.say("Recovery: No template found, tapping center...");
        self.tap(positions::CENTER).await;
        SHORT_SETTLE
    }

    async fn restart(&mut self) -> Duration {
        self.state.counters.restarts += 1;
        let restarts = self.state.counters.restarts;
        self.warn(format!("Restart #{restarts} - Closing app..."));

        for _ in 0..BACK_PRESSES {
            self.key(keycode::BACK).await;
            sleep(BACK_PRESS_GAP).await;
        }
        self.key(keycode::HOME).await;
        sleep(RESET_STEP).await;

        // The entry timer stays put so repeated restarts still escalate
        self.state.record_restart(Instant::now());
        self.say("App closed. Will restart from app_button detection...");
        RESET_SETTLE
    }

    async fn hard_reset(&mut self) -> Duration {
        self.state.counters.hard_resets += 1;
        let resets = self.state.counters.hard_resets;
        self.warn(format!(
            "!!! HARD RESET #{resets} - Killing app via Recent Apps !!!"
        ));

        self.key(keycode::HOME).await;
        sleep(RESET_STEP).await;
        self.key(keycode::APP_SWITCH).await;
        self.say("Opened Recent Apps");
        sleep(RESET_STEP).await;

        match self.perception.capture(false).await {
            Ok(recents) => {
                if self.check_and_click(&recents, names::CLEAR_ALL).await {
                    self.say("Clicked CLEAR ALL");
                } else {
                    self.say("CLEAR ALL not found - tapping common position");
                    self.tap(positions::CLEAR_ALL).await;
                }
                sleep(RESET_STEP).await;
            }
            Err(e) => log::debug!("📸 Recent apps capture failed: {e}"),
        }

        self.key(keycode::HOME).await;
        sleep(RESET_STEP).await;

        let package = self.settings.game_package.clone();
        if let Err(e) = self.actions.terminate_app(&package).await {
            log::debug!("Force-stop of {package} failed: {e}");
        }
        sleep(RESET_STEP).await;

        self.state
            .record_hard_reset(Instant::now(), self.limits.thresholds.len());
        let next = self
            .limits
            .threshold(self.state.escalation_level)
            .unwrap_or_default();
        self.say(format!(
            "Apps cleared. Next PQ timeout: {}min. Looking for app_button...",
            next.as_secs() / 60
        ));
        RESET_SETTLE
    }
}
