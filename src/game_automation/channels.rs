// Communication channels for game automation
use super::types::{AutomationCommand, AutomationEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

/// Helper function to create automation channels
pub fn create_automation_channels() -> (
    mpsc::Sender<AutomationCommand>,
    mpsc::Receiver<AutomationCommand>,
    mpsc::Sender<AutomationEvent>,
    mpsc::Receiver<AutomationEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
    (cmd_tx, cmd_rx, event_tx, event_rx)
}

/// Fire-and-forget event publisher. Never waits on the receiver.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<AutomationEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<AutomationEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink without observers.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: AutomationEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::debug!("Observer channel full, dropping {event:?}");
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Observer channel closed, dropping event");
            }
        }
    }
}

/// Cloneable control handle for a running bot.
#[derive(Debug, Clone)]
pub struct BotHandle {
    tx: mpsc::Sender<AutomationCommand>,
}

impl BotHandle {
    pub fn new(tx: mpsc::Sender<AutomationCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, command: AutomationCommand) {
        // A closed channel means the loop already ended, which is what stop wants anyway
        if self.tx.send(command).await.is_err() {
            log::debug!("Bot loop gone, {command:?} ignored");
        }
    }

    /// Requests loop termination. Idempotent.
    pub async fn stop(&self) {
        self.send(AutomationCommand::Stop).await;
    }

    pub async fn pause(&self) {
        self.send(AutomationCommand::Pause).await;
    }

    pub async fn resume(&self) {
        self.send(AutomationCommand::Resume).await;
    }
}
