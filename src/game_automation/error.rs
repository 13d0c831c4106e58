use super::types::LifecycleState;
use thiserror::Error;

/// Errors that refuse to begin a bot run.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Cannot move bot from {from:?} to {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}
