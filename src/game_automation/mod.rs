// Game automation module
// This module provides the quest bot: a perception-action control loop with an
// escalating stuck/recovery ladder, driving an Android game via ADB.

pub mod channels;
pub mod device;
pub mod error;
pub mod fsm;
pub mod match_image;
pub mod ports;
pub mod recovery;
pub mod screens;
pub mod state;
pub mod types;


// Re-export the main types and functions for easy access
pub use channels::{BotHandle, EventSink, create_automation_channels};
pub use device::{AdbPerception, HumanizedInput, InputSettings};
pub use error::BotError;
pub use fsm::{BotSettings, QuestBot};
pub use match_image::{MatchConfig, MatchResult, TemplateMatcher};
pub use ports::{Actions, Perception};
pub use types::{
    AutomationCommand, AutomationEvent, Counters, LifecycleState, Phase, RunSummary,
    StatsSnapshot,
};
