pub mod adb;
pub mod args;
pub mod config;
pub mod game_automation;

pub use adb::{AdbBackend, BackendKind};
pub use game_automation::{BotHandle, QuestBot};
