//! Bot settings stored in `config/settings.toml`.

use crate::adb::BackendKind;
use crate::args::Args;
use crate::game_automation::device::InputSettings;
use crate::game_automation::fsm::BotSettings;
use crate::game_automation::match_image::{DEFAULT_TEMPLATES_DIR, MatchConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration (TOML). Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// env_logger filter used when RUST_LOG is not set
    pub log_level: String,
    pub templates_dir: PathBuf,
    pub adb: AdbSection,
    pub bot: BotSection,
    pub matching: MatchingSection,
    pub input: InputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct AdbSection {
    /// HOST:PORT of the emulator (BlueStacks defaults to 127.0.0.1:5555)
    pub address: String,
    pub backend: BackendKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct BotSection {
    pub quest_choice: String,
    pub queue_timeout_secs: u64,
    pub stuck_timeout_secs: u64,
    pub max_queue_timeouts: u32,
    pub random_jump: bool,
    pub jump_interval_secs: u64,
    /// Hard reset after this long without entering a quest, one entry per escalation level
    pub escalation_thresholds_secs: Vec<u64>,
    pub game_package: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct MatchingSection {
    pub threshold: f32,
    pub screenshot_cache_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct InputSection {
    pub humanize: bool,
    pub tap_offset_range: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
            adb: AdbSection::default(),
            bot: BotSection::default(),
            matching: MatchingSection::default(),
            input: InputSection::default(),
        }
    }
}

impl Default for AdbSection {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5555".to_string(),
            backend: BackendKind::Shell,
        }
    }
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            quest_choice: "sleepywood".to_string(),
            queue_timeout_secs: 30,
            stuck_timeout_secs: 120,
            max_queue_timeouts: 5,
            random_jump: true,
            jump_interval_secs: 30,
            escalation_thresholds_secs: vec![450, 900],
            game_package: "com.nexon.maplem.global".to_string(),
        }
    }
}

impl Default for MatchingSection {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            screenshot_cache_ms: 100,
        }
    }
}

impl Default for InputSection {
    fn default() -> Self {
        let input = InputSettings::default();
        Self {
            humanize: input.humanize,
            tap_offset_range: input.tap_offset_range,
            screen_width: input.screen_width,
            screen_height: input.screen_height,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };
        if self.bot.quest_choice.trim().is_empty() {
            return invalid("bot.quest-choice must not be empty");
        }
        if self.bot.queue_timeout_secs == 0 {
            return invalid("bot.queue-timeout-secs must be > 0");
        }
        if self.bot.stuck_timeout_secs == 0 {
            return invalid("bot.stuck-timeout-secs must be > 0");
        }
        if self.bot.max_queue_timeouts == 0 {
            return invalid("bot.max-queue-timeouts must be > 0");
        }
        if self.bot.escalation_thresholds_secs.is_empty()
            || self.bot.escalation_thresholds_secs.contains(&0)
        {
            return invalid("bot.escalation-thresholds-secs must be a non-empty list of values > 0");
        }
        if !(self.matching.threshold > 0.0 && self.matching.threshold <= 1.0) {
            return invalid("matching.threshold must be in (0, 1]");
        }
        if self.input.screen_width == 0 || self.input.screen_height == 0 {
            return invalid("input.screen-width and input.screen-height must be > 0");
        }
        Ok(())
    }

    /// Applies command line overrides, then re-checks the result.
    pub fn apply_args(&mut self, args: &Args) -> Result<(), ConfigError> {
        if let Some(address) = &args.address {
            self.adb.address = address.clone();
        }
        if let Some(backend) = args.backend {
            self.adb.backend = backend;
        }
        if let Some(quest) = &args.quest {
            self.bot.quest_choice = quest.clone();
        }
        self.validate()
    }

    pub fn bot_settings(&self) -> BotSettings {
        let bot = &self.bot;
        BotSettings {
            quest: bot.quest_choice.clone(),
            queue_timeout: Duration::from_secs(bot.queue_timeout_secs),
            stuck_timeout: Duration::from_secs(bot.stuck_timeout_secs),
            max_queue_timeouts: bot.max_queue_timeouts,
            random_jump: bot.random_jump,
            jump_interval: Duration::from_secs(bot.jump_interval_secs),
            escalation_thresholds: bot
                .escalation_thresholds_secs
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            game_package: bot.game_package.clone(),
        }
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            confidence_threshold: self.matching.threshold,
            templates_dir: self.templates_dir.clone(),
        }
    }

    pub fn input_settings(&self) -> InputSettings {
        InputSettings {
            humanize: self.input.humanize,
            tap_offset_range: self.input.tap_offset_range,
            screen_width: self.input.screen_width,
            screen_height: self.input.screen_height,
        }
    }

    pub fn screenshot_cache(&self) -> Duration {
        Duration::from_millis(self.matching.screenshot_cache_ms)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `Config::default()`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        log::info!("⚙️ No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Writes `config` to disk (temp file + rename).
pub fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    config.validate()?;
    let mut buf = toml::to_string_pretty(config)?;
    buf.push('\n');

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}

pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    write_config(path, &Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_write_default_then_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config").join("settings.toml");
        write_default_config(&path).expect("write");
        assert_eq!(load_config(&path).expect("load"), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("settings.toml");
        fs::write(
            &path,
            r#"
log-level = "debug"

[adb]
backend = "rust"

[bot]
quest-choice = "ludibrium"
escalation-thresholds-secs = [300, 600, 1200]
"#,
        )
        .expect("write");

        let config = load_config(&path).expect("load");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.adb.backend, BackendKind::Rust);
        assert_eq!(config.adb.address, "127.0.0.1:5555");
        assert_eq!(config.bot.quest_choice, "ludibrium");
        assert_eq!(config.bot.queue_timeout_secs, 30);
        assert_eq!(config.matching.threshold, 0.85);

        let settings = config.bot_settings();
        assert_eq!(settings.escalation_thresholds.len(), 3);
        assert_eq!(settings.stuck_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_defaults_match_bot_defaults() {
        let config = Config::default();
        assert_eq!(config.bot_settings(), BotSettings::default());
        assert_eq!(config.match_config(), MatchConfig::default());
        assert_eq!(config.input_settings(), InputSettings::default());
        assert_eq!(config.screenshot_cache(), Duration::from_millis(100));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.bot.escalation_thresholds_secs.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.bot.queue_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.matching.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.max_queue_timeouts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_are_validated() {
        let mut args = Args::parse_from(["--address=10.0.0.7:5555", "--impl=rust"]).expect("args");
        let mut config = Config::default();
        config.apply_args(&args).expect("valid overrides");
        assert_eq!(config.adb.address, "10.0.0.7:5555");
        assert_eq!(config.adb.backend, BackendKind::Rust);
        assert_eq!(config.bot.quest_choice, "sleepywood");

        args.quest = Some("  ".to_string());
        let err = config.apply_args(&args).expect_err("blank quest");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("settings.toml");
        fs::write(&path, "[bot\nquest-choice = 1").expect("write");
        let err = load_config(&path).expect_err("broken toml");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("settings.toml"));
    }
}
