use crate::adb::BackendKind;
use crate::config::DEFAULT_CONFIG_PATH;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Run the quest bot until stopped
    Run,
    /// Capture one screenshot and exit
    Screenshot,
    /// Write a default settings file and exit
    CreateConfig,
}

/// Command line flags. Everything except `mode` overrides the settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub config_path: PathBuf,
    pub address: Option<String>,
    pub backend: Option<BackendKind>,
    pub quest: Option<String>,
    pub debug_mode: bool,
    pub timeout_secs: Option<u64>,
}

/// Why parsing stopped without producing `Args`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseExit {
    Help,
    Version,
    Invalid(String),
}

impl Args {
    /// Parses the process arguments. Prints help/version/errors and returns None when the
    /// program should exit.
    pub fn parse() -> Option<Self> {
        match Self::parse_from(env::args().skip(1)) {
            Ok(args) => Some(args),
            Err(ParseExit::Help) => {
                print_help();
                None
            }
            Err(ParseExit::Version) => {
                println!(
                    "Android PQ Bot v{} (built {})",
                    env!("APP_VERSION_DISPLAY"),
                    env!("APP_BUILD_YEAR")
                );
                None
            }
            Err(ParseExit::Invalid(msg)) => {
                eprintln!("❌ {msg}");
                print_help();
                None
            }
        }
    }

    pub fn parse_from<I, S>(args: I) -> Result<Self, ParseExit>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Args {
            mode: Mode::Run,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            address: None,
            backend: None,
            quest: None,
            debug_mode: false,
            timeout_secs: None,
        };

        for arg in args {
            let arg = arg.as_ref();
            if arg == "--help" || arg == "-h" {
                return Err(ParseExit::Help);
            } else if arg == "--version" || arg == "-v" {
                return Err(ParseExit::Version);
            } else if arg == "--debug" {
                parsed.debug_mode = true;
            } else if arg == "--screenshot" || arg == "-s" {
                parsed.mode = Mode::Screenshot;
            } else if arg == "--create-config" {
                parsed.mode = Mode::CreateConfig;
            } else if let Some(val) = arg.strip_prefix("--config=") {
                parsed.config_path = PathBuf::from(non_empty("--config", val)?);
            } else if let Some(val) = arg.strip_prefix("--address=") {
                parsed.address = Some(non_empty("--address", val)?.to_string());
            } else if let Some(val) = arg.strip_prefix("--quest=") {
                parsed.quest = Some(non_empty("--quest", val)?.to_lowercase());
            } else if let Some(val) = arg.strip_prefix("--impl=") {
                parsed.backend = Some(val.parse().map_err(ParseExit::Invalid)?);
            } else if let Some(val) = arg.strip_prefix("--timeout=") {
                match val.parse::<u64>() {
                    Ok(secs) if secs > 0 => parsed.timeout_secs = Some(secs),
                    _ => return Err(ParseExit::Invalid(format!("Invalid timeout value: {val}"))),
                }
            } else {
                return Err(ParseExit::Invalid(format!("Unknown argument: {arg}")));
            }
        }

        Ok(parsed)
    }
}

fn non_empty<'a>(flag: &str, val: &'a str) -> Result<&'a str, ParseExit> {
    if val.trim().is_empty() {
        Err(ParseExit::Invalid(format!("{flag} needs a value")))
    } else {
        Ok(val)
    }
}

pub fn print_help() {
    println!("🤖 Android PQ Bot");
    println!();
    println!("USAGE:");
    println!("    android-pq-bot [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)            Run the bot with {DEFAULT_CONFIG_PATH}");
    println!("    --config=PATH         Settings file to use");
    println!("    --address=HOST:PORT   Emulator ADB address (default 127.0.0.1:5555)");
    println!("    --impl=<shell|rust>   Select ADB implementation (default: shell)");
    println!("                          The shell implementation requires the ADB tool to be installed.");
    println!("    --quest=NAME          Party quest to run (e.g. sleepywood, ludibrium)");
    println!("    --debug               Enable debug logging");
    println!("    --timeout=N           Stop the bot after N seconds");
    println!("    --screenshot, -s      Take a screenshot and save to file (cli-screenshot.png)");
    println!("    --create-config       Write a default settings file and exit");
    println!("    --help, -h            Show this help message");
    println!("    --version, -v         Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    android-pq-bot --create-config");
    println!("    android-pq-bot --screenshot --impl=rust");
    println!("    android-pq-bot --quest=ludibrium --debug");
    println!("    android-pq-bot --address=127.0.0.1:5565 --timeout=3600");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_runs_with_default_config() {
        let args = Args::parse_from(Vec::<String>::new()).unwrap();
        assert_eq!(args.mode, Mode::Run);
        assert_eq!(args.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(args.address.is_none());
        assert!(args.backend.is_none());
        assert!(!args.debug_mode);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "--config=my.toml",
            "--address=10.0.0.2:5555",
            "--impl=rust",
            "--quest=Ludibrium",
            "--debug",
            "--timeout=60",
        ])
        .unwrap();
        assert_eq!(args.config_path, PathBuf::from("my.toml"));
        assert_eq!(args.address.as_deref(), Some("10.0.0.2:5555"));
        assert_eq!(args.backend, Some(BackendKind::Rust));
        assert_eq!(args.quest.as_deref(), Some("ludibrium"));
        assert!(args.debug_mode);
        assert_eq!(args.timeout_secs, Some(60));
    }

    #[test]
    fn test_modes() {
        assert_eq!(Args::parse_from(["-s"]).unwrap().mode, Mode::Screenshot);
        assert_eq!(
            Args::parse_from(["--create-config"]).unwrap().mode,
            Mode::CreateConfig
        );
    }

    #[test]
    fn test_help_and_version_stop_parsing() {
        assert_eq!(Args::parse_from(["--debug", "-h"]), Err(ParseExit::Help));
        assert_eq!(Args::parse_from(["--version"]), Err(ParseExit::Version));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Args::parse_from(["--impl=usb"]),
            Err(ParseExit::Invalid(_))
        ));
        assert!(matches!(
            Args::parse_from(["--timeout=abc"]),
            Err(ParseExit::Invalid(_))
        ));
        assert!(matches!(
            Args::parse_from(["--timeout=0"]),
            Err(ParseExit::Invalid(_))
        ));
        assert!(matches!(
            Args::parse_from(["--quest="]),
            Err(ParseExit::Invalid(_))
        ));
        assert_eq!(
            Args::parse_from(["--gui"]),
            Err(ParseExit::Invalid("Unknown argument: --gui".to_string()))
        );
    }
}
