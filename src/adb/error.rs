use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for ADB operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all ADB-related operations.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("'adb' binary not found in PATH. Install Android Platform Tools or run with --impl=rust")]
    AdbBinaryNotFound,

    #[error("Failed to launch '{command}': {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("Command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Shell command '{command}' failed: {source}")]
    ShellCommandFailed {
        command: String,
        source: adb_client::RustADBError,
    },

    #[error("Invalid device address '{address}', expected HOST:PORT")]
    InvalidAddress { address: String },

    #[error("Failed to connect to {address}: {message}")]
    ConnectionFailed { address: String, message: String },

    #[error("Device '{name}' not found")]
    DeviceNotFound { name: String },

    #[error("Operation timed out after {duration:?}: {description}")]
    Timeout {
        duration: Duration,
        description: String,
    },

    #[error("Task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },

    #[error("Could not parse screen size from 'wm size' output")]
    ScreenSizeParseFailed,

    #[error("Screen capture returned no image data")]
    EmptyCapture,

    #[error("Failed to decode screenshot: {description}")]
    DecodeFailed { description: String },

    #[error("Tap coordinates are out of bounds: x={x}, y={y}")]
    TapOutOfBounds { x: u32, y: u32 },

    #[error("ADB protocol desync (CLSE error) - connection needs to be re-established: {description}")]
    ProtocolDesync { description: String },
}

impl AdbError {
    /// True when the control channel itself is gone: retries keep failing until
    /// the device is reconnected.
    pub fn is_transport_lost(&self) -> bool {
        match self {
            AdbError::ProtocolDesync { .. }
            | AdbError::AdbBinaryNotFound
            | AdbError::DeviceNotFound { .. } => true,
            AdbError::ShellCommandFailed { source, .. } => {
                is_disconnect_message(&source.to_string())
            }
            AdbError::CommandFailed { stderr, .. } => is_disconnect_message(stderr),
            _ => false,
        }
    }

    /// Wraps an `adb_client` failure, promoting protocol desyncs to their own variant.
    pub fn from_shell_error(command: String, source: adb_client::RustADBError) -> Self {
        let err_str = source.to_string();
        if err_str.contains("CLSE") || err_str.contains("no write endpoint") {
            AdbError::ProtocolDesync {
                description: format!("Command '{command}' failed with protocol error: {err_str}"),
            }
        } else {
            AdbError::ShellCommandFailed { command, source }
        }
    }
}

/// Matches the messages adb and `adb_client` produce once a device has dropped off.
pub fn is_disconnect_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("device offline")
        || lower.contains("device not found")
        || lower.contains("no devices/emulators found")
        || lower.contains("device unauthorized")
        || lower.contains("connection refused")
        || lower.contains("broken pipe")
        || lower.contains("clse")
}
