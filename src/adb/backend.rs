use super::error::AdbResult;
use super::rust_impl::RustAdb;
use super::shell::AdbShell;
use super::types::{AdbClient, Device};
use serde::{Deserialize, Serialize};

/// Which ADB implementation drives the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External `adb` executable (what BlueStacks ships as HD-Adb)
    #[default]
    Shell,
    /// Pure Rust client talking to the adb server
    Rust,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shell" => Ok(BackendKind::Shell),
            "rust" => Ok(BackendKind::Rust),
            other => Err(format!("unknown impl '{other}', expected 'rust' or 'shell'")),
        }
    }
}

pub enum AdbBackend {
    Shell(AdbShell),
    Rust(RustAdb),
}

impl AdbBackend {
    pub async fn list_devices(kind: BackendKind) -> AdbResult<Vec<Device>> {
        match kind {
            BackendKind::Shell => AdbShell::list_devices().await,
            BackendKind::Rust => RustAdb::list_devices().await,
        }
    }

    pub async fn connect(address: &str, kind: BackendKind) -> AdbResult<Self> {
        match kind {
            BackendKind::Shell => Ok(AdbBackend::Shell(AdbShell::connect(address).await?)),
            BackendKind::Rust => Ok(AdbBackend::Rust(RustAdb::connect(address).await?)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            AdbBackend::Shell(_) => BackendKind::Shell,
            AdbBackend::Rust(_) => BackendKind::Rust,
        }
    }
}

impl AdbClient for AdbBackend {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        match self {
            AdbBackend::Shell(s) => s.screen_capture_bytes().await,
            AdbBackend::Rust(r) => r.screen_capture_bytes().await,
        }
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.tap(x, y).await,
            AdbBackend::Rust(r) => r.tap(x, y).await,
        }
    }

    async fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32, duration_ms: u32) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.swipe(x1, y1, x2, y2, duration_ms).await,
            AdbBackend::Rust(r) => r.swipe(x1, y1, x2, y2, duration_ms).await,
        }
    }

    async fn key_event(&self, code: u32) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.key_event(code).await,
            AdbBackend::Rust(r) => r.key_event(code).await,
        }
    }

    async fn shell(&self, command: &str) -> AdbResult<String> {
        match self {
            AdbBackend::Shell(s) => s.shell(command).await,
            AdbBackend::Rust(r) => r.shell(command).await,
        }
    }

    async fn reconnect(&self) -> AdbResult<()> {
        match self {
            AdbBackend::Shell(s) => s.reconnect().await,
            AdbBackend::Rust(r) => r.reconnect().await,
        }
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        match self {
            AdbBackend::Shell(s) => s.screen_dimensions(),
            AdbBackend::Rust(r) => r.screen_dimensions(),
        }
    }

    fn device_name(&self) -> &str {
        match self {
            AdbBackend::Shell(s) => s.device_name(),
            AdbBackend::Rust(r) => r.device_name(),
        }
    }
}
