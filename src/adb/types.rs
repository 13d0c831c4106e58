// Core ADB types and traits
use super::error::{AdbError, AdbResult};
use serde::Serialize;

/// Android key codes used by the bot.
pub mod keycode {
    pub const HOME: u32 = 3;
    pub const BACK: u32 = 4;
    pub const APP_SWITCH: u32 = 187;
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageCapture {
    pub bytes: Vec<u8>,
    pub duration_ms: u128,
}

// Trait defining ADB capabilities (shell or rust implementations)
#[allow(async_fn_in_trait)]
pub trait AdbClient: Send + Sync {
    // Raw backend-specific capture, PNG encoded
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>>;

    // Default high-level capture with timing
    async fn screen_capture(&self) -> AdbResult<ImageCapture> {
        let start = std::time::Instant::now();
        let bytes = self.screen_capture_bytes().await?;
        Ok(ImageCapture {
            bytes,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()>;
    async fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32, duration_ms: u32) -> AdbResult<()>;
    async fn key_event(&self, code: u32) -> AdbResult<()>;
    /// Runs a shell command on the device and returns its stdout.
    async fn shell(&self, command: &str) -> AdbResult<String>;
    /// Drops and re-establishes the device connection after it went away.
    async fn reconnect(&self) -> AdbResult<()>;
    fn screen_dimensions(&self) -> (u32, u32);
    fn device_name(&self) -> &str;
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Device {
    pub name: String,
    pub state: String,
}

/// Parses the "Physical size: WxH" line of `wm size`. An override size wins
/// because input coordinates follow it.
pub fn parse_screen_size(stdout: &str) -> Option<(u32, u32)> {
    let mut physical = None;
    for line in stdout.lines() {
        let line = line.trim();
        let (is_override, size_str) = if let Some(rest) = line.strip_prefix("Override size:") {
            (true, rest)
        } else if let Some(rest) = line.strip_prefix("Physical size:") {
            (false, rest)
        } else {
            continue;
        };
        let parts: Vec<&str> = size_str.trim().split('x').collect();
        if parts.len() == 2
            && let (Ok(x), Ok(y)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>())
        {
            if is_override {
                return Some((x, y));
            }
            physical = Some((x, y));
        }
    }
    physical
}

/// Rejects input coordinates outside a `width`x`height` screen (valid range is 0..width).
pub fn check_bounds(x: u32, y: u32, (width, height): (u32, u32)) -> AdbResult<()> {
    if x >= width || y >= height {
        return Err(AdbError::TapOutOfBounds { x, y });
    }
    Ok(())
}
