// Capabilities the control loop consumes. The ADB-backed implementations live
// in `device.rs`; tests plug in scripted ones.
use super::match_image::MatchResult;
use crate::adb::{AdbResult, keycode};

#[allow(async_fn_in_trait)]
pub trait Perception {
    type Screen;

    /// Grabs a screen. `use_cache` allows reusing a very recent frame.
    async fn capture(&mut self, use_cache: bool) -> AdbResult<Self::Screen>;

    /// Locates a template. `threshold` defaults to the configured global one.
    fn find_with(
        &mut self,
        screen: &Self::Screen,
        name: &str,
        threshold: Option<f32>,
        subdir: Option<&str>,
    ) -> Option<MatchResult>;

    fn find(&mut self, screen: &Self::Screen, name: &str) -> Option<MatchResult> {
        self.find_with(screen, name, None, None)
    }

    /// Warms the template cache. Returns how many templates are available.
    fn preload(&mut self) -> usize {
        0
    }

    /// Re-establishes the screen source after repeated transport failures.
    async fn reconnect(&mut self) -> AdbResult<()> {
        Ok(())
    }
}

/// Input on the logical screen. A failure means "assume nothing happened".
#[allow(async_fn_in_trait)]
pub trait Actions {
    async fn tap(&mut self, x: u32, y: u32) -> AdbResult<()>;
    async fn swipe(&mut self, x1: u32, y1: u32, x2: u32, y2: u32, duration_ms: u32)
    -> AdbResult<()>;
    async fn long_press(&mut self, x: u32, y: u32, duration_ms: u32) -> AdbResult<()>;
    async fn key_event(&mut self, code: u32) -> AdbResult<()>;
    /// Force-stops an application package.
    async fn terminate_app(&mut self, package: &str) -> AdbResult<()>;

    async fn back(&mut self) -> AdbResult<()> {
        self.key_event(keycode::BACK).await
    }

    async fn home(&mut self) -> AdbResult<()> {
        self.key_event(keycode::HOME).await
    }
}
