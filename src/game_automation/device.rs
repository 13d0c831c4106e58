// ADB-backed perception and action ports.
use super::match_image::{MatchConfig, MatchResult, TemplateMatcher};
use super::ports::{Actions, Perception};
use crate::adb::{AdbClient, AdbError, AdbResult};
use image::GrayImage;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::time::Instant;

/// Screen capture with a short-lived frame cache, plus template matching.
pub struct AdbPerception<C: AdbClient> {
    client: Arc<C>,
    matcher: TemplateMatcher,
    cache_ttl: Duration,
    last_frame: Option<(Instant, Arc<GrayImage>)>,
}

impl<C: AdbClient> AdbPerception<C> {
    pub fn new(client: Arc<C>, config: MatchConfig, cache_ttl: Duration) -> Self {
        Self {
            client,
            matcher: TemplateMatcher::new(config),
            cache_ttl,
            last_frame: None,
        }
    }
}

/// Runs CPU-heavy work in place, letting a multi-threaded runtime move its other
/// tasks off this worker meanwhile.
fn cpu_bound<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

pub fn decode_grayscale(bytes: &[u8]) -> AdbResult<GrayImage> {
    let img = image::load_from_memory(bytes).map_err(|e| AdbError::DecodeFailed {
        description: e.to_string(),
    })?;
    Ok(img.to_luma8())
}

impl<C: AdbClient> Perception for AdbPerception<C> {
    type Screen = Arc<GrayImage>;

    async fn capture(&mut self, use_cache: bool) -> AdbResult<Arc<GrayImage>> {
        if use_cache
            && let Some((taken, frame)) = &self.last_frame
            && taken.elapsed() < self.cache_ttl
        {
            return Ok(Arc::clone(frame));
        }
        let capture = self.client.screen_capture().await?;
        let frame = Arc::new(decode_grayscale(&capture.bytes)?);
        log::trace!(
            "📸 Captured {}x{} in {}ms",
            frame.width(),
            frame.height(),
            capture.duration_ms
        );
        self.last_frame = Some((Instant::now(), Arc::clone(&frame)));
        Ok(frame)
    }

    fn find_with(
        &mut self,
        screen: &Arc<GrayImage>,
        name: &str,
        threshold: Option<f32>,
        subdir: Option<&str>,
    ) -> Option<MatchResult> {
        let matcher = &mut self.matcher;
        cpu_bound(|| matcher.find(screen, name, threshold, subdir))
    }

    fn preload(&mut self) -> usize {
        self.matcher.preload()
    }

    async fn reconnect(&mut self) -> AdbResult<()> {
        self.last_frame = None;
        self.client.reconnect().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputSettings {
    pub humanize: bool,
    pub tap_offset_range: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            humanize: true,
            tap_offset_range: 5,
            screen_width: 960,
            screen_height: 540,
        }
    }
}

const TAP_DELAY_MS: std::ops::RangeInclusive<u64> = 50..=150;

/// Taps and swipes with a little randomness so input does not look scripted.
pub struct HumanizedInput<C: AdbClient> {
    client: Arc<C>,
    settings: InputSettings,
}

impl<C: AdbClient> HumanizedInput<C> {
    pub fn new(client: Arc<C>, settings: InputSettings) -> Self {
        Self { client, settings }
    }

    /// Random offset applied to a point, clamped to the logical screen.
    fn jitter_point(&self, x: u32, y: u32) -> (u32, u32) {
        let max_x = self.settings.screen_width.saturating_sub(1);
        let max_y = self.settings.screen_height.saturating_sub(1);
        if !self.settings.humanize {
            return (x.min(max_x), y.min(max_y));
        }
        let range = self.settings.tap_offset_range as i64;
        let mut rng = rand::thread_rng();
        let dx = rng.gen_range(-range..=range);
        let dy = rng.gen_range(-range..=range);
        (
            (x as i64 + dx).clamp(0, max_x as i64) as u32,
            (y as i64 + dy).clamp(0, max_y as i64) as u32,
        )
    }

    fn jitter_duration(&self, duration_ms: u32) -> u32 {
        if !self.settings.humanize || duration_ms == 0 {
            return duration_ms;
        }
        let spread = (duration_ms / 10).max(1);
        rand::thread_rng().gen_range(duration_ms.saturating_sub(spread)..=duration_ms + spread)
    }

    async fn human_delay(&self) {
        if !self.settings.humanize {
            return;
        }
        let delay = rand::thread_rng().gen_range(TAP_DELAY_MS);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

impl<C: AdbClient> Actions for HumanizedInput<C> {
    async fn tap(&mut self, x: u32, y: u32) -> AdbResult<()> {
        self.human_delay().await;
        let (tx, ty) = self.jitter_point(x, y);
        log::debug!("👆 tap ({x},{y}) -> ({tx},{ty})");
        self.client.tap(tx, ty).await
    }

    async fn swipe(
        &mut self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: u32,
    ) -> AdbResult<()> {
        self.human_delay().await;
        let (sx, sy) = self.jitter_point(x1, y1);
        let (ex, ey) = self.jitter_point(x2, y2);
        let duration = self.jitter_duration(duration_ms);
        log::debug!("👆 swipe ({sx},{sy}) -> ({ex},{ey}) over {duration}ms");
        self.client.swipe(sx, sy, ex, ey, duration).await
    }

    async fn long_press(&mut self, x: u32, y: u32, duration_ms: u32) -> AdbResult<()> {
        self.human_delay().await;
        let (px, py) = self.jitter_point(x, y);
        log::debug!("👆 long press ({px},{py}) for {duration_ms}ms");
        self.client.swipe(px, py, px, py, duration_ms).await
    }

    async fn key_event(&mut self, code: u32) -> AdbResult<()> {
        log::debug!("⌨️ keyevent {code}");
        self.client.key_event(code).await
    }

    async fn terminate_app(&mut self, package: &str) -> AdbResult<()> {
        log::debug!("🛑 force-stop {package}");
        self.client
            .shell(&format!("am force-stop {package}"))
            .await
            .map(|_| ())
    }
}
