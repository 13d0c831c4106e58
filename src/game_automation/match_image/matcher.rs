//! Normalized cross-correlation matching

use super::config::MatchConfig;
use super::template::TemplateStore;
use image::GrayImage;
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template};

/// A located template.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl MatchResult {
    /// Tap point for this match.
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Best location and score of `template` inside `screen`.
/// None when the template does not fit in the screen.
pub fn best_match(screen: &GrayImage, template: &GrayImage) -> Option<(u32, u32, f32)> {
    if template.width() == 0
        || template.height() == 0
        || template.width() > screen.width()
        || template.height() > screen.height()
    {
        return None;
    }
    let scores = match_template(
        screen,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let extremes = find_extremes(&scores);
    let (x, y) = extremes.max_value_location;
    Some((x, y, extremes.max_value))
}

pub struct TemplateMatcher {
    store: TemplateStore,
    config: MatchConfig,
}

impl TemplateMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            store: TemplateStore::new(config.templates_dir.clone()),
            config,
        }
    }

    pub fn preload(&mut self) -> usize {
        self.store.preload()
    }

    /// Looks for `name` in `screen`; only matches at or above the threshold are returned.
    pub fn find(
        &mut self,
        screen: &GrayImage,
        name: &str,
        threshold: Option<f32>,
        subdir: Option<&str>,
    ) -> Option<MatchResult> {
        let template = self.store.get(name, subdir)?;
        let threshold = threshold.unwrap_or(self.config.confidence_threshold);
        let (x, y, confidence) = best_match(screen, &template)?;
        log::trace!("{name}: best {confidence:.3} at ({x},{y})");
        if confidence.is_nan() || confidence < threshold {
            return None;
        }
        Some(MatchResult {
            name: name.to_string(),
            x,
            y,
            width: template.width(),
            height: template.height(),
            confidence,
        })
    }
}
