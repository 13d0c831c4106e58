//! Configuration for image matching operations

use std::path::PathBuf;

pub const DEFAULT_TEMPLATES_DIR: &str = "templates/maple_story_idle";

#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Confidence threshold for template matching (0.0 to 1.0)
    pub confidence_threshold: f32,
    /// Root directory holding `<name>.png` templates, optionally in subdirectories
    pub templates_dir: PathBuf,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            templates_dir: PathBuf::from(DEFAULT_TEMPLATES_DIR),
        }
    }
}
