//! Image matching module for Android game automation
//!
//! Templates are cut from screenshots of the game and located on new screenshots
//! by normalized cross-correlation.

pub mod config;
pub mod matcher;
pub mod template;

#[cfg(test)]
mod tests;

// Re-export main types and functions
pub use config::{DEFAULT_TEMPLATES_DIR, MatchConfig};
pub use matcher::{MatchResult, TemplateMatcher, best_match};
pub use template::{TEMPLATE_EXTENSIONS, TemplateStore};
