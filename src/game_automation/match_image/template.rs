//! Template loading and caching

use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TEMPLATE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Grayscale templates cached by `subdir/name`. A template that could not be
/// found is cached as absent so the disk is only searched (and the warning
/// printed) once.
pub struct TemplateStore {
    dir: PathBuf,
    cache: HashMap<String, Option<Arc<GrayImage>>>,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn key(name: &str, subdir: Option<&str>) -> String {
        match subdir {
            Some(sub) => format!("{sub}/{name}"),
            None => name.to_string(),
        }
    }

    fn is_template_file(path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| TEMPLATE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
    }

    fn resolve(&self, name: &str, subdir: Option<&str>) -> Option<PathBuf> {
        let base = match subdir {
            Some(sub) => self.dir.join(sub),
            None => self.dir.clone(),
        };
        TEMPLATE_EXTENSIONS
            .iter()
            .map(|ext| base.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
    }

    fn load(path: &Path) -> Option<GrayImage> {
        match image::open(path) {
            Ok(img) => Some(img.to_luma8()),
            Err(e) => {
                log::warn!("⚠️ Failed to load template {}: {e}", path.display());
                None
            }
        }
    }

    pub fn get(&mut self, name: &str, subdir: Option<&str>) -> Option<Arc<GrayImage>> {
        let key = Self::key(name, subdir);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let loaded = match self.resolve(name, subdir) {
            Some(path) => Self::load(&path).map(Arc::new),
            None => {
                log::warn!("⚠️ Template not found: {key} (in {})", self.dir.display());
                None
            }
        };
        self.cache.insert(key, loaded.clone());
        loaded
    }

    /// Loads every template in the directory and its direct subdirectories.
    pub fn preload(&mut self) -> usize {
        let mut loaded = self.preload_dir(None);
        let subdirs: Vec<String> = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .flatten()
                .filter(|e| e.path().is_dir())
                .filter_map(|e| e.file_name().to_str().map(str::to_string))
                .collect(),
            Err(e) => {
                log::warn!("⚠️ Template directory {} unreadable: {e}", self.dir.display());
                return 0;
            }
        };
        for sub in subdirs {
            loaded += self.preload_dir(Some(&sub));
        }
        loaded
    }

    fn preload_dir(&mut self, subdir: Option<&str>) -> usize {
        let dir = match subdir {
            Some(sub) => self.dir.join(sub),
            None => self.dir.clone(),
        };
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return 0;
        };
        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !Self::is_template_file(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = Self::key(stem, subdir);
            if let Some(img) = Self::load(&path) {
                self.cache.insert(key, Some(Arc::new(img)));
                loaded += 1;
            }
        }
        loaded
    }

    pub fn count(&self) -> usize {
        self.cache.values().filter(|t| t.is_some()).count()
    }
}
