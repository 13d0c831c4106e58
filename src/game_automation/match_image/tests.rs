//! Tests for image matching functionality

use crate::game_automation::match_image::{
    MatchConfig, MatchResult, TemplateMatcher, TemplateStore, best_match,
};
use image::{GrayImage, Luma};
use std::path::Path;

const BACKGROUND: u8 = 100;

/// 16x16 checkerboard of 4px cells, the kind of high-contrast patch a button gives
fn patch() -> GrayImage {
    GrayImage::from_fn(16, 16, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn screen_with_patch(px: u32, py: u32) -> GrayImage {
    let mut screen = GrayImage::from_pixel(120, 80, Luma([BACKGROUND]));
    image::imageops::replace(&mut screen, &patch(), px as i64, py as i64);
    screen
}

fn matcher_with_templates(dir: &Path, names: &[&str]) -> TemplateMatcher {
    for name in names {
        patch()
            .save(dir.join(format!("{name}.png")))
            .expect("write template");
    }
    TemplateMatcher::new(MatchConfig {
        templates_dir: dir.to_path_buf(),
        ..MatchConfig::default()
    })
}

// ============================================================
// MATCH RESULT TESTS
// ============================================================

#[test]
fn test_match_result_center() {
    let m = MatchResult {
        name: "start_queue".to_string(),
        x: 100,
        y: 40,
        width: 30,
        height: 11,
        confidence: 0.93,
    };
    assert_eq!(m.center(), (115, 45));
}

#[test]
fn test_match_config_defaults() {
    let config = MatchConfig::default();
    assert_eq!(config.confidence_threshold, 0.85);
    assert_eq!(
        config.templates_dir,
        Path::new("templates/maple_story_idle")
    );
}

// ============================================================
// MATCHING TESTS
// ============================================================

#[test]
fn test_best_match_finds_exact_location() {
    let (x, y, score) = best_match(&screen_with_patch(40, 30), &patch()).expect("fits");
    assert_eq!((x, y), (40, 30));
    assert!(score > 0.99, "Exact copy should score ~1.0, got {score}");
}

#[test]
fn test_best_match_template_larger_than_screen() {
    let screen = GrayImage::from_pixel(8, 8, Luma([BACKGROUND]));
    assert!(best_match(&screen, &patch()).is_none());
}

#[test]
fn test_find_returns_match_above_threshold() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut matcher = matcher_with_templates(dir.path(), &["confirm"]);

    let found = matcher
        .find(&screen_with_patch(40, 30), "confirm", None, None)
        .expect("confirm should be visible");
    assert_eq!(found.name, "confirm");
    assert_eq!((found.x, found.y), (40, 30));
    assert_eq!((found.width, found.height), (16, 16));
    assert_eq!(found.center(), (48, 38));
}

#[test]
fn test_find_rejects_below_threshold() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut matcher = matcher_with_templates(dir.path(), &["confirm"]);

    // Plain background scores ~0.71 against a half-white checkerboard
    let blank = GrayImage::from_pixel(120, 80, Luma([BACKGROUND]));
    assert!(matcher.find(&blank, "confirm", None, None).is_none());
    // A lenient per-call threshold lets it through
    assert!(matcher.find(&blank, "confirm", Some(0.5), None).is_some());
}

#[test]
fn test_find_missing_template() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut matcher = matcher_with_templates(dir.path(), &[]);
    assert!(
        matcher
            .find(&screen_with_patch(0, 0), "nope", None, None)
            .is_none()
    );
}

#[test]
fn test_find_in_subdirectory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sub = dir.path().join("recents");
    std::fs::create_dir(&sub).expect("subdir");
    patch().save(sub.join("clear_all.png")).expect("write template");
    let mut matcher = matcher_with_templates(dir.path(), &[]);

    assert!(
        matcher
            .find(&screen_with_patch(10, 10), "clear_all", None, None)
            .is_none(),
        "Not in the root directory"
    );
    assert!(
        matcher
            .find(&screen_with_patch(10, 10), "clear_all", None, Some("recents"))
            .is_some()
    );
}

// ============================================================
// TEMPLATE STORE TESTS
// ============================================================

#[test]
fn test_store_key() {
    assert_eq!(TemplateStore::key("jump", None), "jump");
    assert_eq!(TemplateStore::key("jump", Some("pq")), "pq/jump");
}

#[test]
fn test_store_caches_missing_templates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = TemplateStore::new(dir.path());
    assert!(store.get("red_alert", None).is_none());

    // Written after the first lookup: the absence is cached
    patch()
        .save(dir.path().join("red_alert.png"))
        .expect("write template");
    assert!(store.get("red_alert", None).is_none());
}

#[test]
fn test_store_preload_counts_images_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    patch().save(dir.path().join("jump.png")).expect("write");
    patch().save(dir.path().join("clear.bmp")).expect("write");
    std::fs::write(dir.path().join("notes.txt"), "not an image").expect("write");
    let sub = dir.path().join("extra");
    std::fs::create_dir(&sub).expect("subdir");
    patch().save(sub.join("exit.png")).expect("write");

    let mut store = TemplateStore::new(dir.path());
    assert_eq!(store.preload(), 3);
    assert_eq!(store.count(), 3);
    assert!(store.get("exit", Some("extra")).is_some());
}

#[test]
fn test_store_preload_missing_directory() {
    let mut store = TemplateStore::new("/definitely/not/here");
    assert_eq!(store.preload(), 0);
}
