use std::env;
use std::process::Command;
use time::OffsetDateTime;

/// Year the binary was built, honouring reproducible-build timestamps.
fn build_year() -> i32 {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
        .year()
}

/// Tag pointing at HEAD, if any.
fn head_tag() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--exact-match"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rustc-env=APP_BUILD_YEAR={}", build_year());

    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    // Release builds skip git; debug builds are "-dev" unless HEAD is tagged v<version>
    let display = if env::var("PROFILE").as_deref() == Ok("release") {
        version.clone()
    } else {
        println!("cargo:rerun-if-changed=.git/HEAD");
        println!("cargo:rerun-if-changed=.git/refs/tags");
        match head_tag() {
            Some(tag) if tag == format!("v{version}") => version.clone(),
            _ => format!("{version}-dev"),
        }
    };

    println!("cargo:rustc-env=APP_VERSION_DISPLAY={display}");
}
