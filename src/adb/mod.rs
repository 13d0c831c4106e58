// ADB module - Android Debug Bridge transport
// This module provides abstractions for talking to an Android device or emulator,
// either through the adb executable or the pure Rust adb_client crate.

pub mod backend;
pub mod error;
pub mod rust_impl;
pub mod shell;
pub mod types;


// Re-export the main types and functions for easy access
pub use backend::{AdbBackend, BackendKind};
pub use error::{AdbError, AdbResult};
pub use types::{AdbClient, Device, ImageCapture, keycode};
