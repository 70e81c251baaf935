//! Crash point injection for testing durability
//!
//! Crash points are enabled via the `DOCSTORE_CRASH_POINT` environment
//! variable. When the named point is reached the process terminates via
//! `std::process::abort()`: no cleanup, no unwinding.
//!
//! ```bash
//! DOCSTORE_CRASH_POINT=persist_before_rename docstore create notes '{"title":"t"}'
//! ```

use std::sync::OnceLock;

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var("DOCSTORE_CRASH_POINT").ok())
        .as_deref()
}

/// Returns true if `DOCSTORE_CRASH_POINT` equals the given name.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process if the named crash point is enabled.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    /// Temp file fully written and synced, target untouched.
    pub const PERSIST_BEFORE_RENAME: &str = "persist_before_rename";
    /// Rename done, directory not yet synced.
    pub const PERSIST_AFTER_RENAME: &str = "persist_after_rename";

    pub fn all() -> &'static [&'static str] {
        &[PERSIST_BEFORE_RENAME, PERSIST_AFTER_RENAME]
    }
}
