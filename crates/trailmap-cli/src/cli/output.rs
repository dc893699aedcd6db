//! Output mode flags shared by every command.
//!
//! `main` records the global flags in the environment so any module can
//! check them without threading them through.

pub const JSON_VAR: &str = "TRAILMAP_JSON";
pub const QUIET_VAR: &str = "TRAILMAP_QUIET";

/// `--json`: print machine-readable results on stdout.
pub fn is_json() -> bool {
    std::env::var_os(JSON_VAR).is_some()
}

/// `--quiet`: suppress non-essential output.
pub fn is_quiet() -> bool {
    std::env::var_os(QUIET_VAR).is_some()
}

pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => tracing::error!(error = %e, "failed to encode JSON output"),
    }
}

/// Print a progress line on stderr unless quiet or in JSON mode.
pub fn status(message: &str) {
    if !is_quiet() && !is_json() {
        eprintln!("  {message}");
    }
}
