//! Configuration loading and resolution.

use crate::maphub::DEFAULT_API_URL;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Token for the MapHub API.
pub const API_KEY_VAR: &str = "MAPHUB_KEY";

/// Override for the MapHub API root.
pub const API_URL_VAR: &str = "MAPHUB_API_URL";

/// Chromium executable used when `--chromium-path` is not given.
pub const CHROMIUM_PATH_VAR: &str = "TRAILMAP_CHROMIUM_PATH";

/// Settings taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub chromium_path: Option<PathBuf>,
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            api_key: read(API_KEY_VAR),
            api_url: read(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            chromium_path: read(CHROMIUM_PATH_VAR).map(PathBuf::from),
        }
    }

    /// The API token, or an error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!(
                "{API_KEY_VAR} is not set. Export your MapHub API key, e.g. `export {API_KEY_VAR}=...`"
            ),
        }
    }
}
