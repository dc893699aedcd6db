//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide), so the
//! extractor can be driven by a scripted page in tests.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// HTTP status of the main document, when the browser reported one.
    pub status: Option<u16>,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// How the browser is launched.
#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    /// Explicit Chromium executable. Searched on `PATH` when unset.
    pub chromium_path: Option<PathBuf>,
    /// Show the browser window instead of running headless.
    pub headful: bool,
    /// Override the browser's user agent.
    pub user_agent: Option<String>,
    /// Extra command-line switches passed to Chromium.
    pub args: Vec<String>,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Evaluate a JavaScript expression in the page and return its value.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
