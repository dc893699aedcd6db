// Copyright 2026 Trailmap Contributors
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use url::Url;

use trailmap_cli::cli::export_cmd::{self, Destination, ExportArgs};
use trailmap_cli::cli::{output, parse_trail_url};
use trailmap_cli::config::Config;
use trailmap_cli::extractor::{ExtractOptions, StatusPolicy};
use trailmap_cli::renderer::BrowserOptions;

#[derive(Parser)]
#[command(
    name = "trailmap",
    about = "Trailmap — export a Wikiloc trail and publish it as a styled MapHub map",
    version,
    after_help = "The MapHub API key is read from MAPHUB_KEY."
)]
struct Cli {
    /// Trail page URL (e.g. "https://www.wikiloc.com/hiking-trails/...")
    #[arg(value_parser = parse_trail_url)]
    url: Url,

    /// Exit successfully when the page answers with a 4xx/5xx status
    #[arg(long, conflicts_with = "fail")]
    skip: bool,

    /// Fail when the page answers with a 4xx/5xx status (default)
    #[arg(long)]
    fail: bool,

    /// Page load timeout in milliseconds
    #[arg(long, default_value = "30000")]
    timeout: u64,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headful: bool,

    /// User agent for the browser
    #[arg(long)]
    user_agent: Option<String>,

    /// Extra Chromium switch (repeatable)
    #[arg(long = "browser-arg", allow_hyphen_values = true)]
    browser_args: Vec<String>,

    /// Chromium executable (defaults to TRAILMAP_CHROMIUM_PATH, then PATH)
    #[arg(long)]
    chromium_path: Option<PathBuf>,

    /// Print the merged GeoJSON instead of publishing it
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var(output::JSON_VAR, "1");
    }
    if cli.quiet {
        std::env::set_var(output::QUIET_VAR, "1");
    }

    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    // Consistent exit codes: 0=success (including --skip), 1=error
    if let Err(e) = &result {
        if !output::is_quiet() && !output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}

/// Validate the configuration before any browser or network activity, then
/// run the export.
async fn run(cli: Cli) -> Result<()> {
    let policy = StatusPolicy::from_flags(cli.skip, cli.fail)?;
    let config = Config::from_env();

    let destination = if cli.dry_run {
        Destination::Stdout
    } else {
        Destination::MapHub {
            api_url: config.api_url.clone(),
            api_key: config.require_api_key()?.to_string(),
        }
    };

    let args = ExportArgs {
        url: cli.url.to_string(),
        extract: ExtractOptions {
            policy,
            timeout_ms: cli.timeout,
        },
        browser: BrowserOptions {
            chromium_path: cli.chromium_path.or(config.chromium_path),
            headful: cli.headful,
            user_agent: cli.user_agent,
            args: cli.browser_args,
        },
        destination,
    };

    export_cmd::run(&args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_skip_and_fail_conflict() {
        let parsed = Cli::try_parse_from(["trailmap", "--skip", "--fail", "https://example.com/t"]);
        assert!(parsed.is_err());

        let cli = Cli::try_parse_from(["trailmap", "--skip", "https://example.com/t"]).unwrap();
        assert_eq!(
            StatusPolicy::from_flags(cli.skip, cli.fail).unwrap(),
            StatusPolicy::Skip
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(Cli::try_parse_from(["trailmap", "ftp://example.com/t"]).is_err());
    }
}
