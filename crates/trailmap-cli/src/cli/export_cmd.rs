//! `trailmap <url>` — export a trail page and publish it to MapHub.

use crate::cli::output;
use crate::extractor::{extract_trail, ExtractOptions, Extraction};
use crate::maphub::{MapHubClient, MapSettings, PublishReport};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{BrowserOptions, Renderer};
use anyhow::{Context, Result};
use trailmap::{merge, TrailGeometry};

/// Where the merged trail goes.
#[derive(Clone)]
pub enum Destination {
    /// Publish with the given API root and token.
    MapHub { api_url: String, api_key: String },
    /// Print the merged GeoJSON on stdout.
    Stdout,
}

/// Everything one export run needs.
#[derive(Clone)]
pub struct ExportArgs {
    pub url: String,
    pub extract: ExtractOptions,
    pub browser: BrowserOptions,
    pub destination: Destination,
}

/// How an export run ended.
#[derive(Debug)]
pub enum ExportOutcome {
    /// The page answered 4xx/5xx and the skip policy was in effect.
    Skipped { status: u16, url: String },
    /// Dry run: the merged trail, not published.
    Merged(TrailGeometry),
    /// The map was created; see the report for the follow-up steps.
    Published(PublishReport),
}

/// Run the export pipeline against a freshly launched Chromium and print the
/// result.
pub async fn run(args: &ExportArgs) -> Result<()> {
    output::status(&format!("Getting trail data from {}", args.url));

    let renderer = ChromiumRenderer::launch(&args.browser).await?;
    match export(&renderer, args).await? {
        ExportOutcome::Skipped { status, url } => {
            if !output::is_quiet() {
                eprintln!("{status} error for {url}, skipping");
            }
        }
        ExportOutcome::Merged(geometry) => {
            let value = serde_json::to_value(&geometry).context("failed to encode GeoJSON")?;
            output::print_json(&value);
        }
        ExportOutcome::Published(report) => print_report(&report),
    }
    Ok(())
}

/// Fetch, join, style, publish.
///
/// The renderer is shut down once the page has been read, before anything
/// is published, whether or not extraction succeeded.
pub async fn export(renderer: &dyn Renderer, args: &ExportArgs) -> Result<ExportOutcome> {
    let extraction = extract_trail(renderer, &args.url, &args.extract).await;
    if let Err(e) = renderer.shutdown().await {
        tracing::warn!(error = %e, "browser did not shut down cleanly");
    }

    let page = match extraction? {
        Extraction::Page(page) => page,
        Extraction::Skipped { status, url } => return Ok(ExportOutcome::Skipped { status, url }),
    };

    let geometry = merge(page.geometry, &page.waypoints);

    match &args.destination {
        Destination::Stdout => Ok(ExportOutcome::Merged(geometry)),
        Destination::MapHub { api_url, api_key } => {
            output::status("Creating MapHub map");
            let client = MapHubClient::new(api_url.as_str(), api_key.as_str());
            let report = client
                .publish(&page.title, &page.uri, &geometry, &MapSettings::default())
                .await
                .context("failed to create MapHub map")?;
            Ok(ExportOutcome::Published(report))
        }
    }
}

fn print_report(report: &PublishReport) {
    let url = report.url.as_deref().unwrap_or("");

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "id": report.id,
            "title": report.title,
            "url": report.url,
            "update_error": report.update_error.as_ref().map(|e| e.to_string()),
            "refresh_error": report.refresh_error.as_ref().map(|e| e.to_string()),
        }));
        return;
    }

    if let Some(e) = &report.update_error {
        eprintln!("  Warning: {e}");
    }
    if let Some(e) = &report.refresh_error {
        eprintln!("  Warning: {e}");
    }
    println!(
        "Map created! ID: '{}', TITLE: '{}', URL: '{url}'",
        report.id, report.title
    );
}
