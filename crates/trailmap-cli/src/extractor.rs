//! Trail page extraction: geometry, waypoints, title and path from a
//! rendered Wikiloc trail page.

use crate::renderer::{RenderContext, Renderer};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use trailmap::{parse_waypoints, TrailGeometry, Waypoint};

/// Serializes every map layer that can export itself into one collection.
pub const GEOMETRY_SCRIPT: &str = r#"(function () {
    var collection = { type: 'FeatureCollection', features: [] };
    trailMap.eachLayer(function (layer) {
        if (typeof layer.toGeoJSON === 'function') {
            collection.features.push(layer.toGeoJSON());
        }
    });
    return collection;
})()"#;

/// Manually labeled points of interest.
pub const WAYPOINTS_SCRIPT: &str = "mapData.waypoints";

pub const TITLE_SCRIPT: &str = "document.title";

pub const PATH_SCRIPT: &str = "window.location.pathname";

/// What to do when the trail page answers with a 4xx/5xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Abort the run with an error.
    #[default]
    Fail,
    /// End the run early without an error.
    Skip,
}

impl StatusPolicy {
    /// Resolve the `--skip` / `--fail` flags. Both at once is rejected.
    pub fn from_flags(skip: bool, fail: bool) -> Result<Self> {
        if skip && fail {
            bail!("--skip and --fail cannot be used together");
        }
        Ok(if skip { Self::Skip } else { Self::Fail })
    }
}

/// Per-run extraction settings.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub policy: StatusPolicy,
    pub timeout_ms: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            policy: StatusPolicy::Fail,
            timeout_ms: 30_000,
        }
    }
}

/// Everything read from a trail page.
#[derive(Debug, Clone)]
pub struct TrailPage {
    pub geometry: TrailGeometry,
    pub waypoints: Vec<Waypoint>,
    /// Display title with the site prefix removed.
    pub title: String,
    /// Path of the page, used as the map's short name.
    pub uri: String,
}

/// Outcome of an extraction.
#[derive(Debug, Clone)]
pub enum Extraction {
    Page(TrailPage),
    /// The page answered with an error status and the policy was `Skip`.
    Skipped { status: u16, url: String },
}

/// Whether `status` is in the 4xx or 5xx class.
pub fn is_error_status(status: u16) -> bool {
    (400..600).contains(&status)
}

/// Strip the leading "site name |" prefix from a page title.
pub fn trail_title(page_title: &str) -> String {
    match page_title.split_once('|') {
        Some((_, rest)) => rest.trim().to_string(),
        None => page_title.trim().to_string(),
    }
}

/// Open one context on `renderer`, extract the trail, and close the context
/// whatever the outcome.
pub async fn extract_trail(
    renderer: &dyn Renderer,
    url: &str,
    options: &ExtractOptions,
) -> Result<Extraction> {
    let mut ctx = renderer.new_context().await?;
    let result = extract(ctx.as_mut(), url, options).await;
    if let Err(e) = ctx.close().await {
        tracing::debug!(error = %e, "failed to close page");
    }
    result
}

/// Load `url` in `ctx` and read the trail data from the page.
pub async fn extract(
    ctx: &mut dyn RenderContext,
    url: &str,
    options: &ExtractOptions,
) -> Result<Extraction> {
    tracing::info!(%url, "loading trail page");
    let nav = ctx
        .navigate(url, options.timeout_ms)
        .await
        .with_context(|| format!("failed to load {url}"))?;
    tracing::debug!(
        final_url = %nav.final_url,
        status = ?nav.status,
        load_time_ms = nav.load_time_ms,
        "page loaded"
    );

    match nav.status {
        Some(status) if is_error_status(status) => match options.policy {
            StatusPolicy::Skip => {
                tracing::warn!(status, url = %nav.final_url, "error status, skipping");
                return Ok(Extraction::Skipped {
                    status,
                    url: nav.final_url,
                });
            }
            StatusPolicy::Fail => bail!("{status} error for {}", nav.final_url),
        },
        Some(_) => {}
        None => tracing::warn!(url = %nav.final_url, "browser reported no response status"),
    }

    let geometry = TrailGeometry::from_value(evaluate(ctx, GEOMETRY_SCRIPT, "trail geometry").await?)?;
    let waypoints = parse_waypoints(evaluate(ctx, WAYPOINTS_SCRIPT, WAYPOINTS_SCRIPT).await?)?;
    let title = trail_title(&evaluate_string(ctx, TITLE_SCRIPT).await?);
    let uri = evaluate_string(ctx, PATH_SCRIPT).await?;

    tracing::info!(
        %title,
        %uri,
        features = geometry.features.len(),
        points = geometry.point_count(),
        waypoints = waypoints.len(),
        "extracted trail"
    );

    Ok(Extraction::Page(TrailPage {
        geometry,
        waypoints,
        title,
        uri,
    }))
}

async fn evaluate(ctx: &dyn RenderContext, script: &str, label: &str) -> Result<Value> {
    ctx.execute_js(script)
        .await
        .with_context(|| format!("failed to read {label} from the page"))
}

async fn evaluate_string(ctx: &dyn RenderContext, script: &str) -> Result<String> {
    match evaluate(ctx, script, script).await? {
        Value::String(s) => Ok(s),
        other => bail!("expected `{script}` to be a string, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::NavigationResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// A page that answers scripts from a fixed table.
    struct ScriptedPage {
        status: Option<u16>,
        scripts: HashMap<&'static str, Result<Value, String>>,
        evaluated: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicUsize>,
    }

    impl ScriptedPage {
        fn trail(status: u16) -> Self {
            let mut scripts = HashMap::new();
            scripts.insert(
                GEOMETRY_SCRIPT,
                Ok(json!({
                    "type": "FeatureCollection",
                    "features": [
                        {"type": "Feature", "properties": {},
                         "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}
                    ]
                })),
            );
            scripts.insert(
                WAYPOINTS_SCRIPT,
                Ok(json!([
                    {"lon": 1.0, "lat": 2.0, "name": "Peak", "elevation": 850, "pictogramName": "Cave"}
                ])),
            );
            scripts.insert(TITLE_SCRIPT, Ok(json!("Wikiloc | Puig de la Creu loop")));
            scripts.insert(PATH_SCRIPT, Ok(json!("/hiking-trails/puig-de-la-creu-123")));
            Self {
                status: Some(status),
                scripts,
                evaluated: Arc::default(),
                closed: Arc::default(),
            }
        }

        fn evaluated(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.evaluated)
        }
    }

    #[async_trait]
    impl RenderContext for ScriptedPage {
        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
            Ok(NavigationResult {
                final_url: url.to_string(),
                status: self.status,
                load_time_ms: 5,
            })
        }

        async fn execute_js(&self, script: &str) -> Result<Value> {
            self.evaluated.lock().unwrap().push(script.to_string());
            match self.scripts.get(script) {
                Some(Ok(v)) => Ok(v.clone()),
                Some(Err(message)) => bail!("{message}"),
                None => bail!("ReferenceError: unknown script"),
            }
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Hands out a single prepared page.
    struct OnePageRenderer {
        page: Mutex<Option<ScriptedPage>>,
    }

    #[async_trait]
    impl Renderer for OnePageRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            match self.page.lock().unwrap().take() {
                Some(page) => Ok(Box::new(page)),
                None => bail!("page already used"),
            }
        }

        async fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    const URL: &str = "https://www.wikiloc.com/hiking-trails/puig-de-la-creu-123";

    #[tokio::test]
    async fn test_extract_reads_all_four_values() {
        let mut page = ScriptedPage::trail(200);
        let result = extract(&mut page, URL, &ExtractOptions::default())
            .await
            .unwrap();

        let Extraction::Page(trail) = result else {
            panic!("expected a page");
        };
        assert_eq!(trail.title, "Puig de la Creu loop");
        assert_eq!(trail.uri, "/hiking-trails/puig-de-la-creu-123");
        assert_eq!(trail.geometry.features.len(), 1);
        assert_eq!(trail.waypoints[0].name, "Peak");
    }

    #[tokio::test]
    async fn test_skip_policy_stops_on_not_found() {
        let mut page = ScriptedPage::trail(404);
        let evaluated = page.evaluated();
        let options = ExtractOptions {
            policy: StatusPolicy::Skip,
            ..Default::default()
        };

        let result = extract(&mut page, URL, &options).await.unwrap();
        assert!(matches!(result, Extraction::Skipped { status: 404, .. }));
        assert!(evaluated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_policy_reports_status_and_url() {
        let mut page = ScriptedPage::trail(500);
        let evaluated = page.evaluated();

        let err = extract(&mut page, URL, &ExtractOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("500 error for {URL}"));
        assert!(evaluated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_status_is_not_an_error() {
        let mut page = ScriptedPage::trail(304);
        let result = extract(&mut page, URL, &ExtractOptions::default()).await;
        assert!(matches!(result, Ok(Extraction::Page(_))));
    }

    #[tokio::test]
    async fn test_missing_status_continues() {
        let mut page = ScriptedPage::trail(200);
        page.status = None;
        let result = extract(&mut page, URL, &ExtractOptions::default()).await;
        assert!(matches!(result, Ok(Extraction::Page(_))));
    }

    #[tokio::test]
    async fn test_script_error_is_surfaced() {
        let mut page = ScriptedPage::trail(200);
        page.scripts.insert(
            WAYPOINTS_SCRIPT,
            Err("ReferenceError: mapData is not defined".to_string()),
        );

        let err = extract(&mut page, URL, &ExtractOptions::default())
            .await
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("mapData.waypoints"));
        assert!(message.contains("ReferenceError: mapData is not defined"));
    }

    #[tokio::test]
    async fn test_unexpected_geometry_shape_is_rejected() {
        let mut page = ScriptedPage::trail(200);
        page.scripts.insert(GEOMETRY_SCRIPT, Ok(Value::Null));

        let err = extract(&mut page, URL, &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid trail geometry"));
    }

    #[tokio::test]
    async fn test_non_string_title_is_rejected() {
        let mut page = ScriptedPage::trail(200);
        page.scripts.insert(TITLE_SCRIPT, Ok(json!(42)));

        let err = extract(&mut page, URL, &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("document.title"));
    }

    #[tokio::test]
    async fn test_extract_trail_closes_page_on_error() {
        let page = ScriptedPage::trail(500);
        let closed = Arc::clone(&page.closed);
        let renderer = OnePageRenderer {
            page: Mutex::new(Some(page)),
        };

        let result = extract_trail(&renderer, URL, &ExtractOptions::default()).await;
        assert!(result.is_err());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_policy_from_flags() {
        assert_eq!(StatusPolicy::from_flags(false, false).unwrap(), StatusPolicy::Fail);
        assert_eq!(StatusPolicy::from_flags(false, true).unwrap(), StatusPolicy::Fail);
        assert_eq!(StatusPolicy::from_flags(true, false).unwrap(), StatusPolicy::Skip);
        let err = StatusPolicy::from_flags(true, true).unwrap_err();
        assert!(err.to_string().contains("cannot be used together"));
    }

    #[test]
    fn test_error_status_classes() {
        assert!(!is_error_status(200));
        assert!(!is_error_status(399));
        assert!(is_error_status(400));
        assert!(is_error_status(404));
        assert!(is_error_status(599));
        assert!(!is_error_status(600));
    }

    #[test]
    fn test_trail_title_strips_site_prefix() {
        assert_eq!(trail_title("Wikiloc | Camí de Ronda"), "Camí de Ronda");
        assert_eq!(trail_title("Wikiloc | A | B"), "A | B");
        assert_eq!(trail_title("  Untitled trail "), "Untitled trail");
    }
}
