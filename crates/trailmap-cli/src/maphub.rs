//! MapHub API client: create a map, set its GeoJSON content, refresh its
//! preview image.
//!
//! Every call is a single POST authorized with `Authorization: Token <key>`.
//! Nothing is retried.

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Write as _};
use std::time::Duration;
use trailmap::TrailGeometry;

/// Public MapHub API root.
pub const DEFAULT_API_URL: &str = "https://maphub.net/api/1";

/// Header that carries the arguments of an upload call.
pub const API_ARG_HEADER: &str = "MapHub-API-Arg";

const CREATE_ENDPOINT: &str = "map/upload";
const UPDATE_ENDPOINT: &str = "map/update";
const REFRESH_ENDPOINT: &str = "map/refresh_image";

/// Identifier MapHub assigns to a map. Returned as either a number or a
/// string depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapId {
    Number(u64),
    Text(String),
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Presentation settings sent with the map content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSettings {
    pub basemap: String,
    pub description: String,
    pub visibility: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            basemap: "maphub-earth".to_string(),
            description: "Trail exported from Wikiloc".to_string(),
            visibility: "public".to_string(),
        }
    }
}

/// A freshly created, still empty map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMap {
    pub id: MapId,
    /// Public page of the map.
    pub url: Option<String>,
}

/// Outcome of [`MapHubClient::publish`].
///
/// The map exists once create succeeded; content and preview failures are
/// carried here instead of aborting.
#[derive(Debug)]
pub struct PublishReport {
    pub id: MapId,
    pub title: String,
    pub url: Option<String>,
    pub update_error: Option<MapHubError>,
    pub refresh_error: Option<MapHubError>,
}

impl PublishReport {
    /// Whether every step succeeded.
    pub fn is_complete(&self) -> bool {
        self.update_error.is_none() && self.refresh_error.is_none()
    }
}

/// Errors from a MapHub call.
#[derive(thiserror::Error, Debug)]
pub enum MapHubError {
    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned an unreadable response (HTTP {status}): {detail}")]
    Decode {
        endpoint: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{endpoint} failed: {message}")]
    Service {
        endpoint: &'static str,
        message: String,
    },

    #[error("failed to encode request arguments: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct CreateArgs<'a> {
    file_type: &'a str,
    title: &'a str,
    short_name: &'a str,
    visibility: &'a str,
}

#[derive(Serialize)]
struct UpdateArgs<'a> {
    map_id: &'a MapId,
    geojson: &'a TrailGeometry,
    basemap: &'a str,
    description: &'a str,
    visibility: &'a str,
}

#[derive(Serialize)]
struct RefreshArgs<'a> {
    map_id: &'a MapId,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: Option<MapId>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// HTTP client for the MapHub API.
#[derive(Clone)]
pub struct MapHubClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl MapHubClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trailmap/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Run the three publishing steps for one trail.
    ///
    /// Fails only when the map cannot be created; update and refresh errors
    /// are logged and returned in the report.
    pub async fn publish(
        &self,
        title: &str,
        uri: &str,
        geometry: &TrailGeometry,
        settings: &MapSettings,
    ) -> Result<PublishReport, MapHubError> {
        let created = self.create_map(title, uri, &settings.visibility).await?;

        let update_error = self.update_map(&created.id, geometry, settings).await.err();
        if let Some(e) = &update_error {
            tracing::warn!(map_id = %created.id, error = %e, "map content was not updated");
        }

        let refresh_error = self.refresh_image(&created.id).await.err();
        if let Some(e) = &refresh_error {
            tracing::warn!(map_id = %created.id, error = %e, "map preview was not refreshed");
        }

        Ok(PublishReport {
            id: created.id,
            title: title.to_string(),
            url: created.url,
            update_error,
            refresh_error,
        })
    }

    /// Register a new empty map.
    pub async fn create_map(
        &self,
        title: &str,
        short_name: &str,
        visibility: &str,
    ) -> Result<CreatedMap, MapHubError> {
        tracing::info!(%title, %short_name, "creating MapHub map");
        let args = CreateArgs {
            file_type: "empty",
            title,
            short_name,
            visibility,
        };
        let header = ascii_json(&serde_json::to_string(&args)?);

        let request = self
            .client
            .post(self.endpoint(CREATE_ENDPOINT))
            .header(API_ARG_HEADER, header);
        let response = self.send(CREATE_ENDPOINT, request).await?;
        let id = require_id(CREATE_ENDPOINT, response.id, response.error)?;

        tracing::info!(map_id = %id, "map created");
        Ok(CreatedMap {
            id,
            url: response.url,
        })
    }

    /// Replace the map's content with `geometry`.
    pub async fn update_map(
        &self,
        id: &MapId,
        geometry: &TrailGeometry,
        settings: &MapSettings,
    ) -> Result<MapId, MapHubError> {
        let args = UpdateArgs {
            map_id: id,
            geojson: geometry,
            basemap: &settings.basemap,
            description: &settings.description,
            visibility: &settings.visibility,
        };
        let request = self.client.post(self.endpoint(UPDATE_ENDPOINT)).json(&args);
        let response = self.send(UPDATE_ENDPOINT, request).await?;
        let id = require_id(UPDATE_ENDPOINT, response.id, response.error)?;

        tracing::info!(map_id = %id, "map updated");
        Ok(id)
    }

    /// Ask MapHub to regenerate the map's preview image.
    pub async fn refresh_image(&self, id: &MapId) -> Result<MapId, MapHubError> {
        tracing::info!(map_id = %id, "refreshing map image");
        let request = self
            .client
            .post(self.endpoint(REFRESH_ENDPOINT))
            .json(&RefreshArgs { map_id: id });
        let response = self.send(REFRESH_ENDPOINT, request).await?;
        require_id(REFRESH_ENDPOINT, response.id, response.error)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<ApiResponse, MapHubError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token))
            .send()
            .await
            .map_err(|source| MapHubError::Transport { endpoint, source })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| MapHubError::Transport { endpoint, source })?;
        tracing::debug!(endpoint, status, bytes = body.len(), "MapHub response");

        serde_json::from_str(&body).map_err(|e| MapHubError::Decode {
            endpoint,
            status,
            detail: e.to_string(),
        })
    }
}

fn require_id(
    endpoint: &'static str,
    id: Option<MapId>,
    error: Option<Value>,
) -> Result<MapId, MapHubError> {
    if let Some(id) = id {
        return Ok(id);
    }
    let message = match error {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => "response has no map id".to_string(),
    };
    Err(MapHubError::Service { endpoint, message })
}

/// Escape every non-ASCII character of a JSON document as `\uXXXX`, so it
/// can travel in an HTTP header.
fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
            let _ = write!(out, "\\u{unit:04x}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ascii_json_escapes_non_ascii() {
        let encoded = ascii_json(r#"{"title":"Camí de Ronda 🥾"}"#);
        assert!(encoded.is_ascii());
        assert_eq!(encoded, r#"{"title":"Cam\u00ed de Ronda \ud83e\udd7e"}"#);

        let decoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded["title"], "Camí de Ronda 🥾");
    }

    #[test]
    fn test_map_id_accepts_numbers_and_strings() {
        let id: MapId = serde_json::from_value(json!(1234)).unwrap();
        assert_eq!(id, MapId::Number(1234));
        assert_eq!(id.to_string(), "1234");

        let id: MapId = serde_json::from_value(json!("abc12")).unwrap();
        assert_eq!(id.to_string(), "abc12");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("abc12"));
    }

    #[test]
    fn test_require_id_prefers_service_error() {
        let err = require_id(UPDATE_ENDPOINT, None, Some(json!("Map not found"))).unwrap_err();
        assert_eq!(err.to_string(), "map/update failed: Map not found");

        let err = require_id(CREATE_ENDPOINT, None, None).unwrap_err();
        assert_eq!(err.to_string(), "map/upload failed: response has no map id");

        let err = require_id(REFRESH_ENDPOINT, None, Some(json!({"code": 3}))).unwrap_err();
        assert!(err.to_string().contains(r#"{"code":3}"#));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = MapHubClient::new("https://maphub.net/api/1/", "key");
        assert_eq!(
            client.endpoint(UPDATE_ENDPOINT),
            "https://maphub.net/api/1/map/update"
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = MapSettings::default();
        assert_eq!(settings.basemap, "maphub-earth");
        assert_eq!(settings.visibility, "public");
    }
}
