//! Core data types: trail geometry, waypoints, and the join key between them.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// A GeoJSON feature collection, as exported from the page's map layers.
///
/// Only the members the merge step touches are typed. Everything else is kept
/// in `extra` so the collection serializes back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailGeometry {
    #[serde(rename = "type", default = "feature_collection_kind")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single GeoJSON feature.
///
/// `geometry` and `properties` tell an absent member (`None`) from an explicit
/// `null` (`Some(None)`), so both serialize back exactly as they came in.
/// Layer groups export themselves as nested feature collections; those come
/// through as a `Feature` with neither member and their contents in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub geometry: Option<Option<Geometry>>,
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Option<Map<String, Value>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A member that is present, possibly as `null`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A GeoJSON geometry object. `coordinates` is left untyped because its
/// nesting depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub coordinates: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn feature_collection_kind() -> String {
    "FeatureCollection".to_string()
}

fn feature_kind() -> String {
    "Feature".to_string()
}

impl TrailGeometry {
    /// Validate and decode the page's exported feature collection.
    pub fn from_value(value: Value) -> TrailResult<Self> {
        match value.get("features") {
            Some(Value::Array(_)) => {}
            Some(other) => {
                return Err(TrailError::InvalidGeometry(format!(
                    "`features` must be an array, got {}",
                    json_kind(other)
                )))
            }
            None => {
                return Err(TrailError::InvalidGeometry(format!(
                    "expected a feature collection object, got {}",
                    json_kind(&value)
                )))
            }
        }

        serde_json::from_value(value).map_err(|e| TrailError::InvalidGeometry(e.to_string()))
    }

    /// Number of features whose geometry is a `Point`.
    pub fn point_count(&self) -> usize {
        self.features.iter().filter(|f| f.is_point()).count()
    }
}

impl Feature {
    /// The geometry, if present and not `null`.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()?.as_ref()
    }

    /// The properties, if present and not `null`.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.properties.as_ref()?.as_ref()
    }

    /// The properties object, created empty when absent or `null`.
    pub fn properties_mut(&mut self) -> &mut Map<String, Value> {
        self.properties.get_or_insert(None).get_or_insert_with(Map::new)
    }

    /// Replace the properties object.
    pub fn set_properties(&mut self, properties: Map<String, Value>) {
        self.properties = Some(Some(properties));
    }

    /// Whether this feature's geometry is a single `Point`.
    pub fn is_point(&self) -> bool {
        self.geometry().is_some_and(|g| g.kind == "Point")
    }

    /// The join key of this feature's leading coordinate pair.
    ///
    /// Only positions whose first two members are plain numbers produce a key,
    /// so lines and polygons never match a waypoint.
    pub fn join_key(&self) -> Option<JoinKey> {
        let coords = self.geometry()?.coordinates.as_array()?;
        match (coords.first()?, coords.get(1)?) {
            (Value::Number(lon), Value::Number(lat)) => Some(JoinKey::new(lon, lat)),
            _ => None,
        }
    }
}

/// A manually authored point of interest on the trail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub name: String,
    pub lon: Number,
    pub lat: Number,
    /// Meters. Kept as a JSON number so `850` and `850.0` render as written.
    pub elevation: Number,
    #[serde(default)]
    pub pictogram_name: Option<String>,
}

impl Waypoint {
    pub fn join_key(&self) -> JoinKey {
        JoinKey::new(&self.lon, &self.lat)
    }

    /// Popup text shown under the marker title.
    pub fn description(&self) -> String {
        format!("Elevation: {}m", self.elevation)
    }
}

/// Decode the page's waypoint list.
///
/// The payload itself must be an array. Entries that do not look like a
/// waypoint are skipped with a warning; that includes entries whose `name`
/// is `null`, which therefore never label a point.
pub fn parse_waypoints(value: Value) -> TrailResult<Vec<Waypoint>> {
    let entries = match value {
        Value::Array(entries) => entries,
        other => {
            return Err(TrailError::InvalidWaypoints(format!(
                "expected an array, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut waypoints = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Waypoint>(entry) {
            Ok(w) => waypoints.push(w),
            Err(e) => tracing::warn!(index, error = %e, "skipping malformed waypoint"),
        }
    }
    Ok(waypoints)
}

/// Exact-match key built from a coordinate pair, rendered `"{lon}-{lat}"`.
///
/// Two positions are the same only when their textual forms are identical;
/// there is no spatial tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey(String);

impl JoinKey {
    pub fn new(lon: &Number, lat: &Number) -> Self {
        Self(format!("{lon}-{lat}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object without `features`",
    }
}

/// Errors that can occur while decoding page data.
#[derive(thiserror::Error, Debug)]
pub enum TrailError {
    #[error("Invalid trail geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid waypoint list: {0}")]
    InvalidWaypoints(String),
}

/// Convenience result type.
pub type TrailResult<T> = Result<T, TrailError>;
