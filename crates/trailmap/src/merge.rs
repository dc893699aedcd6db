//! Join waypoint labels onto trail geometry and apply marker styling.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::markers::{marker_symbol, START_MARKER_COLOR};
use crate::types::{JoinKey, TrailGeometry, Waypoint};

/// Annotate `geometry` with the waypoints whose coordinates match its points.
///
/// A matching feature has its properties replaced by title, description and
/// marker symbol. Afterwards the first `Point` feature is colored as the
/// trail start, matched or not. Features are never added or removed.
///
/// When two waypoints share a join key the later one wins.
pub fn merge(mut geometry: TrailGeometry, waypoints: &[Waypoint]) -> TrailGeometry {
    let lookup: HashMap<JoinKey, &Waypoint> =
        waypoints.iter().map(|w| (w.join_key(), w)).collect();

    if lookup.len() < waypoints.len() {
        tracing::warn!(
            duplicates = waypoints.len() - lookup.len(),
            "waypoints share coordinates; keeping the last of each"
        );
    }

    let mut matched = 0usize;
    for feature in &mut geometry.features {
        let Some(key) = feature.join_key() else {
            continue;
        };
        if let Some(waypoint) = lookup.get(&key) {
            feature.set_properties(waypoint_properties(waypoint));
            matched += 1;
        }
    }

    tracing::info!(pictograms = ?pictogram_names(waypoints), "found pictograms");
    tracing::debug!(
        features = geometry.features.len(),
        waypoints = waypoints.len(),
        matched,
        "joined waypoints onto geometry"
    );

    mark_start(&mut geometry);
    geometry
}

/// Distinct category labels across `waypoints`, `None` standing for unlabeled.
pub fn pictogram_names(waypoints: &[Waypoint]) -> BTreeSet<Option<&str>> {
    waypoints
        .iter()
        .map(|w| w.pictogram_name.as_deref())
        .collect()
}

fn waypoint_properties(waypoint: &Waypoint) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("title".into(), Value::String(waypoint.name.clone()));
    props.insert("description".into(), Value::String(waypoint.description()));
    props.insert(
        "marker-symbol".into(),
        Value::String(marker_symbol(waypoint.pictogram_name.as_deref()).to_string()),
    );
    props
}

fn mark_start(geometry: &mut TrailGeometry) {
    match geometry.features.iter_mut().find(|f| f.is_point()) {
        Some(start) => {
            start
                .properties_mut()
                .insert("marker-color".into(), START_MARKER_COLOR.into());
        }
        None => tracing::warn!("trail has no point features; start marker not set"),
    }
}
