//! Waypoint category to map marker icon.

/// Icon used for any category without an explicit entry.
pub const DEFAULT_MARKER: &str = "location-pin";

/// Marker color applied to the first point of the trail.
pub const START_MARKER_COLOR: &str = "#3cc954";

/// Map a waypoint pictogram name to a marker symbol.
///
/// Total over its input: unknown and missing categories both yield
/// [`DEFAULT_MARKER`].
pub fn marker_symbol(category: Option<&str>) -> &'static str {
    match category {
        Some("Intersection") => "crossing",
        Some("Cave") => "summit",
        Some("River") | Some("Waterfall") => "dam",
        Some("Tree") => "forest",
        Some("Museum") | Some("Castle") => "museum",
        _ => DEFAULT_MARKER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_categories() {
        assert_eq!(marker_symbol(Some("Intersection")), "crossing");
        assert_eq!(marker_symbol(Some("Cave")), "summit");
        assert_eq!(marker_symbol(Some("River")), "dam");
        assert_eq!(marker_symbol(Some("Waterfall")), "dam");
        assert_eq!(marker_symbol(Some("Tree")), "forest");
        assert_eq!(marker_symbol(Some("Museum")), "museum");
        assert_eq!(marker_symbol(Some("Castle")), "museum");
    }

    #[test]
    fn test_fallback_is_default_marker() {
        assert_eq!(marker_symbol(None), DEFAULT_MARKER);
        assert_eq!(marker_symbol(Some("Summit")), DEFAULT_MARKER);
        assert_eq!(marker_symbol(Some("")), DEFAULT_MARKER);
        // Case-sensitive, like the page's own labels.
        assert_eq!(marker_symbol(Some("cave")), DEFAULT_MARKER);
    }
}
