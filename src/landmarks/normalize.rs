use super::types::{LandmarkSet, NormalizedLandmarkSet, HAND_LANDMARK_COUNT, MIDDLE_MCP, WRIST};

/// Re-express landmarks relative to the wrist, scaled by the wrist to
/// middle-finger-base distance.
///
/// Sets with fewer than 21 points come back unchanged; callers must not
/// classify them. A zero wrist-to-base distance falls back to a scale of 1.
/// Geometry that yields a non-finite scale or coordinate comes back empty.
pub fn normalize(raw: &LandmarkSet) -> NormalizedLandmarkSet {
    let points = raw.points();
    if points.len() < HAND_LANDMARK_COUNT {
        return NormalizedLandmarkSet::from_points(points.to_vec());
    }

    let origin = points[WRIST];
    let mut scale = points[MIDDLE_MCP].distance(&origin);
    if !scale.is_finite() {
        return NormalizedLandmarkSet::default();
    }
    if scale == 0.0 {
        scale = 1.0;
    }

    let normalized = NormalizedLandmarkSet::from_points(
        points.iter().map(|p| (*p - origin) / scale).collect(),
    );
    if !normalized.is_finite() {
        return NormalizedLandmarkSet::default();
    }
    normalized
}
