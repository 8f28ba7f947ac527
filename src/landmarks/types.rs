use serde::{Deserialize, Serialize};
use std::ops::{Div, Sub};

// ============================================================================
// HAND LANDMARK INDICES (21 points per hand)
// ============================================================================

pub const WRIST: usize = 0;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

pub const HAND_LANDMARK_COUNT: usize = 21;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A single 3D landmark point.
///
/// `x` and `y` are frame-relative (0-1, y grows downward), `z` is relative
/// depth. On the wire a landmark is a `[x, y, z]` array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const ORIGIN: Landmark = Landmark {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length of the point as a vector.
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        (*self - *other).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(lm: Landmark) -> Self {
        [lm.x, lm.y, lm.z]
    }
}

impl Sub for Landmark {
    type Output = Landmark;

    fn sub(self, rhs: Landmark) -> Landmark {
        Landmark::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Div<f32> for Landmark {
    type Output = Landmark;

    fn div(self, rhs: f32) -> Landmark {
        Landmark::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// Landmarks for one hand, in provider order.
///
/// Nothing stops a provider from sending a short or long list, so the length
/// is checked by whoever consumes the set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet(Vec<Landmark>);

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Landmark] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exactly one point per hand landmark.
    pub fn is_complete(&self) -> bool {
        self.0.len() == HAND_LANDMARK_COUNT
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self(points)
    }
}

impl From<Vec<[f32; 3]>> for LandmarkSet {
    fn from(points: Vec<[f32; 3]>) -> Self {
        Self(points.into_iter().map(Landmark::from).collect())
    }
}

/// Wrist-relative, scale-free landmarks produced by [`super::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedLandmarkSet(Vec<Landmark>);

impl NormalizedLandmarkSet {
    pub(crate) fn from_points(points: Vec<Landmark>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Landmark] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// No NaN or infinite coordinate anywhere in the set.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Landmark::is_finite)
    }

    /// Point at a landmark index, or the origin when the set is short.
    pub fn point(&self, index: usize) -> Landmark {
        self.0.get(index).copied().unwrap_or(Landmark::ORIGIN)
    }
}

/// One frame's output from the hand-landmark provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandObservation {
    #[serde(default)]
    pub hand_detected: bool,
    #[serde(default)]
    pub landmarks: Option<LandmarkSet>,
    /// "Left" or "Right"
    #[serde(default)]
    pub handedness: Option<String>,
    #[serde(default)]
    pub detection_confidence: f32,
}

impl HandObservation {
    /// The landmark set, if the provider saw a hand and sent a full set.
    pub fn complete_landmarks(&self) -> Option<&LandmarkSet> {
        if !self.hand_detected {
            return None;
        }
        self.landmarks.as_ref().filter(|set| set.is_complete())
    }
}
