use serde::Serialize;

use super::fingers::HandPose;
use super::rules::{match_rule, Sign};
use crate::landmarks::{
    normalize, LandmarkSet, NormalizedLandmarkSet, HAND_LANDMARK_COUNT, INDEX_TIP, MIDDLE_TIP,
    PINKY_TIP, RING_TIP, WRIST,
};

const BASE_CONFIDENCE: f32 = 0.7;
const CLARITY_WEIGHT: f32 = 0.2;
const MAX_CONFIDENCE: f32 = 0.95;

/// Classifier output for one frame. `confidence` is 0.0 exactly when `sign`
/// is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub sign: Option<Sign>,
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn none() -> Self {
        Self {
            sign: None,
            confidence: 0.0,
        }
    }
}

/// Classify a raw landmark set. Normalizes internally.
pub fn classify(landmarks: &LandmarkSet) -> ClassificationResult {
    if landmarks.len() < HAND_LANDMARK_COUNT {
        return ClassificationResult::none();
    }
    classify_normalized(&normalize(landmarks))
}

/// Classify landmarks already passed through [`normalize`].
///
/// Short sets and sets with any non-finite coordinate classify as nothing.
pub fn classify_normalized(landmarks: &NormalizedLandmarkSet) -> ClassificationResult {
    if landmarks.len() < HAND_LANDMARK_COUNT || !landmarks.is_finite() {
        return ClassificationResult::none();
    }

    let variance = tip_distance_variance(landmarks);
    if !variance.is_finite() {
        return ClassificationResult::none();
    }

    let pose = HandPose::from_landmarks(landmarks);
    match match_rule(&pose, landmarks) {
        Some(rule) => ClassificationResult {
            sign: Some(rule.sign),
            confidence: confidence_from_variance(variance),
        },
        None => ClassificationResult::none(),
    }
}

/// Higher when the four fingertips sit at similar distances from the wrist.
///
/// In `[0.7, 0.95]` for finite geometry.
pub fn compute_confidence(landmarks: &NormalizedLandmarkSet) -> f32 {
    confidence_from_variance(tip_distance_variance(landmarks))
}

fn confidence_from_variance(variance: f32) -> f32 {
    let confidence = BASE_CONFIDENCE + CLARITY_WEIGHT * (1.0 - variance.min(1.0));
    confidence.min(MAX_CONFIDENCE)
}

/// Population variance of the non-thumb fingertip distances from the wrist.
fn tip_distance_variance(landmarks: &NormalizedLandmarkSet) -> f32 {
    let wrist = landmarks.point(WRIST);
    let distances = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP]
        .map(|idx| landmarks.point(idx).distance(&wrist));

    let n = distances.len() as f32;
    let mean = distances.iter().sum::<f32>() / n;
    distances.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / n
}
