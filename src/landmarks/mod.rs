//! Hand landmark types and wrist-relative normalization.
//!
//! Re-exports only. Logic lives in the submodules.

mod normalize;
mod types;

pub use normalize::normalize;
pub use types::{
    HandObservation, Landmark, LandmarkSet, NormalizedLandmarkSet, HAND_LANDMARK_COUNT,
};
pub use types::{
    INDEX_MCP, INDEX_PIP, INDEX_TIP, MIDDLE_MCP, MIDDLE_PIP, MIDDLE_TIP, PINKY_MCP, PINKY_PIP,
    PINKY_TIP, RING_MCP, RING_PIP, RING_TIP, THUMB_IP, THUMB_MCP, THUMB_TIP, WRIST,
};
