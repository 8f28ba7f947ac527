//! Gesture module - rule-based sign classification
//!
//! Finger states are derived in normalized space and matched against an
//! ordered pattern table. No learned model is involved.

mod classifier;
mod fingers;
mod rules;

pub use classifier::{classify, classify_normalized, compute_confidence, ClassificationResult};
pub use fingers::{Finger, FingerState, HandPose};
pub use rules::{match_rule, shadowed_rules, GestureRule, Sign, GESTURE_RULES, TOGETHER_EPSILON};
