//! Ordered finger-pattern table mapping hand poses to signs.
//!
//! Rules are evaluated top to bottom and the first match wins. Some rules share
//! a pattern with an earlier unguarded rule and can never fire; they stay in
//! the table as declared and are reported by [`shadowed_rules`].

use serde::{Serialize, Serializer};
use std::fmt;

use super::fingers::HandPose;
use crate::landmarks::{NormalizedLandmarkSet, INDEX_MCP, INDEX_TIP, MIDDLE_TIP};

/// Horizontal gap (normalized units) under which index and middle tips count
/// as touching.
pub const TOGETHER_EPSILON: f32 = 0.05;

/// Sign symbols the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    A,
    B,
    D,
    I,
    L,
    S,
    U,
    V,
    Y,
    ILoveYou,
}

impl Sign {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sign::Zero => "0",
            Sign::One => "1",
            Sign::Two => "2",
            Sign::Three => "3",
            Sign::Four => "4",
            Sign::Five => "5",
            Sign::A => "A",
            Sign::B => "B",
            Sign::D => "D",
            Sign::I => "I",
            Sign::L => "L",
            Sign::S => "S",
            Sign::U => "U",
            Sign::V => "V",
            Sign::Y => "Y",
            Sign::ILoveYou => "ILY",
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Sign {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

type Guard = fn(&NormalizedLandmarkSet) -> bool;

/// One row of the pattern table.
#[derive(Debug, Clone, Copy)]
pub struct GestureRule {
    pub sign: Sign,
    /// `[thumb, index, middle, ring, pinky]` extension flags
    pub pattern: [bool; 5],
    guard: Option<Guard>,
}

impl GestureRule {
    const fn new(sign: Sign, pattern: [bool; 5]) -> Self {
        Self {
            sign,
            pattern,
            guard: None,
        }
    }

    const fn guarded(sign: Sign, pattern: [bool; 5], guard: Guard) -> Self {
        Self {
            sign,
            pattern,
            guard: Some(guard),
        }
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    pub fn matches(&self, pose: &HandPose, landmarks: &NormalizedLandmarkSet) -> bool {
        if pose.pattern() != self.pattern {
            return false;
        }
        self.guard.map_or(true, |guard| guard(landmarks))
    }
}

/// Index tip strictly above its own base knuckle.
fn index_points_up(landmarks: &NormalizedLandmarkSet) -> bool {
    landmarks.point(INDEX_TIP).y < landmarks.point(INDEX_MCP).y
}

fn tips_together(landmarks: &NormalizedLandmarkSet) -> bool {
    (landmarks.point(INDEX_TIP).x - landmarks.point(MIDDLE_TIP).x).abs() < TOGETHER_EPSILON
}

const F: bool = false;
const T: bool = true;

/// Declaration order is evaluation order.
pub const GESTURE_RULES: [GestureRule; 16] = [
    GestureRule::new(Sign::Zero, [F, F, F, F, F]),
    GestureRule::guarded(Sign::D, [F, T, F, F, F], index_points_up),
    GestureRule::new(Sign::One, [F, T, F, F, F]),
    GestureRule::guarded(Sign::U, [F, T, T, F, F], tips_together),
    GestureRule::new(Sign::Two, [F, T, T, F, F]),
    // Shadowed by "2"
    GestureRule::new(Sign::V, [F, T, T, F, F]),
    GestureRule::new(Sign::Three, [F, T, T, T, F]),
    GestureRule::new(Sign::Four, [F, T, T, T, T]),
    // Shadowed by "4"
    GestureRule::new(Sign::B, [F, T, T, T, T]),
    GestureRule::new(Sign::Five, [T, T, T, T, T]),
    GestureRule::new(Sign::A, [T, F, F, F, F]),
    GestureRule::new(Sign::I, [F, F, F, F, T]),
    // Shadowed by "0"
    GestureRule::new(Sign::S, [F, F, F, F, F]),
    GestureRule::new(Sign::ILoveYou, [F, F, T, F, T]),
    GestureRule::new(Sign::L, [T, T, F, F, F]),
    GestureRule::new(Sign::Y, [T, F, F, F, T]),
];

/// First rule in table order that accepts the pose.
pub fn match_rule(
    pose: &HandPose,
    landmarks: &NormalizedLandmarkSet,
) -> Option<&'static GestureRule> {
    GESTURE_RULES
        .iter()
        .find(|rule| rule.matches(pose, landmarks))
}

/// Rules that can never fire because an earlier unguarded rule has the same
/// pattern.
pub fn shadowed_rules() -> Vec<&'static GestureRule> {
    GESTURE_RULES
        .iter()
        .enumerate()
        .filter(|(i, rule)| {
            GESTURE_RULES[..*i]
                .iter()
                .any(|earlier| !earlier.is_guarded() && earlier.pattern == rule.pattern)
        })
        .map(|(_, rule)| rule)
        .collect()
}
