//! Per-finger extension state derived from normalized landmarks.

use crate::landmarks::{
    Landmark, NormalizedLandmarkSet, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_MCP,
    PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP, THUMB_IP, THUMB_TIP,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// (tip, reference joint) landmark indices.
    ///
    /// The thumb is judged against its IP joint, the other fingers against
    /// their PIP joint.
    fn landmark_indices(&self) -> (usize, usize) {
        match self {
            Finger::Thumb => (THUMB_TIP, THUMB_IP),
            Finger::Index => (INDEX_TIP, INDEX_PIP),
            Finger::Middle => (MIDDLE_TIP, MIDDLE_PIP),
            Finger::Ring => (RING_TIP, RING_PIP),
            Finger::Pinky => (PINKY_TIP, PINKY_PIP),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerState {
    pub finger: Finger,
    pub extended: bool,
    pub tip: Landmark,
    pub joint: Landmark,
}

impl FingerState {
    fn measure(finger: Finger, landmarks: &NormalizedLandmarkSet) -> Self {
        let (tip_idx, joint_idx) = finger.landmark_indices();
        let tip = landmarks.point(tip_idx);
        let joint = landmarks.point(joint_idx);

        let extended = match finger {
            // Abducting the thumb moves its tip away from the pinky base
            Finger::Thumb => {
                let pinky_base = landmarks.point(PINKY_MCP);
                tip.distance(&pinky_base) > joint.distance(&pinky_base)
            }
            // y grows downward, so a smaller y means the tip is higher
            _ => tip.y < joint.y,
        };

        Self {
            finger,
            extended,
            tip,
            joint,
        }
    }
}

/// Extension state of all five fingers for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    pub fingers: [FingerState; 5],
}

impl HandPose {
    pub fn from_landmarks(landmarks: &NormalizedLandmarkSet) -> Self {
        Self {
            fingers: Finger::ALL.map(|finger| FingerState::measure(finger, landmarks)),
        }
    }

    /// `[thumb, index, middle, ring, pinky]`
    pub fn pattern(&self) -> [bool; 5] {
        self.fingers.map(|state| state.extended)
    }

    pub fn finger(&self, finger: Finger) -> &FingerState {
        &self.fingers[finger as usize]
    }
}
