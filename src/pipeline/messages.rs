use serde::{Deserialize, Serialize};

use crate::buffer::CommittedSequence;
use crate::gesture::Sign;
use crate::landmarks::{HandObservation, LandmarkSet};

pub const DEFAULT_SESSION_ID: &str = "default";

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

/// One frame's worth of provider output, tagged with its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEvent {
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// Client timestamp in ms, echoed back untouched
    #[serde(default)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub observation: HandObservation,
}

impl FrameEvent {
    pub fn new(
        session_id: impl Into<String>,
        timestamp: i64,
        observation: HandObservation,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp,
            observation,
        }
    }
}

/// Per-frame answer to the caller, sent whether or not anything was buffered.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DetectionResult {
    pub sign: Option<Sign>,
    pub confidence: f32,
    pub hand_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<LandmarkSet>,
    pub timestamp: i64,
}

impl DetectionResult {
    pub fn no_hand(timestamp: i64) -> Self {
        Self {
            sign: None,
            confidence: 0.0,
            hand_detected: false,
            landmarks: None,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
    Clear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub action: CommandAction,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Started,
    Stopped,
    Cleared,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandAck {
    pub status: CommandStatus,
    pub session_id: String,
}

/// Envelope read from the client, one JSON document per line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Inbound {
    Frame(FrameEvent),
    Command(Command),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Envelope written back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Outbound {
    Detection(DetectionResult),
    Command(CommandAck),
    Sequence(CommittedSequence),
    Error(ErrorPayload),
}

impl Outbound {
    pub fn error(message: impl Into<String>) -> Self {
        Outbound::Error(ErrorPayload {
            message: message.into(),
        })
    }
}
