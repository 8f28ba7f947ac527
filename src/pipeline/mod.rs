//! Frame pipeline: per-frame routing, commit dispatch and the idle-commit
//! sweeper.

mod dispatch;
mod messages;
mod metrics;
mod orchestrator;
mod sweeper;

pub use dispatch::{ChannelTranslator, CommitDispatcher, LogTranslator, Translator};
pub use messages::{
    Command, CommandAck, CommandAction, CommandStatus, DetectionResult, ErrorPayload, FrameEvent,
    Inbound, Outbound, DEFAULT_SESSION_ID,
};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use orchestrator::Pipeline;
pub use sweeper::CommitSweeper;
