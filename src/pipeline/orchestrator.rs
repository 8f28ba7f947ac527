use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use super::dispatch::{CommitDispatcher, Translator};
use super::messages::{
    Command, CommandAck, CommandAction, CommandStatus, DetectionResult, FrameEvent,
};
use super::metrics::PipelineMetrics;
use super::sweeper::CommitSweeper;
use crate::buffer::{CommittedSequence, SignBuffer};
use crate::config::PipelineConfig;
use crate::gesture::classify_normalized;
use crate::landmarks::normalize;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Routes frames through normalize, classify and buffer, and hands commits to
/// the translator.
///
/// Holds no per-session state of its own; everything lives in [`SignBuffer`].
pub struct Pipeline<T: Translator> {
    config: PipelineConfig,
    buffer: SignBuffer,
    dispatcher: CommitDispatcher<T>,
    metrics: PipelineMetrics,
    sweeper: Arc<Mutex<CommitSweeper>>,
}

impl<T: Translator> Pipeline<T> {
    pub fn new(config: PipelineConfig, translator: T) -> Self {
        let metrics = PipelineMetrics::new();
        Self {
            buffer: SignBuffer::new(config.buffer.clone()),
            dispatcher: CommitDispatcher::new(translator, metrics.clone()),
            metrics,
            sweeper: Arc::new(Mutex::new(CommitSweeper::new())),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &SignBuffer {
        &self.buffer
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub async fn process_frame(&self, frame: FrameEvent) -> DetectionResult {
        self.process_frame_at(frame, Instant::now()).await
    }

    /// Same as [`Pipeline::process_frame`] with an explicit arrival time.
    pub async fn process_frame_at(&self, frame: FrameEvent, now: Instant) -> DetectionResult {
        let Some(landmarks) = frame.observation.complete_landmarks() else {
            self.metrics.record_frame(false, false, false).await;
            return DetectionResult::no_hand(frame.timestamp);
        };

        let normalized = normalize(landmarks);
        let classification = classify_normalized(&normalized);

        let mut accepted = false;
        if let Some(sign) = classification.sign {
            if classification.confidence >= self.config.detection_threshold {
                accepted = self.buffer.add_sign_at(
                    &frame.session_id,
                    sign.as_str(),
                    classification.confidence,
                    now,
                );
            }
        }

        if accepted {
            log_debug!(
                "session {} accepted {:?} ({:.2})",
                frame.session_id,
                classification.sign,
                classification.confidence
            );
            self.commit_if_ready(&frame.session_id, now);
        }

        self.metrics
            .record_frame(true, classification.sign.is_some(), accepted)
            .await;

        DetectionResult {
            sign: classification.sign,
            confidence: classification.confidence,
            hand_detected: true,
            landmarks: self.config.debug.then(|| landmarks.clone()),
            timestamp: frame.timestamp,
        }
    }

    fn commit_if_ready(&self, session_id: &str, now: Instant) {
        if !self.buffer.should_commit_at(session_id, now) {
            return;
        }

        let signs = self.buffer.commit_sequence(session_id);
        if signs.is_empty() {
            return;
        }

        log_info!("committing {} signs for session {}", signs.len(), session_id);
        self.dispatcher.dispatch(CommittedSequence::new(session_id, signs));
    }

    pub fn handle_command(&self, command: Command) -> CommandAck {
        let status = match command.action {
            CommandAction::Start => CommandStatus::Started,
            CommandAction::Stop => CommandStatus::Stopped,
            CommandAction::Clear => {
                let existed = self.buffer.clear_session(&command.session_id);
                log_info!(
                    "cleared session {} (had buffer: {})",
                    command.session_id,
                    existed
                );
                CommandStatus::Cleared
            }
        };

        CommandAck {
            status,
            session_id: command.session_id,
        }
    }

    /// Start committing idle sessions in the background.
    pub async fn start_sweeper(&self) -> Result<()> {
        self.sweeper.lock().await.start(
            self.buffer.clone(),
            self.dispatcher.clone(),
            self.config.sweep_interval(),
        )
    }

    /// Commit every session that is ready now. Returns how many were
    /// dispatched.
    pub fn flush_ready(&self) -> usize {
        let ready = self.buffer.take_ready(Instant::now());
        let count = ready.len();
        for sequence in ready {
            self.dispatcher.dispatch(sequence);
        }
        count
    }

    /// Stop the sweeper, commit sessions that are already ready, wait for
    /// in-flight translations and drop every session buffer.
    pub async fn shutdown(&self) -> Result<()> {
        self.sweeper.lock().await.stop().await?;

        let flushed = self.flush_ready();
        self.dispatcher.wait_idle().await;

        let dropped = self.buffer.clear_all();
        log_info!(
            "pipeline shut down, flushed {} ready sessions, dropped {} session buffers",
            flushed,
            dropped
        );
        Ok(())
    }
}

impl<T: Translator> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            buffer: self.buffer.clone(),
            dispatcher: self.dispatcher.clone(),
            metrics: self.metrics.clone(),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BufferConfig;
    use crate::gesture::Sign;
    use crate::landmarks::{
        HandObservation, LandmarkSet, HAND_LANDMARK_COUNT, INDEX_MCP, INDEX_PIP, INDEX_TIP,
        MIDDLE_MCP, MIDDLE_PIP, MIDDLE_TIP, PINKY_MCP, PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP,
        THUMB_IP, THUMB_TIP, WRIST,
    };
    use crate::pipeline::dispatch::ChannelTranslator;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn fist() -> Vec<[f32; 3]> {
        let mut points = vec![[0.5, 0.6, 0.0]; HAND_LANDMARK_COUNT];
        points[WRIST] = [0.5, 0.8, 0.0];
        points[MIDDLE_MCP] = [0.5, 0.6, 0.0];
        points[INDEX_MCP] = [0.45, 0.6, 0.0];
        points[PINKY_MCP] = [0.6, 0.62, 0.0];
        points[THUMB_IP] = [0.42, 0.65, 0.0];
        points[THUMB_TIP] = [0.5, 0.64, 0.0];
        for pip in [INDEX_PIP, MIDDLE_PIP, RING_PIP, PINKY_PIP] {
            points[pip] = [points[pip][0], 0.55, 0.0];
        }
        for tip in [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP] {
            points[tip] = [points[tip][0], 0.62, 0.0];
        }
        points
    }

    fn pinky_up() -> Vec<[f32; 3]> {
        let mut points = fist();
        points[PINKY_TIP] = [0.65, 0.3, 0.0];
        points
    }

    fn frame(session: &str, points: Vec<[f32; 3]>) -> FrameEvent {
        FrameEvent::new(
            session,
            1_700_000_000_000,
            HandObservation {
                hand_detected: true,
                landmarks: Some(LandmarkSet::from(points)),
                handedness: Some("Right".to_string()),
                detection_confidence: 0.9,
            },
        )
    }

    fn pipeline(
        config: PipelineConfig,
    ) -> (Pipeline<ChannelTranslator>, mpsc::UnboundedReceiver<CommittedSequence>) {
        let (translator, rx) = ChannelTranslator::channel();
        (Pipeline::new(config, translator), rx)
    }

    #[tokio::test]
    async fn test_no_hand_skips_classification() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());
        let mut event = frame("s1", fist());
        event.observation.hand_detected = false;

        let result = pipeline.process_frame(event).await;
        assert_eq!(result, DetectionResult::no_hand(1_700_000_000_000));
        assert_eq!(pipeline.buffer().session_count(), 0);

        let snap = pipeline.metrics().get_snapshot().await;
        assert_eq!(snap.frames_processed, 1);
        assert_eq!(snap.hands_detected, 0);
    }

    #[tokio::test]
    async fn test_incomplete_landmarks_is_no_hand() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());
        let mut points = fist();
        points.truncate(20);

        let result = pipeline.process_frame(frame("s1", points)).await;
        assert!(!result.hand_detected);
        assert_eq!(result.sign, None);
    }

    #[tokio::test]
    async fn test_frame_is_classified_and_buffered() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());

        let result = pipeline.process_frame(frame("s1", pinky_up())).await;
        assert!(result.hand_detected);
        assert_eq!(result.sign, Some(Sign::I));
        assert!(result.confidence >= 0.7);
        assert!(result.landmarks.is_none());
        assert_eq!(pipeline.buffer().get_sequence("s1"), vec!["I"]);

        let snap = pipeline.metrics().get_snapshot().await;
        assert_eq!(snap.signs_classified, 1);
        assert_eq!(snap.signs_accepted, 1);
    }

    #[tokio::test]
    async fn test_held_gesture_is_debounced() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());
        let t0 = Instant::now();

        pipeline.process_frame_at(frame("s1", fist()), t0).await;
        let held = pipeline
            .process_frame_at(frame("s1", fist()), t0 + Duration::from_millis(100))
            .await;
        // Still reported to the caller, just not buffered twice
        assert_eq!(held.sign, Some(Sign::Zero));
        assert_eq!(pipeline.buffer().get_sequence("s1"), vec!["0"]);

        pipeline
            .process_frame_at(frame("s1", fist()), t0 + Duration::from_millis(700))
            .await;
        assert_eq!(pipeline.buffer().get_sequence("s1"), vec!["0", "0"]);
    }

    #[tokio::test]
    async fn test_threshold_above_confidence_blocks_buffering() {
        let config = PipelineConfig {
            detection_threshold: 1.0,
            ..PipelineConfig::default()
        };
        let (pipeline, _rx) = pipeline(config);

        let result = pipeline.process_frame(frame("s1", fist())).await;
        assert_eq!(result.sign, Some(Sign::Zero));
        assert!(!pipeline.buffer().has_session("s1"));
    }

    #[tokio::test]
    async fn test_debug_echoes_landmarks() {
        let config = PipelineConfig {
            debug: true,
            ..PipelineConfig::default()
        };
        let (pipeline, _rx) = pipeline(config);

        let result = pipeline.process_frame(frame("s1", fist())).await;
        assert_eq!(result.landmarks.map(|l| l.len()), Some(HAND_LANDMARK_COUNT));
    }

    #[tokio::test]
    async fn test_clear_command_drops_session() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());
        pipeline.process_frame(frame("s1", fist())).await;
        pipeline.process_frame(frame("s2", fist())).await;

        let ack = pipeline.handle_command(Command {
            action: CommandAction::Clear,
            session_id: "s1".to_string(),
        });
        assert_eq!(ack.status, CommandStatus::Cleared);
        assert_eq!(ack.session_id, "s1");
        assert!(!pipeline.buffer().has_session("s1"));
        assert!(pipeline.buffer().has_session("s2"));
    }

    #[tokio::test]
    async fn test_start_stop_only_acknowledge() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());
        pipeline.process_frame(frame("s1", fist())).await;

        for (action, status) in [
            (CommandAction::Start, CommandStatus::Started),
            (CommandAction::Stop, CommandStatus::Stopped),
        ] {
            let ack = pipeline.handle_command(Command {
                action,
                session_id: "s1".to_string(),
            });
            assert_eq!(ack.status, status);
        }
        assert_eq!(pipeline.buffer().get_sequence("s1"), vec!["0"]);
    }

    #[tokio::test]
    async fn test_sweeper_commits_idle_session() {
        let config = PipelineConfig {
            buffer: BufferConfig {
                commit_timeout_ms: 50,
                ..BufferConfig::default()
            },
            sweep_interval_ms: 10,
            ..PipelineConfig::default()
        };
        let (pipeline, mut rx) = pipeline(config);
        pipeline.start_sweeper().await.unwrap();

        let t0 = Instant::now();
        pipeline.process_frame_at(frame("s1", fist()), t0).await;
        pipeline.process_frame_at(frame("s1", pinky_up()), t0).await;

        let committed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no commit from sweeper")
            .unwrap();
        assert_eq!(committed.session_id, "s1");
        assert_eq!(committed.signs, vec!["0", "I"]);

        pipeline.shutdown().await.unwrap();
        assert_eq!(pipeline.buffer().session_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_commits_ready_sessions() {
        let (pipeline, mut rx) = pipeline(PipelineConfig::default());
        let past = Instant::now()
            .checked_sub(Duration::from_secs(5))
            .expect("clock too close to boot");
        pipeline.process_frame_at(frame("done", fist()), past).await;
        pipeline.process_frame_at(frame("done", pinky_up()), past).await;
        pipeline.process_frame(frame("short", fist())).await;

        pipeline.shutdown().await.unwrap();

        let committed = rx.try_recv().unwrap();
        assert_eq!(committed.session_id, "done");
        assert_eq!(committed.signs, vec!["0", "I"]);
        assert!(rx.try_recv().is_err());
        assert_eq!(pipeline.buffer().session_count(), 0);
        assert_eq!(pipeline.metrics().get_snapshot().await.commits, 1);
    }

    #[tokio::test]
    async fn test_non_finite_frame_is_not_buffered() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());
        let mut points = fist();
        points[MIDDLE_TIP] = [f32::INFINITY, 0.62, 0.0];

        let result = pipeline.process_frame(frame("s1", points)).await;
        assert!(result.hand_detected);
        assert_eq!(result.sign, None);
        assert_eq!(result.confidence, 0.0);
        assert!(!pipeline.buffer().has_session("s1"));
    }

    #[tokio::test]
    async fn test_shutdown_clears_all_sessions() {
        let (pipeline, _rx) = pipeline(PipelineConfig::default());
        pipeline.process_frame(frame("a", fist())).await;
        pipeline.process_frame(frame("b", fist())).await;

        pipeline.shutdown().await.unwrap();
        assert_eq!(pipeline.buffer().session_count(), 0);
    }
}
