use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_processed: u64,
    pub hands_detected: u64,
    pub signs_classified: u64,
    pub signs_accepted: u64,
    pub commits: u64,
    pub dispatch_failures: u64,
}

/// Running totals for the frame pipeline. Clones share the same counters.
pub struct PipelineMetrics {
    inner: Arc<Mutex<MetricsSnapshot>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsSnapshot::default())),
        }
    }

    pub async fn record_frame(&self, hand_detected: bool, classified: bool, accepted: bool) {
        let mut state = self.inner.lock().await;
        state.frames_processed += 1;
        if hand_detected {
            state.hands_detected += 1;
        }
        if classified {
            state.signs_classified += 1;
        }
        if accepted {
            state.signs_accepted += 1;
        }
    }

    pub async fn record_commit(&self) {
        self.inner.lock().await.commits += 1;
    }

    pub async fn record_dispatch_failure(&self) {
        self.inner.lock().await.dispatch_failures += 1;
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().await.clone()
    }

    pub async fn reset(&self) {
        *self.inner.lock().await = MetricsSnapshot::default();
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PipelineMetrics {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
