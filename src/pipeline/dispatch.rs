use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use super::metrics::PipelineMetrics;
use crate::buffer::CommittedSequence;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Downstream consumer of committed sequences, usually a natural-language
/// translation service.
pub trait Translator: Send + Sync + 'static {
    fn translate(
        &self,
        sequence: CommittedSequence,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Logs each sequence and drops it.
#[derive(Debug, Clone, Default)]
pub struct LogTranslator;

impl Translator for LogTranslator {
    fn translate(
        &self,
        sequence: CommittedSequence,
    ) -> impl Future<Output = Result<()>> + Send {
        log::info!(
            "translation requested for session {}: [{}] (commit {})",
            sequence.session_id,
            sequence.signs.join(" "),
            sequence.commit_id
        );
        std::future::ready(Ok(()))
    }
}

/// Forwards sequences into an mpsc channel for another task to consume.
#[derive(Debug, Clone)]
pub struct ChannelTranslator {
    tx: mpsc::UnboundedSender<CommittedSequence>,
}

impl ChannelTranslator {
    pub fn new(tx: mpsc::UnboundedSender<CommittedSequence>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CommittedSequence>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Translator for ChannelTranslator {
    fn translate(
        &self,
        sequence: CommittedSequence,
    ) -> impl Future<Output = Result<()>> + Send {
        let result = self.tx.send(sequence).map_err(|err| {
            anyhow!("translation channel closed, dropped commit {}", err.0.commit_id)
        });
        std::future::ready(result)
    }
}

/// Hands committed sequences to the translator without blocking the caller.
///
/// The buffer has already been reset by the time a sequence gets here, so a
/// failed translation is logged and counted, never retried into the buffer.
pub struct CommitDispatcher<T: Translator> {
    translator: Arc<T>,
    metrics: PipelineMetrics,
    tasks: TaskTracker,
}

impl<T: Translator> CommitDispatcher<T> {
    pub fn new(translator: T, metrics: PipelineMetrics) -> Self {
        Self {
            translator: Arc::new(translator),
            metrics,
            tasks: TaskTracker::new(),
        }
    }

    /// Wait until every translation spawned so far, by any clone, has finished.
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Spawn the translation call. Must be called inside a tokio runtime.
    pub fn dispatch(&self, sequence: CommittedSequence) -> JoinHandle<()> {
        let translator = Arc::clone(&self.translator);
        let metrics = self.metrics.clone();

        self.tasks.spawn(async move {
            metrics.record_commit().await;

            let session_id = sequence.session_id.clone();
            let commit_id = sequence.commit_id;
            let sign_count = sequence.signs.len();

            match translator.translate(sequence).await {
                Ok(()) => log_info!(
                    "dispatched commit {} ({} signs) for session {}",
                    commit_id,
                    sign_count,
                    session_id
                ),
                Err(err) => {
                    log_error!(
                        "translation failed for session {} commit {}: {err:?}",
                        session_id,
                        commit_id
                    );
                    metrics.record_dispatch_failure().await;
                }
            }
        })
    }
}

impl<T: Translator> Clone for CommitDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            translator: Arc::clone(&self.translator),
            metrics: self.metrics.clone(),
            tasks: self.tasks.clone(),
        }
    }
}
