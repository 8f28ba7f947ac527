use anyhow::{bail, Context, Result};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::dispatch::{CommitDispatcher, Translator};
use crate::buffer::SignBuffer;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Background task that commits sessions once they go quiet.
///
/// Frames only arrive while a hand is moving, so a session that stops signing
/// would otherwise never reach its idle timeout on the frame path.
pub struct CommitSweeper {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl CommitSweeper {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start<T: Translator>(
        &mut self,
        buffer: SignBuffer,
        dispatcher: CommitDispatcher<T>,
        interval: Duration,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("commit sweeper already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sweep_loop(buffer, dispatcher, interval, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => handle.await.context("commit sweeper task failed to join"),
            None => Ok(()),
        }
    }
}

impl Default for CommitSweeper {
    fn default() -> Self {
        Self::new()
    }
}

async fn sweep_loop<T: Translator>(
    buffer: SignBuffer,
    dispatcher: CommitDispatcher<T>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log_info!("commit sweeper started ({}ms interval)", interval.as_millis());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for sequence in buffer.take_ready(Instant::now()) {
                    log_debug!(
                        "idle commit for session {}: {} signs",
                        sequence.session_id,
                        sequence.signs.len()
                    );
                    dispatcher.dispatch(sequence);
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("commit sweeper shutting down");
                break;
            }
        }
    }
}
