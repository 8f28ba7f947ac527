use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::config::BufferConfig;

/// Where a session sits in the accumulate/commit cycle.
///
/// Recomputed from the buffer contents and the clock on every query; never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Empty,
    Accumulating,
    ReadyToCommit,
}

#[derive(Debug, Clone)]
pub struct BufferedSign {
    pub symbol: String,
    pub confidence: f32,
    pub arrived_at: Instant,
}

/// Read-only view of one session's buffer.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SessionStats {
    pub signs_count: usize,
    pub unique_signs: usize,
    pub sign_counts: BTreeMap<String, usize>,
    /// Mean classifier confidence of the buffered signs, 0.0 when empty
    pub mean_confidence: f32,
}

/// Accepted signs for one session plus the debounce bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionBuffer {
    session_id: String,
    signs: VecDeque<BufferedSign>,
    capacity: usize,
    last_sign: Option<String>,
    sign_counts: HashMap<String, usize>,
}

impl SessionBuffer {
    pub fn new(session_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            session_id: session_id.into(),
            signs: VecDeque::with_capacity(capacity.min(128)),
            capacity: capacity.max(1),
            last_sign: None,
            sign_counts: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn len(&self) -> usize {
        self.signs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signs.is_empty()
    }

    pub fn last_sign(&self) -> Option<&str> {
        self.last_sign.as_deref()
    }

    /// Arrival of the newest buffered sign. Drives both debounce and the
    /// idle-commit timeout.
    pub fn last_arrival(&self) -> Option<Instant> {
        self.signs.back().map(|sign| sign.arrived_at)
    }

    /// Time since the newest buffered sign, zero when nothing is buffered.
    pub fn idle_for(&self, now: Instant) -> Duration {
        self.last_arrival()
            .map_or(Duration::ZERO, |arrived| now.saturating_duration_since(arrived))
    }

    /// Same symbol as the last accepted one, inside the debounce window.
    pub fn is_debounced(&self, symbol: &str, now: Instant, debounce: Duration) -> bool {
        self.last_sign.as_deref() == Some(symbol) && self.idle_for(now) < debounce
    }

    /// Append a sign unless it is debounced. Confidence gating happens before
    /// a buffer is ever looked up.
    pub fn push(
        &mut self,
        symbol: &str,
        confidence: f32,
        now: Instant,
        debounce: Duration,
    ) -> bool {
        if self.is_debounced(symbol, now, debounce) {
            return false;
        }

        if self.signs.len() >= self.capacity {
            self.signs.pop_front();
        }
        self.signs.push_back(BufferedSign {
            symbol: symbol.to_string(),
            confidence,
            arrived_at: now,
        });

        self.last_sign = Some(symbol.to_string());
        *self.sign_counts.entry(symbol.to_string()).or_insert(0) += 1;

        true
    }

    pub fn state_at(&self, now: Instant, config: &BufferConfig) -> BufferState {
        if self.signs.is_empty() {
            BufferState::Empty
        } else if self.signs.len() >= config.min_sequence_length
            && self.idle_for(now) > config.commit_timeout()
        {
            BufferState::ReadyToCommit
        } else {
            BufferState::Accumulating
        }
    }

    pub fn sequence(&self) -> Vec<String> {
        self.signs.iter().map(|s| s.symbol.clone()).collect()
    }

    /// Drain the buffered symbols oldest first and reset the debounce and
    /// count state. The buffer itself stays registered.
    pub fn take_sequence(&mut self) -> Vec<String> {
        let sequence = self.signs.drain(..).map(|s| s.symbol).collect();
        self.last_sign = None;
        self.sign_counts.clear();
        sequence
    }

    pub fn stats(&self) -> SessionStats {
        let mean_confidence = if self.signs.is_empty() {
            0.0
        } else {
            self.signs.iter().map(|s| s.confidence).sum::<f32>() / self.signs.len() as f32
        };

        SessionStats {
            signs_count: self.signs.len(),
            unique_signs: self.sign_counts.len(),
            sign_counts: self
                .sign_counts
                .iter()
                .map(|(symbol, count)| (symbol.clone(), *count))
                .collect(),
            mean_confidence,
        }
    }
}
