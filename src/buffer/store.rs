use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use uuid::Uuid;

use super::state::{BufferState, SessionBuffer, SessionStats};
use crate::config::BufferConfig;

/// A finished sign sequence, ready for translation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommittedSequence {
    pub commit_id: Uuid,
    pub session_id: String,
    pub signs: Vec<String>,
    pub committed_at: DateTime<Utc>,
}

impl CommittedSequence {
    pub fn new(session_id: impl Into<String>, signs: Vec<String>) -> Self {
        Self {
            commit_id: Uuid::new_v4(),
            session_id: session_id.into(),
            signs,
            committed_at: Utc::now(),
        }
    }
}

/// Session-keyed sign buffers.
///
/// Cloning yields another handle to the same map. The lock is only held for
/// in-memory bookkeeping, never across an await.
pub struct SignBuffer {
    sessions: Arc<Mutex<HashMap<String, SessionBuffer>>>,
    config: BufferConfig,
}

impl SignBuffer {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    // A panic elsewhere while holding the lock leaves plain data behind;
    // keep serving it.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionBuffer>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffer a detected sign. Returns true when the sign was appended.
    pub fn add_sign(&self, session_id: &str, symbol: &str, confidence: f32) -> bool {
        self.add_sign_at(session_id, symbol, confidence, Instant::now())
    }

    pub fn add_sign_at(
        &self,
        session_id: &str,
        symbol: &str,
        confidence: f32,
        now: Instant,
    ) -> bool {
        // Written so that a NaN confidence is rejected too
        if !(confidence >= self.config.min_confidence) || symbol.is_empty() {
            return false;
        }

        let mut sessions = self.lock();
        let buffer = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionBuffer::new(session_id, self.config.capacity));
        buffer.push(symbol, confidence, now, self.config.debounce())
    }

    pub fn should_commit(&self, session_id: &str) -> bool {
        self.should_commit_at(session_id, Instant::now())
    }

    pub fn should_commit_at(&self, session_id: &str, now: Instant) -> bool {
        self.session_state_at(session_id, now) == BufferState::ReadyToCommit
    }

    /// Unknown sessions read as `Empty`.
    pub fn session_state_at(&self, session_id: &str, now: Instant) -> BufferState {
        self.lock()
            .get(session_id)
            .map_or(BufferState::Empty, |buffer| buffer.state_at(now, &self.config))
    }

    pub fn session_state(&self, session_id: &str) -> BufferState {
        self.session_state_at(session_id, Instant::now())
    }

    /// Hand back every buffered symbol, oldest first, and reset the session.
    pub fn commit_sequence(&self, session_id: &str) -> Vec<String> {
        self.lock()
            .get_mut(session_id)
            .map(SessionBuffer::take_sequence)
            .unwrap_or_default()
    }

    /// Commit every session that is ready at `now`, under a single lock.
    pub fn take_ready(&self, now: Instant) -> Vec<CommittedSequence> {
        let mut sessions = self.lock();
        sessions
            .values_mut()
            .filter(|buffer| buffer.state_at(now, &self.config) == BufferState::ReadyToCommit)
            .map(|buffer| {
                let session_id = buffer.session_id().to_string();
                CommittedSequence::new(session_id, buffer.take_sequence())
            })
            .collect()
    }

    pub fn get_sequence(&self, session_id: &str) -> Vec<String> {
        self.lock()
            .get(session_id)
            .map(SessionBuffer::sequence)
            .unwrap_or_default()
    }

    pub fn get_session_stats(&self, session_id: &str) -> SessionStats {
        self.lock()
            .get(session_id)
            .map(SessionBuffer::stats)
            .unwrap_or_default()
    }

    /// Drop the session's buffer entirely. Returns whether one existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    /// Drop every buffer; used on shutdown.
    pub fn clear_all(&self) -> usize {
        let mut sessions = self.lock();
        let count = sessions.len();
        sessions.clear();
        count
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }
}

impl Clone for SignBuffer {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SESSION: &str = "test-session-123";

    fn buffer() -> SignBuffer {
        SignBuffer::new(BufferConfig::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_session_created_lazily() {
        let buf = buffer();
        assert!(!buf.has_session(SESSION));
        assert!(!buf.add_sign(SESSION, "A", 0.3));
        assert!(!buf.has_session(SESSION));
        assert!(buf.add_sign(SESSION, "A", 0.9));
        assert!(buf.has_session(SESSION));
    }

    #[test]
    fn test_add_sign_low_confidence() {
        let buf = buffer();
        buf.add_sign(SESSION, "B", 0.9);
        let before = buf.get_session_stats(SESSION);

        assert!(!buf.add_sign(SESSION, "A", 0.3));
        assert_eq!(buf.get_session_stats(SESSION), before);
    }

    #[test]
    fn test_add_sign_nan_confidence() {
        let buf = buffer();
        assert!(!buf.add_sign(SESSION, "A", f32::NAN));
        assert!(!buf.has_session(SESSION));
        assert!(buf.get_sequence(SESSION).is_empty());
    }

    #[test]
    fn test_add_sign_empty_symbol() {
        let buf = buffer();
        assert!(!buf.add_sign(SESSION, "", 0.9));
        assert_eq!(buf.session_count(), 0);
    }

    #[test]
    fn test_add_sign_valid() {
        let buf = buffer();
        assert!(buf.add_sign(SESSION, "A", 0.9));
        assert_eq!(buf.get_sequence(SESSION), vec!["A"]);
    }

    #[test]
    fn test_add_sign_debounce() {
        let buf = buffer();
        let t0 = Instant::now();
        assert!(buf.add_sign_at(SESSION, "A", 0.9, t0));
        assert!(!buf.add_sign_at(SESSION, "A", 0.9, t0 + ms(100)));
        assert_eq!(buf.get_sequence(SESSION).len(), 1);
    }

    #[test]
    fn test_get_sequence_empty() {
        assert!(buffer().get_sequence("non-existent").is_empty());
    }

    #[test]
    fn test_clear_session() {
        let buf = buffer();
        buf.add_sign(SESSION, "A", 0.9);
        buf.add_sign(SESSION, "B", 0.9);

        assert!(buf.clear_session(SESSION));
        assert!(buf.get_sequence(SESSION).is_empty());
        assert!(!buf.has_session(SESSION));
        assert!(!buf.clear_session(SESSION));
    }

    #[test]
    fn test_commit_sequence() {
        let buf = buffer();
        let t0 = Instant::now();
        for (i, symbol) in ["H", "E", "L", "L", "O"].iter().enumerate() {
            assert!(buf.add_sign_at(SESSION, symbol, 0.9, t0 + ms(600 * i as u64)));
        }
        let last = t0 + ms(600 * 4);

        assert!(!buf.should_commit_at(SESSION, last + ms(100)));
        assert!(buf.should_commit_at(SESSION, last + ms(5000)));

        let sequence = buf.commit_sequence(SESSION);
        assert_eq!(sequence, vec!["H", "E", "L", "L", "O"]);

        let stats = buf.get_session_stats(SESSION);
        assert_eq!(stats.signs_count, 0);
        assert!(stats.sign_counts.is_empty());
        assert!(buf.get_sequence(SESSION).is_empty());
        // Commit resets the contents, not the registration
        assert!(buf.has_session(SESSION));
    }

    #[test]
    fn test_commit_sequence_too_short() {
        let buf = buffer();
        let t0 = Instant::now();
        buf.add_sign_at(SESSION, "A", 0.9, t0);
        assert!(!buf.should_commit_at(SESSION, t0 + Duration::from_secs(5)));
        assert!(!buf.should_commit_at(SESSION, t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn test_should_commit_unknown_session() {
        assert!(!buffer().should_commit("nobody"));
        assert_eq!(buffer().session_state("nobody"), BufferState::Empty);
    }

    #[test]
    fn test_commit_unknown_session_is_empty() {
        let buf = buffer();
        assert!(buf.commit_sequence("nobody").is_empty());
        assert_eq!(buf.session_count(), 0);
    }

    #[test]
    fn test_session_stats() {
        let buf = buffer();
        let t0 = Instant::now();
        buf.add_sign_at(SESSION, "A", 0.9, t0);
        buf.add_sign_at(SESSION, "A", 0.9, t0 + ms(10)); // debounced
        buf.add_sign_at(SESSION, "B", 0.9, t0 + ms(20));

        let stats = buf.get_session_stats(SESSION);
        assert_eq!(stats.signs_count, 2);
        assert_eq!(stats.unique_signs, 2);
        assert_eq!(stats.sign_counts.get("A"), Some(&1));
    }

    #[test]
    fn test_sessions_are_independent() {
        let buf = buffer();
        let t0 = Instant::now();
        buf.add_sign_at("one", "A", 0.9, t0);
        buf.add_sign_at("two", "A", 0.9, t0);
        buf.add_sign_at("two", "B", 0.9, t0);

        assert_eq!(buf.get_sequence("one"), vec!["A"]);
        assert_eq!(buf.get_sequence("two"), vec!["A", "B"]);

        buf.clear_session("two");
        assert_eq!(buf.get_sequence("one"), vec!["A"]);
    }

    #[test]
    fn test_take_ready_commits_only_idle_sessions() {
        let buf = buffer();
        let t0 = Instant::now();
        buf.add_sign_at("idle", "H", 0.9, t0);
        buf.add_sign_at("idle", "I", 0.9, t0 + ms(10));
        buf.add_sign_at("busy", "H", 0.9, t0);
        buf.add_sign_at("busy", "I", 0.9, t0 + ms(2500));
        buf.add_sign_at("short", "A", 0.9, t0);

        let ready = buf.take_ready(t0 + ms(3000));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].session_id, "idle");
        assert_eq!(ready[0].signs, vec!["H", "I"]);

        assert!(buf.get_sequence("idle").is_empty());
        assert_eq!(buf.get_sequence("busy").len(), 2);
        assert_eq!(buf.get_sequence("short").len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let buf = buffer();
        let other = buf.clone();
        buf.add_sign(SESSION, "A", 0.9);
        assert_eq!(other.get_sequence(SESSION), vec!["A"]);
        assert_eq!(other.clear_all(), 1);
        assert_eq!(buf.session_count(), 0);
    }

    #[test]
    fn test_concurrent_sessions() {
        let buf = buffer();
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let buf = buf.clone();
                std::thread::spawn(move || {
                    let session = format!("session-{worker}");
                    let t0 = Instant::now();
                    for i in 0..20u64 {
                        let symbol = if i % 2 == 0 { "A" } else { "B" };
                        buf.add_sign_at(&session, symbol, 0.9, t0 + ms(i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(buf.session_count(), 8);
        for worker in 0..8 {
            assert_eq!(buf.get_sequence(&format!("session-{worker}")).len(), 20);
        }
    }
}
