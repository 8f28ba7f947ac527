//! Per-session temporal sign buffer
//!
//! Debounces held gestures, accumulates accepted signs and decides when an
//! idle sequence is ready to commit.

mod state;
mod store;

pub use state::{BufferState, BufferedSign, SessionBuffer, SessionStats};
pub use store::{CommittedSequence, SignBuffer};
