//! Threads - current and paused conversation strands.
//!
//! A conversation can step into a side-dialogue (another thread, or a hold
//! state waiting for missing information) and resume where it left off.

mod thread;
mod threader;

pub use thread::ConvoThread;
pub use threader::{StateThreader, ThreadError, BASE_THREAD};
