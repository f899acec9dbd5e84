//! Transcript Adapters
//!
//! - **FileTranscriptStore** - One JSON document per conversation, written on flush
//! - **InMemoryTranscriptStore** - Keeps flushed transcripts in memory (testing/development)

mod file_transcript_store;
mod in_memory_transcript_store;

pub use file_transcript_store::FileTranscriptStore;
pub use in_memory_transcript_store::InMemoryTranscriptStore;
