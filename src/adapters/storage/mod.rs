//! Storage Adapters
//!
//! Implementations of the FactRepository port.
//!
//! ## Available Adapters
//!
//! - **FileFactRepository** - Stores facts as one YAML file per conversation
//! - **InMemoryFactRepository** - Stores facts in memory (testing/development)
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileFactRepository, InMemoryFactRepository};
//!
//! // Production: file-based storage
//! let repo = FileFactRepository::new("./data/facts");
//!
//! // Testing: in-memory storage
//! let repo = InMemoryFactRepository::new();
//! ```

mod file_fact_repository;
mod in_memory_fact_repository;

pub(crate) use file_fact_repository::file_stem;
pub use file_fact_repository::FileFactRepository;
pub use in_memory_fact_repository::InMemoryFactRepository;
