//! Domain layer containing the dialogue engine.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, fact values, error codes)
//! - `catalog` - Validated configuration loaded from the resource document
//! - `facts` - Per-conversation fact store, vault, secondary slots, zones
//! - `gate` - Slot requirements guarding state transitions
//! - `threads` - Conversation threads with pending (pause/resume) states
//! - `policy` - Intent resolution and zone crossroads
//! - `parsing` - Slot extraction from customer text
//! - `reply` - Formulas, message formats and reply rendering
//! - `chat` - Turn orchestration

pub mod catalog;
pub mod chat;
pub mod facts;
pub mod foundation;
pub mod gate;
pub mod parsing;
pub mod policy;
pub mod reply;
pub mod threads;
