//! Convo Engine - Configuration-driven dialogue manager
//!
//! This crate decides, turn by turn, which state a customer conversation is
//! in, gathers the facts a state needs before entering it, and renders the
//! reply from declarative templates.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
