//! Clock Port - source of the server-observed time facts.

use chrono::NaiveDateTime;

/// Port for reading the local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}
