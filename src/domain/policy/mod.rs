//! Policy - which transition an intent triggers in a given state.
//!
//! - `PolicyKeeper` - classifies utterances and resolves them per state
//! - `PolicyTable` - intent -> transition map for one state
//! - `Transition` / `Understanding` - resolution results

mod keeper;
mod table;
mod transition;

pub use keeper::PolicyKeeper;
pub use table::PolicyTable;
pub use transition::{Transition, Understanding};
