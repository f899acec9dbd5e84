//! Facts - everything the engine knows about a conversation.
//!
//! - `FactStore` - per-conversation store with merge, derive, stamp and persist
//! - `Vault` - static enrichment tables applied to snapshots
//! - `SecondarySlotRule` - decision-tree derived facts
//! - `ZoneTracker` - cached routing zones read by the policy

mod secondary;
mod store;
mod vault;
mod zones;

pub use secondary::SecondarySlotRule;
pub use store::{FactStore, SERVER_DAY, SERVER_HOUR, SERVER_MONTH};
pub use vault::Vault;
pub use zones::ZoneTracker;
