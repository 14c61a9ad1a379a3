//! Subscription ledgers and their store.

pub mod ledger;
pub mod regulation;
pub mod repo;

pub use ledger::{ExpirationRecord, RevocationOutcome, Subscription};
pub use regulation::RegulationCapacity;
pub use repo::{SubscriptionRepo, SubscriptionSource};
