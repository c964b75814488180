pub mod dispatcher;
pub mod hash;
pub mod queue;
pub mod retry;

pub use dispatcher::{SettlementDispatcher, SettlementOutcome, SkipReason};
pub use hash::{SettlementHash, settlement_hash, to_minor_units};
pub use queue::{SettlementJob, SettlementQueue, SettlementReceiver, settlement_queue};
pub use retry::RetryPolicy;
