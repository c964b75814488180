pub mod config;
pub mod core;
pub mod infrastructure;
pub mod settlement;

pub use crate::core::errors::LedgerError;
pub use crate::core::graph::BalanceGraph;
pub use crate::core::services::LedgerService;
pub use crate::core::simplifier::{SimplifyReport, SimplifyScope};
pub use infrastructure::logging::in_memory::InMemoryLogging;
pub use infrastructure::registry::in_memory::InMemoryRegistry;
pub use infrastructure::storage::in_memory::InMemoryStorage;
pub use settlement::{SettlementDispatcher, SettlementOutcome, settlement_queue};

#[cfg(test)]
mod tests;
