//! Boundary to the external settlement registry (the on-chain contract).

pub mod in_memory;

use crate::core::models::WalletAddress;
use crate::settlement::SettlementHash;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Receipt of a finalized registry call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    /// `false` when the call was mined but reverted.
    pub success: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry node unreachable: {0}")]
    Unreachable(String),

    #[error("timed out waiting for receipt")]
    Timeout,

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("call rejected by node: {0}")]
    Rejected(String),
}

impl RegistryError {
    /// Network and sync problems. Everything else is a permanent failure of
    /// that submission, though both kinds share the same retry bound.
    pub fn is_transient(&self) -> bool {
        matches!(self, RegistryError::Unreachable(_) | RegistryError::Timeout)
    }
}

#[async_trait]
pub trait SettlementRegistry: Send + Sync {
    /// Submits a signed `recordSettlement` call and waits until it is final.
    async fn record_settlement(
        &self,
        payer: &WalletAddress,
        payee: &WalletAddress,
        amount_minor_units: u128,
        settlement_hash: &SettlementHash,
    ) -> Result<TransactionReceipt, RegistryError>;
}
