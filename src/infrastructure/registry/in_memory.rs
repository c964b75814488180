use crate::core::models::WalletAddress;
use crate::infrastructure::registry::{RegistryError, SettlementRegistry, TransactionReceipt};
use crate::settlement::SettlementHash;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedSettlement {
    pub payer: WalletAddress,
    pub payee: WalletAddress,
    pub amount_minor_units: u128,
    pub settlement_hash: SettlementHash,
    pub receipt: TransactionReceipt,
}

#[derive(Default)]
struct RegistryInner {
    block_number: u64,
    calls: u32,
    records: Vec<RecordedSettlement>,
    by_hash: HashMap<SettlementHash, TransactionReceipt>,
    scripted_failures: VecDeque<RegistryError>,
}

/// Local stand-in for the settlement contract.
///
/// Duplicate submissions of a settlement hash return the original receipt
/// instead of writing a second record, mirroring the contract's duplicate
/// detection. Failures can be scripted for the next calls.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next call fails with `error`; queued failures are consumed in order.
    pub async fn fail_next(&self, error: RegistryError) {
        self.inner.lock().await.scripted_failures.push_back(error);
    }

    pub async fn records(&self) -> Vec<RecordedSettlement> {
        self.inner.lock().await.records.clone()
    }

    /// Every call received, failed ones included.
    pub async fn calls(&self) -> u32 {
        self.inner.lock().await.calls
    }
}

#[async_trait]
impl SettlementRegistry for InMemoryRegistry {
    async fn record_settlement(
        &self,
        payer: &WalletAddress,
        payee: &WalletAddress,
        amount_minor_units: u128,
        settlement_hash: &SettlementHash,
    ) -> Result<TransactionReceipt, RegistryError> {
        let mut inner = self.inner.lock().await;
        inner.calls += 1;

        if let Some(error) = inner.scripted_failures.pop_front() {
            debug!(%settlement_hash, %error, "scripted registry failure");
            return Err(error);
        }
        if let Some(receipt) = inner.by_hash.get(settlement_hash) {
            debug!(%settlement_hash, "duplicate settlement submission");
            return Ok(receipt.clone());
        }

        inner.block_number += 1;
        let mut hasher = Sha256::new();
        hasher.update(settlement_hash.as_bytes());
        hasher.update(inner.block_number.to_be_bytes());
        let receipt = TransactionReceipt {
            transaction_hash: format!("0x{}", hex::encode(hasher.finalize())),
            block_number: inner.block_number,
            success: true,
        };

        inner.by_hash.insert(*settlement_hash, receipt.clone());
        inner.records.push(RecordedSettlement {
            payer: *payer,
            payee: *payee,
            amount_minor_units,
            settlement_hash: *settlement_hash,
            receipt: receipt.clone(),
        });
        info!(%settlement_hash, block = receipt.block_number, "settlement recorded in in-process registry");
        Ok(receipt)
    }
}
