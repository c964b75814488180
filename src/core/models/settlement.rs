use super::ids::PaymentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof that a confirmed payment was anchored on the external registry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettlementProof {
    pub payment_id: PaymentId,
    pub settlement_hash: String,
    pub transaction_hash: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Queued,
    Recorded,
    /// Registry not configured; the payment itself is unaffected.
    PendingConfiguration,
    /// One of the parties has no wallet address.
    MissingWallet,
    /// Retries exhausted; waiting for manual intervention.
    DeadLettered,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub payment_id: PaymentId,
    pub status: SettlementStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub proof: Option<SettlementProof>,
    pub updated_at: DateTime<Utc>,
}

impl SettlementRecord {
    pub fn queued(payment_id: PaymentId) -> Self {
        SettlementRecord {
            payment_id,
            status: SettlementStatus::Queued,
            attempts: 0,
            last_error: None,
            proof: None,
            updated_at: Utc::now(),
        }
    }
}
