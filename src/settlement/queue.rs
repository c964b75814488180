use crate::core::errors::LedgerError;
use crate::core::models::PaymentId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettlementJob {
    pub payment_id: PaymentId,
}

pub type SettlementReceiver = mpsc::UnboundedReceiver<SettlementJob>;

/// Producer side of the settlement job queue. Enqueueing never blocks.
#[derive(Clone, Debug)]
pub struct SettlementQueue {
    sender: mpsc::UnboundedSender<SettlementJob>,
}

impl SettlementQueue {
    pub fn enqueue(&self, payment_id: PaymentId) -> Result<(), LedgerError> {
        self.sender
            .send(SettlementJob { payment_id })
            .map_err(|_| LedgerError::QueueClosed)
    }
}

pub fn settlement_queue() -> (SettlementQueue, SettlementReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (SettlementQueue { sender }, receiver)
}
