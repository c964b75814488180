use super::ids::{GroupId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash or an outside transfer; the receiver confirms it explicitly.
    #[default]
    Manual,
    /// Confirmed by the system as soon as it is created.
    InApp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentEvent {
    Confirm,
    Reject,
}

/// Result of applying a `PaymentEvent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The status changed; side effects for the new status must run.
    Applied(PaymentStatus),
    /// The payment was already terminal and nothing changed.
    Unchanged(PaymentStatus),
}

//  pending ──confirm──► confirmed
//     │
//     └─────reject────► rejected
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub group_id: Option<GroupId>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn apply(&mut self, event: PaymentEvent) -> Transition {
        if self.status.is_terminal() {
            return Transition::Unchanged(self.status);
        }
        let next = match event {
            PaymentEvent::Confirm => PaymentStatus::Confirmed,
            PaymentEvent::Reject => PaymentStatus::Rejected,
        };
        tracing::debug!(payment_id = %self.id, from = %self.status, to = %next, "payment state transition");
        self.status = next;
        self.resolved_at = Some(Utc::now());
        Transition::Applied(next)
    }
}

/// Input for `LedgerService::create_payment`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewPayment {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Decimal,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}
