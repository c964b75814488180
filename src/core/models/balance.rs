use super::ids::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `debtor` owes `creditor` a strictly positive `amount`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEdge {
    pub debtor: UserId,
    pub creditor: UserId,
    pub amount: Decimal,
}
