use super::ids::{ExpenseId, GroupId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One share of an expense owed by one user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseSplit {
    pub user_id: UserId,
    pub amount: Decimal,
}

/// Immutable once persisted; there is no edit or delete path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub group_id: GroupId,
    pub paid_by: UserId,
    pub amount: Decimal,
    pub description: String,
    pub splits: Vec<ExpenseSplit>,
    pub created_at: DateTime<Utc>,
}

/// Input for `LedgerService::add_expense`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewExpense {
    pub group_id: GroupId,
    pub paid_by: UserId,
    pub amount: Decimal,
    pub description: String,
    pub splits: Vec<ExpenseSplit>,
}
