use crate::core::graph::BalanceGraph;
use crate::core::models::{
    Expense, ExpenseId, Group, GroupId, Payment, PaymentId, SettlementRecord, SettlementStatus, User, UserId,
};
use std::collections::HashMap;

/// Everything a storage transaction reads and writes.
#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    pub users: HashMap<UserId, User>,
    pub groups: HashMap<GroupId, Group>,
    pub expenses: HashMap<ExpenseId, Expense>,
    pub payments: HashMap<PaymentId, Payment>,
    pub graph: BalanceGraph,
    pub settlements: HashMap<PaymentId, SettlementRecord>,
}

impl LedgerState {
    pub fn group_expenses(&self, group_id: GroupId) -> impl Iterator<Item = &Expense> {
        self.expenses.values().filter(move |e| e.group_id == group_id)
    }

    pub fn group_payments(&self, group_id: GroupId) -> impl Iterator<Item = &Payment> {
        self.payments.values().filter(move |p| p.group_id == Some(group_id))
    }

    pub fn dead_letters(&self) -> Vec<SettlementRecord> {
        let mut records: Vec<SettlementRecord> = self
            .settlements
            .values()
            .filter(|r| r.status == SettlementStatus::DeadLettered)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.updated_at);
        records
    }
}
