use crate::core::errors::LedgerError;
use crate::core::models::{
    BalanceEdge, Expense, ExpenseId, Group, GroupId, Payment, PaymentId, SettlementRecord, User, UserId,
};
use crate::core::state::LedgerState;
use async_trait::async_trait;
use std::collections::BTreeSet;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Runs `f` as one atomic read-modify-write over the ledger state.
    ///
    /// Writers are serialized. When `f` returns an error none of its changes
    /// become visible.
    async fn transaction<F, R>(&self, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut LedgerState) -> Result<R, LedgerError> + Send,
        R: Send;

    async fn read<F, R>(&self, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&LedgerState) -> R + Send,
        R: Send;

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, LedgerError> {
        self.read(move |state| state.users.get(&user_id).cloned()).await
    }

    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, LedgerError> {
        self.read(move |state| state.groups.get(&group_id).cloned()).await
    }

    async fn get_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, LedgerError> {
        self.read(move |state| state.expenses.get(&expense_id).cloned()).await
    }

    async fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>, LedgerError> {
        self.read(move |state| state.payments.get(&payment_id).cloned()).await
    }

    async fn get_settlement_record(&self, payment_id: PaymentId) -> Result<Option<SettlementRecord>, LedgerError> {
        self.read(move |state| state.settlements.get(&payment_id).cloned()).await
    }

    /// Edges with both endpoints in `members`.
    async fn get_balances(&self, members: BTreeSet<UserId>) -> Result<Vec<BalanceEdge>, LedgerError> {
        self.read(move |state| state.graph.edges_within(&members)).await
    }
}

pub mod in_memory;
