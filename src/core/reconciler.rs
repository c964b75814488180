//! Translates expenses and confirmed payments into balance deltas.
//!
//! Neither function is idempotent. Callers run them exactly once, inside the
//! storage transaction that persists the expense or the payment transition.

use crate::core::errors::LedgerError;
use crate::core::graph::BalanceGraph;
use crate::core::models::{Expense, Payment, PaymentStatus};
use tracing::debug;

pub fn reconcile_expense(graph: &mut BalanceGraph, expense: &Expense) -> Result<(), LedgerError> {
    let payer = expense.paid_by;
    for split in expense.splits.iter().filter(|s| s.user_id != payer) {
        let current = graph.net_debt(split.user_id, payer);
        graph.set_net(split.user_id, payer, current + split.amount)?;
        debug!(
            expense_id = %expense.id,
            debtor = %split.user_id,
            creditor = %payer,
            share = %split.amount,
            "expense share reconciled"
        );
    }
    Ok(())
}

pub fn reconcile_payment(graph: &mut BalanceGraph, payment: &Payment) -> Result<(), LedgerError> {
    if payment.status != PaymentStatus::Confirmed {
        return Err(LedgerError::InvariantViolation(format!(
            "payment {} reconciled while {}",
            payment.id, payment.status
        )));
    }
    let current = graph.net_debt(payment.from_user_id, payment.to_user_id);
    graph.set_net(payment.from_user_id, payment.to_user_id, current - payment.amount)?;
    debug!(
        payment_id = %payment.id,
        payer = %payment.from_user_id,
        receiver = %payment.to_user_id,
        amount = %payment.amount,
        "payment reconciled"
    );
    Ok(())
}
