use crate::core::constants::{
    DEBTS_SIMPLIFIED, EPSILON, EXPENSE_ADDED, GROUP_CREATED, MAX_AMOUNT, PAYMENT_CONFIRMED, PAYMENT_CREATED,
    PAYMENT_REJECTED, SETTLEMENT_REQUEUED, USER_ADDED,
};
use crate::core::errors::{FieldError, LedgerError};
use crate::core::models::{
    AppLog, BalanceEdge, Expense, ExpenseId, Group, GroupId, NewExpense, NewPayment, Payment, PaymentEvent,
    PaymentId, PaymentMethod, PaymentStatus, SettlementRecord, SettlementStatus, Transition, User, UserId,
    WalletAddress,
};
use crate::core::reconciler::{reconcile_expense, reconcile_payment};
use crate::core::simplifier::{SimplifyReport, SimplifyScope, scope_net_positions, simplify_global, simplify_members};
use crate::core::state::LedgerState;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use crate::settlement::SettlementQueue;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Entry point for the surrounding API layer.
///
/// Every ledger mutation runs inside one storage transaction together with the
/// state change it reacts to. Settlement jobs are enqueued only after that
/// transaction has committed.
pub struct LedgerService<L: LoggingService, S: Storage> {
    storage: Arc<S>,
    logging: Arc<L>,
    queue: SettlementQueue,
}

impl<L: LoggingService, S: Storage> LedgerService<L, S> {
    pub fn new(storage: Arc<S>, logging: Arc<L>, queue: SettlementQueue) -> Self {
        LedgerService {
            storage,
            logging,
            queue,
        }
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), LedgerError> {
        if value.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} cannot be empty", field),
                },
            ));
        }
        if value.len() > max_length {
            return Err(LedgerError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("{} Too Long", field),
                    description: format!("{} cannot exceed {} characters", field, max_length),
                },
            ));
        }
        Ok(())
    }

    fn validate_amount_input(&self, field: &str, amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(field, "Amount must be greater than 0"));
        }
        if amount > MAX_AMOUNT {
            return Err(LedgerError::invalid_amount(field, "Amount cannot exceed 1,000,000"));
        }
        if amount.normalize().scale() > 2 {
            return Err(LedgerError::invalid_amount(
                field,
                "Amount cannot have more than 2 decimal places",
            ));
        }
        Ok(())
    }

    // USERS AND GROUPS

    pub async fn add_user(&self, name: String, wallet_address: Option<String>) -> Result<User, LedgerError> {
        self.validate_string_input("name", &name, 100)?;
        let wallet_address = wallet_address
            .as_deref()
            .map(str::parse::<WalletAddress>)
            .transpose()?;

        let user = User::new(name, wallet_address);
        let stored = user.clone();
        self.storage
            .transaction(move |state| {
                state.users.insert(stored.id, stored);
                Ok(())
            })
            .await?;

        info!(user_id = %user.id, has_wallet = user.wallet_address.is_some(), "user added");
        self.logging
            .log_action(
                USER_ADDED,
                json!({ "user_id": user.id, "name": user.name, "wallet_address": user.wallet_address }),
                None,
            )
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<User>, LedgerError> {
        self.storage.get_user(user_id).await
    }

    pub async fn create_group(&self, name: String, member_ids: Vec<UserId>) -> Result<Group, LedgerError> {
        self.validate_string_input("name", &name, 100)?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = member_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(LedgerError::AlreadyGroupMember(duplicate.to_string()));
        }

        let group = Group {
            id: GroupId::new(),
            name,
            member_ids,
        };
        let stored = group.clone();
        self.storage
            .transaction(move |state| {
                if let Some(missing) = stored.member_ids.iter().find(|id| !state.users.contains_key(id)) {
                    return Err(LedgerError::UserNotFound(missing.to_string()));
                }
                state.groups.insert(stored.id, stored);
                Ok(())
            })
            .await?;

        info!(group_id = %group.id, members = group.member_ids.len(), "group created");
        self.logging
            .log_action(
                GROUP_CREATED,
                json!({ "group_id": group.id, "name": group.name, "member_ids": group.member_ids }),
                None,
            )
            .await?;
        Ok(group)
    }

    pub async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>, LedgerError> {
        self.storage.get_group(group_id).await
    }

    // EXPENSES

    /// Persists the expense and its splits and reconciles them in one transaction.
    pub async fn add_expense(&self, new: NewExpense) -> Result<Expense, LedgerError> {
        self.validate_string_input("description", &new.description, 255)?;
        self.validate_amount_input("amount", new.amount)?;
        if new.splits.is_empty() {
            return Err(LedgerError::InvalidSplit);
        }
        for split in &new.splits {
            self.validate_amount_input("splits.amount", split.amount)?;
        }
        let share_sum: Decimal = new.splits.iter().map(|s| s.amount).sum();
        if (share_sum - new.amount).abs() > EPSILON {
            warn!(%share_sum, amount = %new.amount, "split amounts do not add up");
            return Err(LedgerError::InvalidSplit);
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = new.splits.iter().find(|s| !seen.insert(s.user_id)) {
            return Err(LedgerError::InvalidSplitUser(duplicate.user_id.to_string()));
        }

        let expense = Expense {
            id: ExpenseId::new(),
            group_id: new.group_id,
            paid_by: new.paid_by,
            amount: new.amount,
            description: new.description,
            splits: new.splits,
            created_at: Utc::now(),
        };
        let stored = expense.clone();
        self.storage
            .transaction(move |state| {
                let group = state
                    .groups
                    .get(&stored.group_id)
                    .ok_or_else(|| LedgerError::GroupNotFound(stored.group_id.to_string()))?;
                if !group.is_member(stored.paid_by) {
                    return Err(LedgerError::NotGroupMember(stored.paid_by.to_string()));
                }
                if let Some(outsider) = stored.splits.iter().find(|s| !group.is_member(s.user_id)) {
                    return Err(LedgerError::InvalidSplitUser(outsider.user_id.to_string()));
                }

                reconcile_expense(&mut state.graph, &stored)?;
                state.graph.check_invariants()?;
                state.expenses.insert(stored.id, stored);
                Ok(())
            })
            .await?;

        info!(expense_id = %expense.id, group_id = %expense.group_id, amount = %expense.amount, "expense added");
        self.logging
            .log_action(
                EXPENSE_ADDED,
                json!({
                    "expense_id": expense.id,
                    "group_id": expense.group_id,
                    "paid_by": expense.paid_by,
                    "amount": expense.amount,
                    "description": expense.description
                }),
                Some(&expense.paid_by.to_string()),
            )
            .await?;
        Ok(expense)
    }

    pub async fn get_expense(&self, expense_id: ExpenseId) -> Result<Option<Expense>, LedgerError> {
        self.storage.get_expense(expense_id).await
    }

    // PAYMENTS

    /// Creates a pending payment. In-app payments are confirmed in the same
    /// transaction and their settlement job is enqueued right away.
    pub async fn create_payment(&self, new: NewPayment) -> Result<Payment, LedgerError> {
        self.validate_amount_input("amount", new.amount)?;
        if new.from_user_id == new.to_user_id {
            return Err(LedgerError::SelfPayment);
        }

        let mut payment = Payment {
            id: PaymentId::new(),
            from_user_id: new.from_user_id,
            to_user_id: new.to_user_id,
            amount: new.amount,
            method: new.method,
            status: PaymentStatus::Pending,
            group_id: new.group_id,
            created_at: Utc::now(),
            resolved_at: None,
        };

        let payment = self
            .storage
            .transaction(move |state| {
                for user_id in [payment.from_user_id, payment.to_user_id] {
                    if !state.users.contains_key(&user_id) {
                        return Err(LedgerError::UserNotFound(user_id.to_string()));
                    }
                }
                if let Some(group_id) = payment.group_id {
                    let group = state
                        .groups
                        .get(&group_id)
                        .ok_or_else(|| LedgerError::GroupNotFound(group_id.to_string()))?;
                    if let Some(outsider) = [payment.from_user_id, payment.to_user_id]
                        .into_iter()
                        .find(|id| !group.is_member(*id))
                    {
                        return Err(LedgerError::NotGroupMember(outsider.to_string()));
                    }
                }

                if payment.method == PaymentMethod::InApp {
                    if let Transition::Applied(status) = payment.apply(PaymentEvent::Confirm) {
                        on_transition(state, &payment, status)?;
                    }
                }
                state.payments.insert(payment.id, payment.clone());
                Ok(payment)
            })
            .await?;

        info!(
            payment_id = %payment.id,
            method = ?payment.method,
            status = %payment.status,
            amount = %payment.amount,
            "payment created"
        );
        self.logging
            .log_action(
                PAYMENT_CREATED,
                json!({
                    "payment_id": payment.id,
                    "from_user_id": payment.from_user_id,
                    "to_user_id": payment.to_user_id,
                    "amount": payment.amount,
                    "method": payment.method
                }),
                Some(&payment.from_user_id.to_string()),
            )
            .await?;
        if payment.status == PaymentStatus::Confirmed {
            self.after_confirm(&payment).await?;
        }
        Ok(payment)
    }

    /// Confirms a pending payment. A terminal payment is returned unchanged.
    pub async fn confirm_payment(&self, payment_id: PaymentId) -> Result<Payment, LedgerError> {
        let (payment, transition) = self.transition(payment_id, PaymentEvent::Confirm).await?;
        if let Transition::Applied(_) = transition {
            self.after_confirm(&payment).await?;
        }
        Ok(payment)
    }

    /// Rejects a pending payment. No ledger or settlement effect.
    pub async fn reject_payment(&self, payment_id: PaymentId) -> Result<Payment, LedgerError> {
        let (payment, transition) = self.transition(payment_id, PaymentEvent::Reject).await?;
        if let Transition::Applied(_) = transition {
            info!(%payment_id, "payment rejected");
            self.logging
                .log_action(
                    PAYMENT_REJECTED,
                    json!({ "payment_id": payment.id }),
                    Some(&payment.to_user_id.to_string()),
                )
                .await?;
        }
        Ok(payment)
    }

    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>, LedgerError> {
        self.storage.get_payment(payment_id).await
    }

    async fn transition(
        &self,
        payment_id: PaymentId,
        event: PaymentEvent,
    ) -> Result<(Payment, Transition), LedgerError> {
        let (payment, transition) = self
            .storage
            .transaction(move |state| {
                let mut payment = state
                    .payments
                    .get(&payment_id)
                    .cloned()
                    .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.to_string()))?;
                let transition = payment.apply(event);
                if let Transition::Applied(status) = transition {
                    on_transition(state, &payment, status)?;
                    state.payments.insert(payment.id, payment.clone());
                }
                Ok((payment, transition))
            })
            .await?;

        if let Transition::Unchanged(status) = transition {
            debug!(%payment_id, %status, ?event, "payment already terminal, request ignored");
        }
        Ok((payment, transition))
    }

    async fn after_confirm(&self, payment: &Payment) -> Result<(), LedgerError> {
        info!(payment_id = %payment.id, "payment confirmed");
        if let Err(e) = self.queue.enqueue(payment.id) {
            // The record stays queued and can be requeued by an operator.
            error!(payment_id = %payment.id, error = %e, "failed to enqueue settlement job");
        }
        self.logging
            .log_action(
                PAYMENT_CONFIRMED,
                json!({ "payment_id": payment.id, "amount": payment.amount }),
                Some(&payment.to_user_id.to_string()),
            )
            .await
    }

    // BALANCES AND SIMPLIFICATION

    /// Every edge whose endpoints are both in `member_ids`.
    pub async fn get_balances(&self, member_ids: &[UserId]) -> Result<Vec<BalanceEdge>, LedgerError> {
        let members: BTreeSet<UserId> = member_ids.iter().copied().collect();
        self.storage.get_balances(members).await
    }

    pub async fn get_group_balances(&self, group_id: GroupId) -> Result<Vec<BalanceEdge>, LedgerError> {
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| LedgerError::GroupNotFound(group_id.to_string()))?;
        self.get_balances(&group.member_ids).await
    }

    /// Net positions of every user with a non-zero balance.
    pub async fn net_positions(&self) -> Result<BTreeMap<UserId, Decimal>, LedgerError> {
        self.storage
            .read(|state| {
                crate::core::simplifier::net_positions(state.graph.edges())
                    .into_iter()
                    .filter(|(_, net)| net.abs() >= EPSILON)
                    .collect()
            })
            .await
    }

    /// Collapses the graph (or one group's part of it) to a minimal edge set.
    pub async fn simplify(&self, scope: SimplifyScope) -> Result<SimplifyReport, LedgerError> {
        let report = self
            .storage
            .transaction(move |state| match scope {
                SimplifyScope::Global => simplify_global(&mut state.graph),
                SimplifyScope::Group(group_id) => simplify_group(state, group_id),
            })
            .await?;

        info!(
            scope = ?report.scope,
            edges_before = report.edges_before,
            edges_after = report.edges_after,
            "debts simplified"
        );
        self.logging
            .log_action(
                DEBTS_SIMPLIFIED,
                json!({
                    "scope": report.scope,
                    "edges_before": report.edges_before,
                    "edges_after": report.edges_after
                }),
                None,
            )
            .await?;
        Ok(report)
    }

    // SETTLEMENT

    pub async fn settlement_record(&self, payment_id: PaymentId) -> Result<Option<SettlementRecord>, LedgerError> {
        self.storage.get_settlement_record(payment_id).await
    }

    pub async fn dead_letters(&self) -> Result<Vec<SettlementRecord>, LedgerError> {
        self.storage.read(LedgerState::dead_letters).await
    }

    /// Puts a skipped or dead-lettered settlement back on the queue with a
    /// fresh attempt budget. Recorded settlements are returned unchanged.
    pub async fn requeue_settlement(&self, payment_id: PaymentId) -> Result<SettlementRecord, LedgerError> {
        let (record, requeued) = self
            .storage
            .transaction(move |state| {
                let record = state
                    .settlements
                    .get_mut(&payment_id)
                    .ok_or_else(|| LedgerError::PaymentNotFound(payment_id.to_string()))?;
                if record.status == SettlementStatus::Recorded {
                    return Ok((record.clone(), false));
                }
                record.status = SettlementStatus::Queued;
                record.attempts = 0;
                record.updated_at = Utc::now();
                Ok((record.clone(), true))
            })
            .await?;

        if requeued {
            self.queue.enqueue(payment_id)?;
            info!(%payment_id, "settlement requeued");
            self.logging
                .log_action(SETTLEMENT_REQUEUED, json!({ "payment_id": payment_id }), None)
                .await?;
        }
        Ok(record)
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, LedgerError> {
        self.logging.get_logs().await
    }
}

/// Ledger side effects of a payment entering `status`. Runs inside the
/// transaction that persists the transition.
fn on_transition(state: &mut LedgerState, payment: &Payment, status: PaymentStatus) -> Result<(), LedgerError> {
    if status == PaymentStatus::Confirmed {
        reconcile_payment(&mut state.graph, payment)?;
        state.graph.check_invariants()?;
        state
            .settlements
            .insert(payment.id, SettlementRecord::queued(payment.id));
    }
    Ok(())
}

fn simplify_group(state: &mut LedgerState, group_id: GroupId) -> Result<SimplifyReport, LedgerError> {
    let group = state
        .groups
        .get(&group_id)
        .ok_or_else(|| LedgerError::GroupNotFound(group_id.to_string()))?;
    let members: BTreeSet<UserId> = group.member_ids.iter().copied().collect();
    let expected = scope_net_positions(state.group_expenses(group_id), state.group_payments(group_id));
    simplify_members(&mut state.graph, SimplifyScope::Group(group_id), &members, &expected)
}
