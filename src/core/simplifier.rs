//! Debt netting.
//!
//! Net positions are computed from a snapshot of the edges in scope, then the
//! scoped edges are replaced by a greedy largest-need-first settlement. The
//! rewrite happens on the caller's transaction copy of the graph, so it is
//! committed as a whole or not at all.

use crate::core::constants::EPSILON;
use crate::core::errors::LedgerError;
use crate::core::graph::BalanceGraph;
use crate::core::models::{BalanceEdge, Expense, GroupId, Payment, PaymentStatus, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "group_id", rename_all = "snake_case")]
pub enum SimplifyScope {
    #[default]
    Global,
    Group(GroupId),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimplifyReport {
    pub scope: SimplifyScope,
    pub edges_before: usize,
    pub edges_after: usize,
}

/// Credit minus debt for every user touching `edges`.
pub fn net_positions<'a>(edges: impl IntoIterator<Item = &'a BalanceEdge>) -> BTreeMap<UserId, Decimal> {
    let mut nets: BTreeMap<UserId, Decimal> = BTreeMap::new();
    for edge in edges {
        *nets.entry(edge.debtor).or_default() -= edge.amount;
        *nets.entry(edge.creditor).or_default() += edge.amount;
    }
    nets
}

/// Net positions implied by one scope's own history: its expenses and its
/// confirmed payments. Pending and rejected payments contribute nothing.
pub fn scope_net_positions<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
    payments: impl IntoIterator<Item = &'a Payment>,
) -> BTreeMap<UserId, Decimal> {
    let mut nets: BTreeMap<UserId, Decimal> = BTreeMap::new();
    for expense in expenses {
        for split in expense.splits.iter().filter(|s| s.user_id != expense.paid_by) {
            *nets.entry(expense.paid_by).or_default() += split.amount;
            *nets.entry(split.user_id).or_default() -= split.amount;
        }
    }
    for payment in payments.into_iter().filter(|p| p.status == PaymentStatus::Confirmed) {
        *nets.entry(payment.from_user_id).or_default() += payment.amount;
        *nets.entry(payment.to_user_id).or_default() -= payment.amount;
    }
    nets
}

/// Minimum-edge settlement reproducing `nets`.
///
/// Debtors are taken most negative first and creditors most positive first.
/// Equal nets are ordered by ascending user id so the result is reproducible.
pub fn settle(nets: &BTreeMap<UserId, Decimal>) -> Vec<BalanceEdge> {
    let mut debtors: Vec<(UserId, Decimal)> = nets
        .iter()
        .filter(|(_, net)| **net <= -EPSILON)
        .map(|(id, net)| (*id, *net))
        .collect();
    let mut creditors: Vec<(UserId, Decimal)> = nets
        .iter()
        .filter(|(_, net)| **net >= EPSILON)
        .map(|(id, net)| (*id, *net))
        .collect();

    debtors.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    creditors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut plan = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let (debtor, owed) = debtors[i];
        let (creditor, due) = creditors[j];
        let amount = owed.abs().min(due);

        if amount >= EPSILON {
            plan.push(BalanceEdge {
                debtor,
                creditor,
                amount,
            });
        }

        debtors[i].1 += amount;
        creditors[j].1 -= amount;

        if debtors[i].1.abs() < EPSILON {
            i += 1;
        }
        if creditors[j].1 < EPSILON {
            j += 1;
        }
    }

    if i < debtors.len() || j < creditors.len() {
        // Only reachable when the input nets do not sum to zero.
        warn!(
            debtors_left = debtors.len() - i,
            creditors_left = creditors.len() - j,
            "net positions were not balanced; settlement is partial"
        );
    }
    plan
}

fn apply(graph: &mut BalanceGraph, plan: &[BalanceEdge]) -> Result<(), LedgerError> {
    for edge in plan {
        let current = graph.net_debt(edge.debtor, edge.creditor);
        graph.set_net(edge.debtor, edge.creditor, current + edge.amount)?;
    }
    graph.check_invariants()
}

/// Rewrites the whole graph as the minimal settlement of its net positions.
pub fn simplify_global(graph: &mut BalanceGraph) -> Result<SimplifyReport, LedgerError> {
    let edges_before = graph.len();
    let nets = net_positions(graph.edges());
    let plan = settle(&nets);

    graph.clear();
    apply(graph, &plan)?;

    debug!(edges_before, edges_after = graph.len(), "global simplification applied");
    Ok(SimplifyReport {
        scope: SimplifyScope::Global,
        edges_before,
        edges_after: graph.len(),
    })
}

/// Rewrites the edges induced on `members`.
///
/// `expected` holds the scope's own net positions. If the induced edges do not
/// reproduce them, the pair edges carry debt from outside the scope and the
/// rewrite is refused.
pub fn simplify_members(
    graph: &mut BalanceGraph,
    scope: SimplifyScope,
    members: &BTreeSet<UserId>,
    expected: &BTreeMap<UserId, Decimal>,
) -> Result<SimplifyReport, LedgerError> {
    let induced = graph.edges_within(members);
    let nets = net_positions(&induced);

    for member in members {
        let actual = nets.get(member).copied().unwrap_or_default();
        let wanted = expected.get(member).copied().unwrap_or_default();
        if (actual - wanted).abs() >= EPSILON {
            warn!(user_id = %member, %actual, %wanted, "scoped net position disagrees with ledger edges");
            return Err(LedgerError::ScopeMismatch(format!(
                "user {} holds {} in the ledger but {} within the scope",
                member, actual, wanted
            )));
        }
    }
    if let Some(outsider) = expected
        .iter()
        .find(|(id, net)| !members.contains(id) && net.abs() >= EPSILON)
        .map(|(id, _)| id)
    {
        return Err(LedgerError::ScopeMismatch(format!(
            "user {} has scoped history but is not a member",
            outsider
        )));
    }

    let plan = settle(&nets);
    graph.clear_within(members);
    apply(graph, &plan)?;

    let edges_after = graph.edges_within(members).len();
    debug!(edges_before = induced.len(), edges_after, "scoped simplification applied");
    Ok(SimplifyReport {
        scope,
        edges_before: induced.len(),
        edges_after,
    })
}
