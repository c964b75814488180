//! Directed-debt graph.
//!
//! Edges are keyed by the unordered user pair, so a pair can never hold two
//! edges. `set_net` is the only mutation path and keeps every stored amount
//! at or above `EPSILON`.

use crate::core::constants::EPSILON;
use crate::core::errors::LedgerError;
use crate::core::models::{BalanceEdge, UserId};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, trace};

#[derive(Clone, Debug, Default)]
pub struct BalanceGraph {
    edges: BTreeMap<(UserId, UserId), BalanceEdge>,
}

fn pair_key(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl BalanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edge for the unordered pair, in whichever direction it currently holds.
    pub fn get(&self, a: UserId, b: UserId) -> Option<&BalanceEdge> {
        self.edges.get(&pair_key(a, b))
    }

    /// Signed debt of `a` toward `b`: positive when `a` owes `b`.
    pub fn net_debt(&self, a: UserId, b: UserId) -> Decimal {
        match self.get(a, b) {
            Some(edge) if edge.debtor == a => edge.amount,
            Some(edge) => -edge.amount,
            None => Decimal::ZERO,
        }
    }

    /// Sets the debt of `a` toward `b` to `signed_amount`, replacing whatever
    /// edge the pair held before.
    pub fn set_net(&mut self, a: UserId, b: UserId, signed_amount: Decimal) -> Result<(), LedgerError> {
        if a == b {
            error!(user_id = %a, "refusing to write a self edge");
            return Err(LedgerError::InvariantViolation(format!("self edge for user {}", a)));
        }

        let key = pair_key(a, b);
        self.edges.remove(&key);

        if signed_amount.abs() < EPSILON {
            trace!(%a, %b, "pair settled, edge removed");
            return Ok(());
        }

        let (debtor, creditor) = if signed_amount > Decimal::ZERO { (a, b) } else { (b, a) };
        self.edges.insert(
            key,
            BalanceEdge {
                debtor,
                creditor,
                amount: signed_amount.abs(),
            },
        );
        trace!(%debtor, %creditor, amount = %signed_amount.abs(), "edge written");
        Ok(())
    }

    pub fn edges(&self) -> impl Iterator<Item = &BalanceEdge> {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges whose endpoints both belong to `members`.
    pub fn edges_within(&self, members: &BTreeSet<UserId>) -> Vec<BalanceEdge> {
        self.edges
            .values()
            .filter(|e| members.contains(&e.debtor) && members.contains(&e.creditor))
            .cloned()
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.edges.clear();
    }

    pub(crate) fn clear_within(&mut self, members: &BTreeSet<UserId>) {
        self.edges
            .retain(|(a, b), _| !(members.contains(a) && members.contains(b)));
    }

    /// Re-checks the structural invariants of every stored edge.
    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        for (key, edge) in &self.edges {
            let violation = if edge.debtor == edge.creditor {
                Some(format!("self edge for user {}", edge.debtor))
            } else if pair_key(edge.debtor, edge.creditor) != *key {
                Some(format!("edge {} -> {} stored under the wrong pair", edge.debtor, edge.creditor))
            } else if edge.amount < EPSILON {
                Some(format!(
                    "non-positive amount {} on edge {} -> {}",
                    edge.amount, edge.debtor, edge.creditor
                ))
            } else {
                None
            };
            if let Some(message) = violation {
                error!(%message, "internal consistency error in balance graph");
                return Err(LedgerError::InvariantViolation(message));
            }
        }
        Ok(())
    }
}
