//! Property-based tests for the balance graph and debt netting.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use settlemint::core::constants::EPSILON;
use settlemint::core::graph::BalanceGraph;
use settlemint::core::models::{
    Expense, ExpenseId, ExpenseSplit, GroupId, Payment, PaymentId, PaymentMethod, PaymentStatus, UserId,
};
use settlemint::core::reconciler::{reconcile_expense, reconcile_payment};
use settlemint::core::simplifier::{net_positions, settle, simplify_global};
use std::collections::BTreeMap;
use uuid::Uuid;

const USERS: u128 = 6;

fn user(n: u128) -> UserId {
    UserId::from(Uuid::from_u128(n + 1))
}

/// Positive amount in cents, 0.01 to 1000.00.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Debt of one user toward another, applied on top of the pair's current net.
fn arb_debt() -> impl Strategy<Value = (u128, u128, Decimal)> {
    (0..USERS, 0..USERS, arb_amount()).prop_filter("no self debt", |(a, b, _)| a != b)
}

fn build_graph(debts: &[(u128, u128, Decimal)]) -> BalanceGraph {
    let mut graph = BalanceGraph::new();
    for (a, b, amount) in debts {
        let (a, b) = (user(*a), user(*b));
        let current = graph.net_debt(a, b);
        graph.set_net(a, b, current + amount).unwrap();
    }
    graph
}

#[derive(Clone, Debug)]
enum Reconciliation {
    Expense { payer: u128, shares: BTreeMap<u128, Decimal> },
    Payment { from: u128, to: u128, amount: Decimal },
}

fn arb_reconciliation() -> impl Strategy<Value = Reconciliation> {
    prop_oneof![
        (0..USERS, prop::collection::btree_map(0..USERS, arb_amount(), 1..(USERS as usize)))
            .prop_map(|(payer, shares)| Reconciliation::Expense { payer, shares }),
        arb_debt().prop_map(|(from, to, amount)| Reconciliation::Payment { from, to, amount }),
    ]
}

fn apply(graph: &mut BalanceGraph, step: &Reconciliation) {
    match step {
        Reconciliation::Expense { payer, shares } => {
            let splits: Vec<ExpenseSplit> = shares
                .iter()
                .map(|(n, amount)| ExpenseSplit { user_id: user(*n), amount: *amount })
                .collect();
            let expense = Expense {
                id: ExpenseId::new(),
                group_id: GroupId::new(),
                paid_by: user(*payer),
                amount: splits.iter().map(|s| s.amount).sum(),
                description: "generated".to_string(),
                splits,
                created_at: Utc::now(),
            };
            reconcile_expense(graph, &expense).unwrap();
        }
        Reconciliation::Payment { from, to, amount } => {
            let payment = Payment {
                id: PaymentId::new(),
                from_user_id: user(*from),
                to_user_id: user(*to),
                amount: *amount,
                method: PaymentMethod::InApp,
                status: PaymentStatus::Confirmed,
                group_id: None,
                created_at: Utc::now(),
                resolved_at: Some(Utc::now()),
            };
            reconcile_payment(graph, &payment).unwrap();
        }
    }
}

fn non_zero(nets: BTreeMap<UserId, Decimal>) -> BTreeMap<UserId, Decimal> {
    nets.into_iter().filter(|(_, net)| net.abs() >= EPSILON).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Nets always sum to zero and every edge respects the structural invariants.
    #[test]
    fn graph_invariants_hold(debts in prop::collection::vec(arb_debt(), 0..40)) {
        let graph = build_graph(&debts);

        prop_assert!(graph.check_invariants().is_ok());
        let total: Decimal = net_positions(graph.edges()).values().copied().sum();
        prop_assert_eq!(total, Decimal::ZERO);
    }

    /// Any interleaving of expenses and confirmed payments conserves value and
    /// keeps the graph well formed after every step.
    #[test]
    fn reconciliation_conserves_value(steps in prop::collection::vec(arb_reconciliation(), 1..40)) {
        let mut graph = BalanceGraph::new();
        for step in &steps {
            apply(&mut graph, step);

            prop_assert!(graph.check_invariants().is_ok());
            let total: Decimal = net_positions(graph.edges()).values().copied().sum();
            prop_assert_eq!(total, Decimal::ZERO);
        }
    }

    /// Simplification keeps every user's net and leaves nobody on both sides.
    #[test]
    fn simplify_preserves_nets(debts in prop::collection::vec(arb_debt(), 0..40)) {
        let mut graph = build_graph(&debts);
        let before = non_zero(net_positions(graph.edges()));

        let report = simplify_global(&mut graph).unwrap();
        let after = non_zero(net_positions(graph.edges()));

        prop_assert_eq!(&before, &after);
        prop_assert!(graph.check_invariants().is_ok());
        prop_assert_eq!(report.edges_after, graph.len());
        for edge in graph.edges() {
            prop_assert!(!graph.edges().any(|other| other.creditor == edge.debtor));
        }
    }

    /// Greedy netting never needs more edges than non-zero users minus one.
    #[test]
    fn simplify_is_bounded(debts in prop::collection::vec(arb_debt(), 0..40)) {
        let mut graph = build_graph(&debts);
        let holders = non_zero(net_positions(graph.edges())).len();

        simplify_global(&mut graph).unwrap();
        prop_assert!(graph.len() <= holders.saturating_sub(1));
    }

    /// Simplifying twice gives the same graph as simplifying once.
    #[test]
    fn simplify_is_stable(debts in prop::collection::vec(arb_debt(), 0..40)) {
        let mut graph = build_graph(&debts);
        simplify_global(&mut graph).unwrap();
        let once: Vec<_> = graph.edges().cloned().collect();

        simplify_global(&mut graph).unwrap();
        let twice: Vec<_> = graph.edges().cloned().collect();
        prop_assert_eq!(once, twice);
    }

    /// The plan for a set of nets reproduces exactly those nets.
    #[test]
    fn settle_reproduces_nets(debts in prop::collection::vec(arb_debt(), 0..40)) {
        let graph = build_graph(&debts);
        let nets = non_zero(net_positions(graph.edges()));

        let plan = settle(&nets);
        prop_assert!(plan.iter().all(|e| e.amount >= EPSILON && e.debtor != e.creditor));
        prop_assert_eq!(non_zero(net_positions(&plan)), nets);
    }

    /// An expense moves exactly the non-payer shares toward the payer.
    #[test]
    fn expense_credits_payer(
        payer in 0..USERS,
        shares in prop::collection::btree_map(0..USERS, arb_amount(), 1..(USERS as usize)),
    ) {
        let paid_by = user(payer);
        let splits: Vec<ExpenseSplit> = shares
            .iter()
            .map(|(n, amount)| ExpenseSplit { user_id: user(*n), amount: *amount })
            .collect();
        let expense = Expense {
            id: ExpenseId::new(),
            group_id: GroupId::new(),
            paid_by,
            amount: splits.iter().map(|s| s.amount).sum(),
            description: "generated".to_string(),
            splits,
            created_at: Utc::now(),
        };

        let mut graph = BalanceGraph::new();
        reconcile_expense(&mut graph, &expense).unwrap();

        let owed: Decimal = expense
            .splits
            .iter()
            .filter(|s| s.user_id != paid_by)
            .map(|s| s.amount)
            .sum();
        let nets = net_positions(graph.edges());
        prop_assert_eq!(nets.get(&paid_by).copied().unwrap_or_default(), owed);
        prop_assert!(graph.edges().all(|e| e.creditor == paid_by));
    }
}
