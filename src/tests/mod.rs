mod concurrency_tests;
mod validation_tests;

use crate::core::models::{BalanceEdge, ExpenseSplit, Group, NewExpense, User, UserId};
use crate::core::services::LedgerService;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use crate::settlement::{SettlementReceiver, settlement_queue};
use rust_decimal::Decimal;
use std::sync::Arc;

pub struct TestLedger {
    pub service: LedgerService<InMemoryLogging, InMemoryStorage>,
    pub storage: Arc<InMemoryStorage>,
    pub logging: Arc<InMemoryLogging>,
    pub jobs: SettlementReceiver,
}

pub fn create_test_service() -> TestLedger {
    let storage = Arc::new(InMemoryStorage::new());
    let logging = Arc::new(InMemoryLogging::new());
    let (queue, jobs) = settlement_queue();
    let service = LedgerService::new(storage.clone(), logging.clone(), queue);
    TestLedger {
        service,
        storage,
        logging,
        jobs,
    }
}

pub fn wallet(n: u64) -> String {
    format!("0x{:040x}", n)
}

/// Users named U1..Un, each with a distinct wallet.
pub async fn add_users(ledger: &TestLedger, n: usize) -> Vec<User> {
    let mut users = Vec::with_capacity(n);
    for i in 1..=n {
        let user = ledger
            .service
            .add_user(format!("U{}", i), Some(wallet(i as u64)))
            .await
            .unwrap();
        users.push(user);
    }
    users
}

pub async fn create_group(ledger: &TestLedger, members: &[&User]) -> Group {
    ledger
        .service
        .create_group("Trip".to_string(), members.iter().map(|u| u.id).collect())
        .await
        .unwrap()
}

pub fn expense(group: &Group, paid_by: &User, amount: Decimal, splits: &[(&User, Decimal)]) -> NewExpense {
    NewExpense {
        group_id: group.id,
        paid_by: paid_by.id,
        amount,
        description: "Dinner".to_string(),
        splits: splits
            .iter()
            .map(|(user, amount)| ExpenseSplit {
                user_id: user.id,
                amount: *amount,
            })
            .collect(),
    }
}

pub fn owed(edges: &[BalanceEdge], debtor: UserId, creditor: UserId) -> Option<Decimal> {
    edges
        .iter()
        .find(|e| e.debtor == debtor && e.creditor == creditor)
        .map(|e| e.amount)
}
