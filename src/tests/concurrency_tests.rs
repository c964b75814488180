use super::{add_users, create_group, create_test_service, expense, owed};
use crate::core::models::{NewPayment, PaymentMethod};
use crate::core::scheduler::SimplifyScheduler;
use futures::future::join_all;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_updates_on_one_pair_are_not_lost() {
    let ledger = create_test_service();
    let users = add_users(&ledger, 2).await;
    let (u1, u2) = (users[0].clone(), users[1].clone());
    let group = create_group(&ledger, &[&u1, &u2]).await;
    let service = Arc::new(ledger.service);

    let mut pending = Vec::new();
    for _ in 0..10 {
        let payment = service
            .create_payment(NewPayment {
                from_user_id: u2.id,
                to_user_id: u1.id,
                amount: dec!(1.00),
                method: PaymentMethod::Manual,
                group_id: Some(group.id),
            })
            .await
            .unwrap();
        pending.push(payment.id);
    }

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        let new = expense(&group, &u1, dec!(2.00), &[(&u2, dec!(2.00))]);
        tasks.push(tokio::spawn(async move { service.add_expense(new).await.map(|_| ()) }));
    }
    for payment_id in pending {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service.confirm_payment(payment_id).await.map(|_| ())
        }));
    }
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let edges = service.get_group_balances(group.id).await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(owed(&edges, u2.id, u1.id), Some(dec!(90)));
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_simplifies_until_shutdown() {
    let ledger = create_test_service();
    let users = add_users(&ledger, 3).await;
    let (u1, u2, u3) = (&users[0], &users[1], &users[2]);
    let group = create_group(&ledger, &[u1, u2, u3]).await;
    ledger
        .service
        .add_expense(expense(&group, u1, dec!(30), &[(u2, dec!(30))]))
        .await
        .unwrap();
    ledger
        .service
        .add_expense(expense(&group, u2, dec!(30), &[(u3, dec!(30))]))
        .await
        .unwrap();

    let service = Arc::new(ledger.service);
    let (stop, shutdown) = watch::channel(false);
    let handle = SimplifyScheduler::new(service.clone(), Duration::from_secs(60)).start(shutdown);

    // Nothing runs before the first full period.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(service.get_group_balances(group.id).await.unwrap().len(), 2);

    tokio::time::sleep(Duration::from_secs(31)).await;
    let edges = service.get_group_balances(group.id).await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(owed(&edges, u3.id, u1.id), Some(dec!(30)));

    stop.send(true).unwrap();
    handle.await.unwrap();
}
