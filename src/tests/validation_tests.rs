use super::{add_users, create_group, create_test_service, expense};
use crate::core::constants::{EXPENSE_ADDED, GROUP_CREATED, USER_ADDED};
use crate::core::errors::LedgerError;
use crate::core::models::{GroupId, UserId};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_add_user_parses_wallet() {
    let ledger = create_test_service();
    let user = ledger
        .service
        .add_user("Alice".to_string(), Some("0xAbCd000000000000000000000000000000000001".to_string()))
        .await
        .unwrap();

    let wallet = user.wallet_address.unwrap();
    assert_eq!(wallet.to_string(), "0xabcd000000000000000000000000000000000001");
    assert_eq!(ledger.service.get_user(user.id).await.unwrap(), Some(user));
    assert_eq!(ledger.logging.actions().await, vec![USER_ADDED.to_string()]);
}

#[tokio::test]
async fn test_add_user_rejects_bad_input() {
    let ledger = create_test_service();

    let err = ledger.service.add_user("  ".to_string(), None).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(field, _) if field == "name"));

    for bad in ["abcd", "0x1234", "0xzz00000000000000000000000000000000000001"] {
        let err = ledger
            .service
            .add_user("Bob".to_string(), Some(bad.to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidWalletAddress(bad.to_string()));
    }
}

#[tokio::test]
async fn test_create_group_validates_members() {
    let ledger = create_test_service();
    let users = add_users(&ledger, 2).await;

    let err = ledger
        .service
        .create_group("Trip".to_string(), vec![users[0].id, UserId::new()])
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UserNotFound(_)));

    let err = ledger
        .service
        .create_group("Trip".to_string(), vec![users[0].id, users[0].id])
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::AlreadyGroupMember(users[0].id.to_string()));

    let group = create_group(&ledger, &[&users[0], &users[1]]).await;
    assert_eq!(ledger.service.get_group(group.id).await.unwrap(), Some(group));
    assert!(ledger.logging.actions().await.contains(&GROUP_CREATED.to_string()));
}

#[tokio::test]
async fn test_expense_split_must_add_up() {
    let ledger = create_test_service();
    let users = add_users(&ledger, 3).await;
    let group = create_group(&ledger, &[&users[0], &users[1], &users[2]]).await;

    let err = ledger
        .service
        .add_expense(expense(&group, &users[0], dec!(30), &[(&users[1], dec!(10)), (&users[2], dec!(10))]))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::InvalidSplit);

    let err = ledger
        .service
        .add_expense(expense(&group, &users[0], dec!(30), &[]))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::InvalidSplit);

    // Rounding within a cent is accepted.
    ledger
        .service
        .add_expense(expense(
            &group,
            &users[0],
            dec!(10),
            &[(&users[0], dec!(3.33)), (&users[1], dec!(3.33)), (&users[2], dec!(3.33))],
        ))
        .await
        .unwrap();
    assert!(ledger.logging.actions().await.contains(&EXPENSE_ADDED.to_string()));
}

#[tokio::test]
async fn test_expense_amount_bounds() {
    let ledger = create_test_service();
    let users = add_users(&ledger, 2).await;
    let group = create_group(&ledger, &[&users[0], &users[1]]).await;

    for amount in [dec!(0), dec!(-5), dec!(1000000.01), dec!(1.005)] {
        let err = ledger
            .service
            .add_expense(expense(&group, &users[0], amount, &[(&users[1], amount)]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(field, _) if field == "amount"));
    }
}

#[tokio::test]
async fn test_expense_participants_must_be_members() {
    let ledger = create_test_service();
    let users = add_users(&ledger, 3).await;
    let group = create_group(&ledger, &[&users[0], &users[1]]).await;

    let err = ledger
        .service
        .add_expense(expense(&group, &users[2], dec!(10), &[(&users[0], dec!(10))]))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::NotGroupMember(users[2].id.to_string()));

    let err = ledger
        .service
        .add_expense(expense(&group, &users[0], dec!(10), &[(&users[2], dec!(10))]))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::InvalidSplitUser(users[2].id.to_string()));

    let err = ledger
        .service
        .add_expense(expense(
            &group,
            &users[0],
            dec!(10),
            &[(&users[1], dec!(5)), (&users[1], dec!(5))],
        ))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::InvalidSplitUser(users[1].id.to_string()));

    let mut unknown = expense(&group, &users[0], dec!(10), &[(&users[1], dec!(10))]);
    unknown.group_id = GroupId::new();
    let err = ledger.service.add_expense(unknown).await.unwrap_err();
    assert!(matches!(err, LedgerError::GroupNotFound(_)));

    assert!(ledger.service.get_group_balances(group.id).await.unwrap().is_empty());
}
