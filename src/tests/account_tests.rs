//! tests/account_tests.rs

use rust_decimal::Decimal;

use crate::errors::DomainError;
use crate::models::account_model::{
    days_to_target, goal_progress, CreateSubAccountRequest, MainAccountTransferRequest,
    MainTransferKind, SubAccountKind, SubAccountTransferRequest,
};
use crate::tests::{account_balance_cents, create_user, dec, domain_error, notifications_of, setup};

fn sub_request(account_id: Option<i64>, kind: SubAccountKind, initial: i64) -> CreateSubAccountRequest {
    CreateSubAccountRequest {
        name: format!("Sub {}", kind.as_str()),
        description: None,
        kind: Some(kind),
        color: None,
        account_id,
        independent: None,
        initial_balance: Some(Decimal::from(initial)),
        target_amount: None,
        target_date: None,
    }
}

#[test]
fn goal_progress_and_days_to_target() {
    use chrono::NaiveDate;

    assert_eq!(goal_progress(dec("50"), Some(dec("200"))), 25.0);
    assert_eq!(goal_progress(dec("500"), Some(dec("200"))), 100.0);
    assert_eq!(goal_progress(dec("50"), None), 0.0);
    assert_eq!(goal_progress(dec("50"), Some(Decimal::ZERO)), 0.0);

    let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    assert_eq!(days_to_target(None, today), None);
    assert_eq!(days_to_target(NaiveDate::from_ymd_opt(2025, 3, 1), today), Some(0));
    assert_eq!(days_to_target(NaiveDate::from_ymd_opt(2025, 3, 20), today), Some(10));
}

#[test]
fn business_kinds() {
    let business: Vec<_> = SubAccountKind::ALL.iter().filter(|k| k.is_business()).collect();
    assert_eq!(business.len(), 9);
    assert!(SubAccountKind::Consultoria.is_business());
    assert!(!SubAccountKind::Emergencia.is_business());
    assert_eq!(SubAccountKind::parse("no_existe"), SubAccountKind::Otros);
}

#[actix_rt::test]
async fn linked_sub_account_reduces_available_balance() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 1000).await;

    let sub = ctx
        .accounts
        .create_sub_account(user_id, sub_request(Some(account_id), SubAccountKind::TiendaOnline, 300))
        .await
        .expect("create_sub_account");

    assert!(sub.is_business);
    assert!(!sub.is_independent);
    assert_eq!(sub.color, "#1E40AF");
    assert_eq!(sub.balance, dec("300.00"));

    let available = ctx
        .accounts
        .available_balance(user_id, account_id)
        .await
        .expect("available_balance");
    assert_eq!(available, dec("700.00"));
    // El saldo principal no cambia
    assert_eq!(account_balance_cents(&ctx, account_id).await, 100_000);

    let err = ctx
        .accounts
        .create_sub_account(user_id, sub_request(Some(account_id), SubAccountKind::Viajes, 701))
        .await
        .expect_err("excede disponible");
    assert!(matches!(domain_error(&err), DomainError::InsufficientFunds { .. }));
}

#[actix_rt::test]
async fn sub_account_needs_account_or_owner() {
    let ctx = setup().await;
    let (user_id, _) = create_user(&ctx, "ana@correo.pe", 100).await;

    let err = ctx
        .accounts
        .create_sub_account(user_id, sub_request(None, SubAccountKind::Otros, 0))
        .await
        .expect_err("sin cuenta ni propietario");
    assert!(matches!(domain_error(&err), DomainError::Validation(_)));

    let mut independent = sub_request(None, SubAccountKind::Emergencia, 0);
    independent.independent = Some(true);
    independent.color = Some("#3B82F6".to_string());
    let sub = ctx
        .accounts
        .create_sub_account(user_id, independent)
        .await
        .expect("independiente");
    assert!(sub.is_independent);
    assert_eq!(sub.owner_id, Some(user_id));
    assert_eq!(sub.color, "#ff6b6b");
}

#[actix_rt::test]
async fn foreign_account_is_not_found() {
    let ctx = setup().await;
    let (_, account_a) = create_user(&ctx, "ana@correo.pe", 100).await;
    let (user_b, _) = create_user(&ctx, "luis@correo.pe", 100).await;

    let err = ctx
        .accounts
        .create_sub_account(user_b, sub_request(Some(account_a), SubAccountKind::Otros, 0))
        .await
        .expect_err("cuenta ajena");
    assert!(matches!(domain_error(&err), DomainError::NotFound("Cuenta")));
}

#[actix_rt::test]
async fn transfer_between_sub_accounts_moves_balance() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 1000).await;
    let from = ctx
        .accounts
        .create_sub_account(user_id, sub_request(Some(account_id), SubAccountKind::AhorroMeta, 400))
        .await
        .expect("from");
    let to = ctx
        .accounts
        .create_sub_account(user_id, sub_request(Some(account_id), SubAccountKind::Viajes, 0))
        .await
        .expect("to");

    let receipt = ctx
        .accounts
        .transfer_between_sub_accounts(
            user_id,
            SubAccountTransferRequest {
                from_id: from.id,
                to_id: to.id,
                amount: dec("150"),
                description: Some("Vacaciones".to_string()),
            },
        )
        .await
        .expect("transferencia");

    assert_eq!(receipt.source_balance, dec("250.00"));
    assert_eq!(receipt.target_balance, dec("150.00"));

    let transfers = notifications_of(&ctx, user_id, "transfer_made").await;
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].extra_data["amount"], "150.00");

    let too_much = ctx
        .accounts
        .transfer_between_sub_accounts(
            user_id,
            SubAccountTransferRequest {
                from_id: from.id,
                to_id: to.id,
                amount: dec("1000"),
                description: None,
            },
        )
        .await
        .expect_err("saldo insuficiente");
    assert!(matches!(domain_error(&too_much), DomainError::InsufficientFunds { .. }));

    let same = ctx
        .accounts
        .transfer_between_sub_accounts(
            user_id,
            SubAccountTransferRequest {
                from_id: from.id,
                to_id: from.id,
                amount: dec("1"),
                description: None,
            },
        )
        .await
        .expect_err("misma subcuenta");
    assert!(matches!(domain_error(&same), DomainError::Validation(_)));

    // El fallo no dejó cambios a medias
    let after = ctx.accounts.get_sub_account(user_id, from.id).await.expect("from");
    assert_eq!(after.balance, dec("250.00"));
}

#[actix_rt::test]
async fn main_transfer_linked_and_independent() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 1000).await;

    let linked = ctx
        .accounts
        .create_sub_account(user_id, sub_request(Some(account_id), SubAccountKind::Salud, 0))
        .await
        .expect("linked");
    let withdrawal = MainAccountTransferRequest {
        account_id: None,
        kind: MainTransferKind::Withdrawal,
        amount: dec("200"),
        description: None,
    };
    ctx.accounts
        .transfer_with_main_account(user_id, linked.id, withdrawal)
        .await
        .expect("withdrawal vinculada");

    assert_eq!(account_balance_cents(&ctx, account_id).await, 100_000);
    let available = ctx.accounts.available_balance(user_id, account_id).await.expect("available");
    assert_eq!(available, dec("800.00"));

    let mut independent = sub_request(None, SubAccountKind::Inversion, 0);
    independent.independent = Some(true);
    let independent = ctx
        .accounts
        .create_sub_account(user_id, independent)
        .await
        .expect("independiente");

    ctx.accounts
        .transfer_with_main_account(
            user_id,
            independent.id,
            MainAccountTransferRequest {
                account_id: Some(account_id),
                kind: MainTransferKind::Withdrawal,
                amount: dec("300"),
                description: None,
            },
        )
        .await
        .expect("withdrawal independiente");
    assert_eq!(account_balance_cents(&ctx, account_id).await, 70_000);

    ctx.accounts
        .transfer_with_main_account(
            user_id,
            independent.id,
            MainAccountTransferRequest {
                account_id: Some(account_id),
                kind: MainTransferKind::Deposit,
                amount: dec("100"),
                description: None,
            },
        )
        .await
        .expect("deposit independiente");
    assert_eq!(account_balance_cents(&ctx, account_id).await, 80_000);

    let sub = ctx
        .accounts
        .get_sub_account(user_id, independent.id)
        .await
        .expect("sub");
    assert_eq!(sub.balance, dec("200.00"));

    let err = ctx
        .accounts
        .transfer_with_main_account(
            user_id,
            independent.id,
            MainAccountTransferRequest {
                account_id: Some(account_id),
                kind: MainTransferKind::Deposit,
                amount: dec("500"),
                description: None,
            },
        )
        .await
        .expect_err("deposit mayor al saldo");
    assert!(matches!(domain_error(&err), DomainError::InsufficientFunds { .. }));
}

#[actix_rt::test]
async fn deactivated_sub_accounts_are_hidden_by_default() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 100).await;
    let sub = ctx
        .accounts
        .create_sub_account(user_id, sub_request(Some(account_id), SubAccountKind::Familia, 0))
        .await
        .expect("sub");

    let deactivated = ctx
        .accounts
        .deactivate_sub_account(user_id, sub.id)
        .await
        .expect("deactivate");
    assert!(!deactivated.active);

    let active = ctx.accounts.list_sub_accounts(user_id, false).await.expect("list");
    assert!(active.is_empty());
    let all = ctx.accounts.list_sub_accounts(user_id, true).await.expect("list all");
    assert_eq!(all.len(), 1);
}
