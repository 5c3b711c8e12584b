//! tests/user_tests.rs

use rust_decimal::Decimal;

use crate::errors::DomainError;
use crate::services::user_service::{email_taken, hash_pin, is_valid_pin, DEFAULT_ACCOUNT_NAME};
use crate::tests::{account_balance_cents, create_user, domain_error, setup, user_request, TEST_PIN};

#[test]
fn pin_must_be_six_ascii_digits() {
    assert!(is_valid_pin("000123"));
    assert!(!is_valid_pin("12345"));
    assert!(!is_valid_pin("1234567"));
    assert!(!is_valid_pin("12a456"));
    assert!(!is_valid_pin("１２３４５６"));
}

#[test]
fn pin_hash_is_salted_by_email() {
    let a = hash_pin("ana@correo.pe", TEST_PIN);
    assert_eq!(a, hash_pin("ANA@correo.pe", TEST_PIN));
    assert_ne!(a, hash_pin("otra@correo.pe", TEST_PIN));
    assert!(!a.contains(TEST_PIN));
}

#[actix_rt::test]
async fn create_user_opens_principal_account() {
    let ctx = setup().await;
    let resp = ctx
        .users
        .create_user(user_request("Ana@Correo.pe", Decimal::from(250)))
        .await
        .expect("create_user");

    assert_eq!(resp.user.email, "ana@correo.pe");
    assert_eq!(resp.user.currency_code, "PEN");
    assert_eq!(resp.user.currency_symbol, "S/");

    let account = ctx
        .accounts
        .get_account(resp.user.id, resp.account_id)
        .await
        .expect("get_account");
    assert_eq!(account.name, DEFAULT_ACCOUNT_NAME);
    assert_eq!(account_balance_cents(&ctx, resp.account_id).await, 25_000);

    let stored: String = sqlx::query_scalar("SELECT pin_hash FROM users WHERE id = ?1")
        .bind(resp.user.id)
        .fetch_one(&ctx.pool)
        .await
        .expect("pin_hash");
    assert_ne!(stored, TEST_PIN);
}

#[actix_rt::test]
async fn create_user_rejects_bad_input() {
    let ctx = setup().await;
    create_user(&ctx, "ana@correo.pe", 0).await;

    let dup = ctx
        .users
        .create_user(user_request("ana@correo.pe", Decimal::ZERO))
        .await
        .expect_err("email duplicado");
    assert!(matches!(domain_error(&dup), DomainError::Conflict(_)));

    let mut bad_pin = user_request("luis@correo.pe", Decimal::ZERO);
    bad_pin.quick_access_pin = "12ab56".to_string();
    let err = ctx.users.create_user(bad_pin).await.expect_err("pin inválido");
    assert!(matches!(domain_error(&err), DomainError::Validation(_)));

    let mut no_currency = user_request("eva@correo.pe", Decimal::ZERO);
    no_currency.currency_id = 99;
    let err = ctx.users.create_user(no_currency).await.expect_err("moneda");
    assert!(matches!(domain_error(&err), DomainError::NotFound("Moneda")));

    let negative = user_request("leo@correo.pe", Decimal::from(-1));
    let err = ctx.users.create_user(negative).await.expect_err("saldo negativo");
    assert!(matches!(domain_error(&err), DomainError::Validation(_)));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&ctx.pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[actix_rt::test]
async fn quick_access_pin_verification() {
    let ctx = setup().await;
    let (user_id, _) = create_user(&ctx, "ana@correo.pe", 0).await;

    ctx.users
        .verify_quick_access_pin(user_id, TEST_PIN)
        .await
        .expect("PIN correcto");

    let wrong = ctx
        .users
        .verify_quick_access_pin(user_id, "654321")
        .await
        .expect_err("PIN incorrecto");
    match domain_error(&wrong) {
        DomainError::Unauthorized(msg) => assert_eq!(msg, "El PIN ingresado es incorrecto."),
        other => panic!("error inesperado: {:?}", other),
    }

    let malformed = ctx
        .users
        .verify_quick_access_pin(user_id, "12")
        .await
        .expect_err("PIN mal formado");
    assert_eq!(
        domain_error(&malformed).to_string(),
        "PIN inválido. Ingrese 6 dígitos numéricos."
    );

    let missing = ctx
        .users
        .verify_quick_access_pin(999, TEST_PIN)
        .await
        .expect_err("usuario inexistente");
    assert!(matches!(domain_error(&missing), DomainError::NotFound("Usuario")));
}

#[actix_rt::test]
async fn concurrent_signups_with_same_email() {
    let ctx = setup().await;

    let (first, second) = tokio::join!(
        ctx.users.create_user(user_request("ana@correo.pe", Decimal::ZERO)),
        ctx.users.create_user(user_request("ANA@correo.pe", Decimal::ZERO)),
    );
    let (ok, err) = match (first, second) {
        (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
        other => panic!("se esperaba un alta y un conflicto: {:?}", other.0.is_ok()),
    };
    assert_eq!(ok.user.email, "ana@correo.pe");
    assert!(matches!(domain_error(&err), DomainError::Conflict(_)));

    // La transacción fallida no deja cuenta huérfana
    let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(&ctx.pool)
        .await
        .expect("count");
    assert_eq!(accounts, 1);
}

#[actix_rt::test]
async fn unique_violation_maps_to_conflict() {
    let ctx = setup().await;
    create_user(&ctx, "ana@correo.pe", 0).await;

    let raw = sqlx::query(
        r#"
        INSERT INTO users (document_id, first_name, paternal_surname, maternal_surname,
                           email, phone, pin_hash, currency_id, created_at)
        VALUES ('1', 'Ana', 'Quispe', '', 'ana@correo.pe', '', 'x', 1, '2025-01-01')
        "#,
    )
    .execute(&ctx.pool)
    .await
    .expect_err("email repetido");
    let err = email_taken(raw);
    assert!(matches!(domain_error(&err), DomainError::Conflict(_)));

    let other = email_taken(sqlx::Error::RowNotFound);
    assert!(other.downcast_ref::<DomainError>().is_none());
}
