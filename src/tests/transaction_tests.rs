//! tests/transaction_tests.rs

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;

use crate::errors::DomainError;
use crate::models::notification_model::Priority;
use crate::models::transaction_model::{category_label, TransactionFilter, TransactionKind};
use crate::services::signal_lock::SignalLock;
use crate::services::signals::{balance_alert, transaction_priority, FinanceSignals};
use crate::tests::{
    account_balance_cents, create_user, dec, domain_error, notifications_of, setup, tx_request,
};

#[test]
fn category_labels() {
    assert_eq!(category_label(TransactionKind::Expense, Some("salud")), "🏥 Salud");
    assert_eq!(category_label(TransactionKind::Income, Some("salario")), "💰 Salario");
    assert_eq!(category_label(TransactionKind::Income, Some("salud")), "📦 Otros");
    assert_eq!(category_label(TransactionKind::Expense, None), "📦 Otros");
}

#[test]
fn priority_by_amount() {
    assert_eq!(transaction_priority(dec("1000")), Priority::Alta);
    assert_eq!(transaction_priority(dec("999.99")), Priority::Media);
    assert_eq!(transaction_priority(dec("500")), Priority::Media);
    assert_eq!(transaction_priority(dec("20")), Priority::Baja);
}

#[test]
fn negative_balance_wins_over_low_balance() {
    let threshold = dec("50");
    let (kind, _, priority) = balance_alert(dec("-1"), threshold).expect("alerta");
    assert_eq!(kind, "negative_balance");
    assert_eq!(priority, Priority::Urgente);

    let (kind, _, priority) = balance_alert(dec("49.99"), threshold).expect("alerta");
    assert_eq!(kind, "low_balance");
    assert_eq!(priority, Priority::Alta);

    assert!(balance_alert(dec("50"), threshold).is_none());
}

#[actix_rt::test]
async fn income_and_expense_update_balance() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 100).await;

    let income = ctx
        .transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Income, dec("1200"), "salario"))
        .await
        .expect("ingreso");
    assert_eq!(income.account_balance, dec("1300.00"));
    assert_eq!(income.transaction.category_label, "💰 Salario");
    assert_eq!(income.transaction.account_name, "Cuenta principal");

    let expense = ctx
        .transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Expense, dec("300.50"), "vivienda"))
        .await
        .expect("gasto");
    assert_eq!(expense.account_balance, dec("999.50"));
    assert_eq!(account_balance_cents(&ctx, account_id).await, 99_950);
}

#[actix_rt::test]
async fn expense_cannot_leave_negative_balance() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 100).await;

    let err = ctx
        .transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Expense, dec("100.01"), "compras"))
        .await
        .expect_err("sobregiro");
    assert_eq!(domain_error(&err).to_string(), "El saldo no puede ser negativo.");

    assert_eq!(account_balance_cents(&ctx, account_id).await, 10_000);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(&ctx.pool)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[actix_rt::test]
async fn rejects_invalid_input() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 100).await;
    let (other_user, _) = create_user(&ctx, "luis@correo.pe", 100).await;

    let wrong_category = ctx
        .transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Income, dec("10"), "salud"))
        .await
        .expect_err("categoría de gasto en ingreso");
    assert!(matches!(domain_error(&wrong_category), DomainError::Validation(_)));

    let zero = ctx
        .transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Income, dec("0"), "salario"))
        .await
        .expect_err("monto cero");
    assert!(matches!(domain_error(&zero), DomainError::Validation(_)));

    let foreign = ctx
        .transactions
        .record_transaction(other_user, tx_request(account_id, TransactionKind::Income, dec("10"), "salario"))
        .await
        .expect_err("cuenta ajena");
    assert!(matches!(domain_error(&foreign), DomainError::NotFound("Cuenta")));
}

#[actix_rt::test]
async fn list_filters_and_paginates() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 1000).await;

    for amount in ["10", "20", "30"] {
        ctx.transactions
            .record_transaction(user_id, tx_request(account_id, TransactionKind::Income, dec(amount), "regalo"))
            .await
            .expect("ingreso");
    }
    ctx.transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Expense, dec("5"), "transporte"))
        .await
        .expect("gasto");

    let all = ctx
        .transactions
        .list_transactions(user_id, TransactionFilter::All, 1, 3)
        .await
        .expect("list");
    assert_eq!(all.total, 4);
    assert_eq!(all.items.len(), 3);
    assert_eq!(all.items[0].kind, TransactionKind::Expense);

    let page_two = ctx
        .transactions
        .list_transactions(user_id, TransactionFilter::All, 2, 3)
        .await
        .expect("page 2");
    assert_eq!(page_two.items.len(), 1);
    assert_eq!(page_two.items[0].amount, dec("10"));

    let expenses = ctx
        .transactions
        .list_transactions(user_id, TransactionFilter::Expenses, 1, 10)
        .await
        .expect("egresos");
    assert_eq!(expenses.total, 1);

    let income = ctx
        .transactions
        .list_transactions(user_id, TransactionFilter::Income, 0, 500)
        .await
        .expect("ingresos");
    assert_eq!(income.total, 3);
    assert_eq!(income.page, 1);
    assert_eq!(income.page_size, 100);
}

#[actix_rt::test]
async fn transaction_notification_and_content_dedup() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 5000).await;

    let first = ctx
        .transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Expense, dec("1500"), "compras"))
        .await
        .expect("gasto");

    let notes = notifications_of(&ctx, user_id, "transaction_recorded").await;
    assert_eq!(notes.len(), 1);
    let note = &notes[0];
    assert_eq!(note.title, "💸 Nuevo gasto registrado");
    assert_eq!(note.priority, "alta");
    assert_eq!(note.status, "enviada");
    assert!(note.push_sent);
    assert!(!note.email_sent);
    assert_eq!(note.extra_data["transaction_id"], first.transaction.id);
    assert_eq!(note.extra_data["amount"], "1500.00");
    assert!(note.message.contains("S/1,500.00"));
    assert!(note.message.contains("gasto considerable"));

    let deliveries = ctx
        .deliveries
        .list_for_notification(note.id)
        .await
        .expect("deliveries");
    let email = deliveries.iter().find(|d| d.channel == "email").expect("email");
    assert_eq!(email.status, "skipped");
    let push = deliveries.iter().find(|d| d.channel == "push").expect("push");
    assert_eq!(push.status, "done");

    // Mismo monto, tipo y cuenta dentro de la ventana: no se repite el aviso
    ctx.transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Expense, dec("1500"), "compras"))
        .await
        .expect("gasto repetido");
    assert_eq!(notifications_of(&ctx, user_id, "transaction_recorded").await.len(), 1);

    ctx.transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Expense, dec("20"), "compras"))
        .await
        .expect("otro gasto");
    let notes = notifications_of(&ctx, user_id, "transaction_recorded").await;
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].priority, "baja");
}

#[actix_rt::test]
async fn low_and_negative_balance_alerts() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 100).await;

    ctx.transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Expense, dec("60"), "alimentacion"))
        .await
        .expect("gasto");

    let low = notifications_of(&ctx, user_id, "low_balance").await;
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].priority, "alta");
    assert_eq!(low[0].extra_data["current_balance"], "40.00");
    // low_balance tiene plantilla; el aviso igual queda como enviado
    assert_eq!(low[0].status, "enviada");

    assert!(notifications_of(&ctx, user_id, "negative_balance").await.is_empty());
}

#[actix_rt::test]
async fn held_lock_skips_transaction_signal() {
    let ctx = setup().await;
    let (user_id, account_id) = create_user(&ctx, "ana@correo.pe", 1000).await;
    let recorded = ctx
        .transactions
        .record_transaction(user_id, tx_request(account_id, TransactionKind::Income, dec("200"), "salario"))
        .await
        .expect("record");
    sqlx::query("DELETE FROM notifications")
        .execute(&ctx.pool)
        .await
        .expect("limpiar");

    let lock = SignalLock::new();
    let signals = FinanceSignals::new(
        ctx.notifications.clone(),
        lock.clone(),
        Duration::from_secs(60),
        Decimal::from(50),
    );
    let tx = &recorded.transaction;

    // Ventana actual y la siguiente, por si el reloj cruza el límite de 5 s
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("reloj")
        .as_secs();
    let guards: Vec<_> = [now, now + 5]
        .into_iter()
        .map(|secs| {
            let key = SignalLock::lock_key("transaction_recorded", "Transaction", tx.id, Some(user_id), secs);
            lock.acquire(&key, Duration::from_secs(60)).expect("lock libre")
        })
        .collect();

    signals.transaction_created(tx, recorded.account_balance).await;
    assert!(notifications_of(&ctx, user_id, "transaction_recorded").await.is_empty());

    drop(guards);
    signals.transaction_created(tx, recorded.account_balance).await;
    assert_eq!(notifications_of(&ctx, user_id, "transaction_recorded").await.len(), 1);
}
