//! tests/mod.rs
//! Base SQLite en memoria con migraciones y catálogo, correo deshabilitado.

mod account_tests;
mod course_tests;
mod handler_tests;
mod signal_lock_tests;
mod transaction_tests;
mod user_tests;

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::errors::DomainError;
use crate::models::delivery_model::DeliveryRecord;
use crate::models::notification_model::Notification;
use crate::models::transaction_model::{RecordTransactionRequest, TransactionKind};
use crate::models::user_model::CreateUserRequest;
use crate::services::account_service::AccountService;
use crate::services::course_service::CourseService;
use crate::services::delivery_service::DeliveryService;
use crate::services::email_service::EmailService;
use crate::services::notification_service::NotificationService;
use crate::services::report_service::ReportService;
use crate::services::savings_service::SavingsService;
use crate::services::signal_lock::SignalLock;
use crate::services::signals::FinanceSignals;
use crate::services::transaction_service::TransactionService;
use crate::services::user_service::UserService;

pub const TEST_PIN: &str = "123456";

#[derive(Clone)]
pub struct TestContext {
    pub pool: Pool<Sqlite>,
    pub users: UserService,
    pub accounts: AccountService,
    pub transactions: TransactionService,
    pub savings: SavingsService,
    pub notifications: NotificationService,
    pub deliveries: DeliveryService,
    pub reports: ReportService,
    pub courses: CourseService,
}

pub async fn setup() -> TestContext {
    // Una sola conexión: cada conexión ":memory:" es una base distinta
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("No se pudo abrir SQLite en memoria");

    let users = UserService::new(pool.clone());
    users.run_migrations().await.expect("Fallo en migraciones");

    let deliveries = DeliveryService::new(pool.clone());
    let notifications =
        NotificationService::new(pool.clone(), EmailService::disabled(), deliveries.clone());
    notifications.seed_catalog().await.expect("Fallo cargando catálogo");

    let signals = FinanceSignals::new(
        notifications.clone(),
        SignalLock::new(),
        Duration::from_secs(60),
        Decimal::from(50),
    );
    let accounts = AccountService::new(pool.clone(), signals.clone());
    let transactions = TransactionService::new(pool.clone(), signals.clone());
    let savings = SavingsService::new(pool.clone(), signals);
    let reports = ReportService::new(pool.clone(), transactions.clone());
    let courses = CourseService::new(pool.clone());

    TestContext {
        pool,
        users,
        accounts,
        transactions,
        savings,
        notifications,
        deliveries,
        reports,
        courses,
    }
}

pub fn user_request(email: &str, initial_balance: Decimal) -> CreateUserRequest {
    CreateUserRequest {
        document_id: "12345678".to_string(),
        first_name: "Ana".to_string(),
        paternal_surname: "Quispe".to_string(),
        maternal_surname: "Rojas".to_string(),
        email: email.to_string(),
        phone: "999888777".to_string(),
        quick_access_pin: TEST_PIN.to_string(),
        currency_id: 2,
        account_name: None,
        account_description: None,
        initial_balance,
    }
}

/// Devuelve (user_id, account_id).
pub async fn create_user(ctx: &TestContext, email: &str, initial_balance: i64) -> (i64, i64) {
    let resp = ctx
        .users
        .create_user(user_request(email, Decimal::from(initial_balance)))
        .await
        .expect("No se pudo crear usuario de prueba");
    (resp.user.id, resp.account_id)
}

pub fn tx_request(account_id: i64, kind: TransactionKind, amount: Decimal, category: &str) -> RecordTransactionRequest {
    RecordTransactionRequest {
        account_id,
        name: format!("Movimiento {}", category),
        kind,
        category: Some(category.to_string()),
        amount,
        occurred_at: None,
        description: None,
    }
}

/// Notificaciones de un tipo para el usuario, más antiguas primero.
pub async fn notifications_of(ctx: &TestContext, user_id: i64, type_name: &str) -> Vec<Notification> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT n.id FROM notifications n JOIN notification_types t ON t.id = n.type_id
        WHERE n.user_id = ?1 AND t.name = ?2 ORDER BY n.id
        "#,
    )
    .bind(user_id)
    .bind(type_name)
    .fetch_all(&ctx.pool)
    .await
    .expect("Error consultando notificaciones");

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        out.push(
            ctx.notifications
                .get_notification(user_id, id)
                .await
                .expect("Notificación no encontrada"),
        );
    }
    out
}

pub async fn account_balance_cents(ctx: &TestContext, account_id: i64) -> i64 {
    sqlx::query_scalar("SELECT balance_cents FROM accounts WHERE id = ?1")
        .bind(account_id)
        .fetch_one(&ctx.pool)
        .await
        .expect("Cuenta no encontrada")
}

pub async fn delivery(ctx: &TestContext, delivery_id: &str) -> DeliveryRecord {
    sqlx::query_as::<_, DeliveryRecord>(
        r#"
        SELECT id, notification_id, channel, status, error_message,
               created_at, updated_at, attempts
        FROM notification_deliveries
        WHERE id = ?1
        "#,
    )
    .bind(delivery_id)
    .fetch_one(&ctx.pool)
    .await
    .expect("Entrega no encontrada")
}

pub fn domain_error(err: &anyhow::Error) -> &DomainError {
    err.downcast_ref::<DomainError>()
        .unwrap_or_else(|| panic!("Se esperaba DomainError, llegó: {:?}", err))
}

pub fn dec(raw: &str) -> Decimal {
    raw.parse().expect("Decimal inválido")
}
