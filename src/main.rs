use std::path::Path;
use std::str::FromStr;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::AppConfig;
use crate::logger::init_logger;
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
use crate::services::today_utc;

mod app;
mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

async fn setup_database(database_url: &str) -> Pool<Sqlite> {
    // Crear la carpeta del archivo si hace falta ("sqlite:data/fingest.db" -> "data")
    if let Some(dir) = database_url
        .strip_prefix("sqlite:")
        .map(|p| p.trim_start_matches("//"))
        .filter(|p| !p.starts_with(":memory:"))
        .and_then(|p| Path::new(p).parent())
        .filter(|d| !d.as_os_str().is_empty())
    {
        std::fs::create_dir_all(dir).expect("No se pudo crear el directorio de la base de datos");
    }

    log::info!("Conectando a SQLite en {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)
        .expect("DATABASE_URL inválida")
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("No se pudo conectar a la base de datos SQLite.")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env();
    let db_pool = setup_database(&config.database_url).await;

    // UserService (también dueño de las migraciones)
    let user_service = UserService::new(db_pool.clone());
    if let Err(e) = user_service.run_migrations().await {
        panic!("Fallo en migraciones: {:?}", e);
    }

    // EmailService: sin SMTP_HOST queda deshabilitado
    let email_service = match EmailService::new(config.smtp.as_ref()) {
        Ok(svc) => svc,
        Err(e) => {
            log::error!("No se pudo configurar SMTP, correos deshabilitados: {:?}", e);
            EmailService::disabled()
        }
    };

    let email_enabled = email_service.is_enabled();
    let delivery_service = DeliveryService::new(db_pool.clone());
    let notification_service =
        NotificationService::new(db_pool.clone(), email_service, delivery_service);
    if let Err(e) = notification_service.seed_catalog().await {
        panic!("No se pudo cargar el catálogo de notificaciones: {:?}", e);
    }

    let signals = FinanceSignals::new(
        notification_service.clone(),
        SignalLock::new(),
        config.signal_lock_ttl,
        config.low_balance_threshold,
    );
    let account_service = AccountService::new(db_pool.clone(), signals.clone());
    let transaction_service = TransactionService::new(db_pool.clone(), signals.clone());
    let savings_service = SavingsService::new(db_pool.clone(), signals);
    let report_service = ReportService::new(db_pool.clone(), transaction_service.clone());
    let course_service = CourseService::new(db_pool.clone());

    // Metas por vencer
    let savings_clone = savings_service.clone();
    let goal_interval = config.goal_check_interval;
    tokio::spawn(async move {
        loop {
            if let Err(e) = savings_clone
                .check_goals_due_soon(today_utc())
                .await
            {
                log::error!("Error revisando metas por vencer: {:?}", e);
            }
            tokio::time::sleep(goal_interval).await;
        }
    });

    // Reintento de correos fallidos
    if email_enabled {
        let notif_clone = notification_service.clone();
        let retry_interval = config.delivery_retry_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(retry_interval).await;
                if let Err(e) = notif_clone.retry_failed_deliveries(None).await {
                    log::error!("Error en reintento de entregas: {:?}", e);
                }
            }
        });
    } else {
        log::info!("SMTP deshabilitado, sin reintento periódico de correos");
    }

    // Levantar servidor
    log::info!("Levantando servidor en {}:{}", config.bind_addr, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(account_service.clone()))
            .app_data(web::Data::new(transaction_service.clone()))
            .app_data(web::Data::new(savings_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(report_service.clone()))
            .app_data(web::Data::new(course_service.clone()))
            .configure(app::init_app)
    })
    .workers(config.workers)
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await
}
