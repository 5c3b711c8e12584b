//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

use chrono::{NaiveDate, SecondsFormat, Utc};

pub mod account_service;
pub mod course_service;
pub mod delivery_service;
pub mod email_service;
pub mod notification_service;
pub mod report_service;
pub mod savings_service;
pub mod signal_lock;
pub mod signals;
pub mod transaction_service;
pub mod user_service;

/// Marca de tiempo RFC 3339 en UTC con microsegundos; ordena bien como texto.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fecha de hoy en UTC, la misma zona que las marcas `*_at` guardadas.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Normaliza page/page_size y devuelve (page, page_size, offset).
pub fn paginate(page: u64, page_size: u64) -> (u64, u64, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, 100);
    let offset = (page - 1).saturating_mul(page_size);
    (page, page_size, i64::try_from(offset).unwrap_or(i64::MAX))
}
