//! handlers/mod.rs
//! Un módulo de handlers por recurso.
pub mod account_handler;
pub mod course_handler;
pub mod notification_handler;
pub mod report_handler;
pub mod savings_handler;
pub mod transaction_handler;
pub mod user_handler;

use actix_web::HttpResponse;
use serde::Deserialize;
use serde_json::json;

use crate::errors::DomainError;

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PaginationQuery {
    pub fn values(&self) -> (u64, u64) {
        (self.page.unwrap_or(1), self.page_size.unwrap_or(10))
    }
}

/// Traduce el error de un servicio a la respuesta HTTP correspondiente.
pub fn error_response(e: anyhow::Error) -> HttpResponse {
    let body = |msg: String| json!({ "success": false, "error": msg });

    match e.downcast_ref::<DomainError>() {
        Some(err @ DomainError::NotFound(_)) => HttpResponse::NotFound().json(body(err.to_string())),
        Some(err @ DomainError::Validation(_)) | Some(err @ DomainError::InsufficientFunds { .. }) => {
            HttpResponse::BadRequest().json(body(err.to_string()))
        }
        Some(err @ DomainError::Conflict(_)) => HttpResponse::Conflict().json(body(err.to_string())),
        Some(err @ DomainError::Unauthorized(_)) => {
            HttpResponse::Unauthorized().json(body(err.to_string()))
        }
        None => {
            log::error!("(error_response) {:?}", e);
            HttpResponse::InternalServerError().json(body(format!("{:#}", e)))
        }
    }
}
