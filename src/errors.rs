//! errors.rs
//! Errores de dominio. Los servicios devuelven `anyhow::Result` y envuelven
//! estas variantes para que los handlers elijan el código HTTP.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} no encontrado")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Saldo insuficiente. Saldo disponible: {available}")]
    InsufficientFunds { available: Decimal },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}
