//! models/user_model.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Currency {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub symbol: String,
}

/// Perfil del usuario (sin el hash del PIN).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub document_id: String,
    pub first_name: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub email: String,
    pub phone: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub currency_id: i64,
    pub currency_code: String,
    pub currency_symbol: String,
    pub created_at: String,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.paternal_surname)
    }
}

/// Alta de usuario junto con su cuenta principal.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub document_id: String,
    pub first_name: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub email: String,
    pub phone: String,
    pub quick_access_pin: String,
    pub currency_id: i64,

    // Cuenta principal
    pub account_name: Option<String>,
    pub account_description: Option<String>,
    pub initial_balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserResponse {
    pub user: UserProfile,
    pub account_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuickAccessRequest {
    pub pin: String,
}

/// Lo mínimo que necesitan las notificaciones para dirigirse a un usuario.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Recipient {
    pub id: i64,
    pub first_name: String,
    pub email: String,
    pub currency_symbol: String,
}
