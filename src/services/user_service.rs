//! services/user_service.rs
//! Usuarios, monedas y PIN de acceso rápido.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};

use crate::{
    errors::DomainError,
    models::{
        money::to_cents,
        user_model::{CreateUserRequest, CreateUserResponse, Currency, UserProfile},
    },
    services::now_rfc3339,
};

pub const DEFAULT_ACCOUNT_NAME: &str = "Cuenta principal";

const PROFILE_SELECT: &str = r#"
    SELECT u.id, u.document_id, u.first_name, u.paternal_surname, u.maternal_surname,
           u.email, u.phone, u.email_verified, u.is_active, u.currency_id,
           c.code AS currency_code, c.symbol AS currency_symbol, u.created_at
    FROM users u
    JOIN currencies c ON c.id = u.currency_id
"#;

/// Exactamente 6 dígitos ASCII.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 6 && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Hash del PIN salado con el email del usuario.
pub fn hash_pin(email: &str, pin: &str) -> String {
    blake3::hash(format!("{}:{}", email.to_lowercase(), pin).as_bytes())
        .to_hex()
        .to_string()
}

/// La restricción UNIQUE de `users.email` decide si el correo ya existe,
/// también cuando dos altas compiten.
pub fn email_taken(e: sqlx::Error) -> anyhow::Error {
    let unique = e
        .as_database_error()
        .map_or(false, |d| d.is_unique_violation());
    if unique {
        DomainError::Conflict("Ya existe un usuario con ese correo electrónico.".into()).into()
    } else {
        anyhow::Error::new(e).context("Error insertando usuario")
    }
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Pool<Sqlite>,
}

impl UserService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        Self { db_pool }
    }

    /// Ejecuta migraciones de la base de datos
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub async fn list_currencies(&self) -> Result<Vec<Currency>> {
        sqlx::query_as::<_, Currency>("SELECT id, code, name, symbol FROM currencies ORDER BY code")
            .fetch_all(&self.db_pool)
            .await
            .context("Error listando monedas")
    }

    /// Crea el usuario y su cuenta principal en una sola transacción.
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<CreateUserResponse> {
        let email = req.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("El correo electrónico es obligatorio.").into());
        }
        if req.first_name.trim().is_empty() || req.paternal_surname.trim().is_empty() {
            return Err(DomainError::validation("Nombres y apellido paterno son obligatorios.").into());
        }
        if !is_valid_pin(&req.quick_access_pin) {
            return Err(DomainError::validation("PIN inválido. Ingrese 6 dígitos numéricos.").into());
        }
        if req.initial_balance < Decimal::ZERO {
            return Err(DomainError::validation("El saldo inicial no puede ser negativo.").into());
        }
        let balance_cents = to_cents(req.initial_balance)
            .ok_or_else(|| DomainError::validation("Saldo inicial inválido."))?;

        let currency_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM currencies WHERE id = ?1")
            .bind(req.currency_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error buscando moneda")?;
        if currency_exists.is_none() {
            return Err(DomainError::NotFound("Moneda").into());
        }

        let now = now_rfc3339();
        let mut tx = self.db_pool.begin().await.context("Error iniciando transacción")?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (
                document_id, first_name, paternal_surname, maternal_surname,
                email, phone, pin_hash, currency_id, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(req.document_id.trim())
        .bind(req.first_name.trim())
        .bind(req.paternal_surname.trim())
        .bind(req.maternal_surname.trim())
        .bind(&email)
        .bind(req.phone.trim())
        .bind(hash_pin(&email, &req.quick_access_pin))
        .bind(req.currency_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(email_taken)?
        .last_insert_rowid();

        let account_name = req
            .account_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_ACCOUNT_NAME);

        let account_id = sqlx::query(
            r#"
            INSERT INTO accounts (user_id, name, description, balance_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(user_id)
        .bind(account_name)
        .bind(req.account_description.as_deref().unwrap_or(""))
        .bind(balance_cents)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Error creando cuenta principal")?
        .last_insert_rowid();

        tx.commit().await.context("Error confirmando alta de usuario")?;

        log::info!("(create_user) Usuario {} creado con cuenta {}", user_id, account_id);
        Ok(CreateUserResponse {
            user: self.get_user(user_id).await?,
            account_id,
        })
    }

    pub async fn get_user(&self, user_id: i64) -> Result<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!("{PROFILE_SELECT} WHERE u.id = ?1"))
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error leyendo usuario")?
            .ok_or_else(|| DomainError::NotFound("Usuario").into())
    }

    pub async fn verify_quick_access_pin(&self, user_id: i64, pin: &str) -> Result<()> {
        if !is_valid_pin(pin) {
            return Err(DomainError::validation("PIN inválido. Ingrese 6 dígitos numéricos.").into());
        }

        let row: Option<(String, String)> =
            sqlx::query_as("SELECT email, pin_hash FROM users WHERE id = ?1 AND is_active = 1")
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await
                .context("Error leyendo PIN")?;
        let (email, pin_hash) = row.ok_or(DomainError::NotFound("Usuario"))?;

        if hash_pin(&email, pin) != pin_hash {
            log::warn!("(verify_quick_access_pin) PIN incorrecto para usuario {}", user_id);
            return Err(DomainError::Unauthorized("El PIN ingresado es incorrecto.".into()).into());
        }
        Ok(())
    }
}
