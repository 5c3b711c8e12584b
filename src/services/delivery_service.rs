//! services/delivery_service.rs
//! Seguimiento de entregas por canal (email, push) de cada notificación.

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::delivery_model::DeliveryRecord;
use crate::services::now_rfc3339;

#[derive(Clone)]
pub struct DeliveryService {
    db_pool: Pool<Sqlite>,
}

impl DeliveryService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        DeliveryService { db_pool }
    }

    pub async fn create_delivery(
        &self,
        notification_id: i64,
        channel: &str,
        initial_status: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO notification_deliveries (
                id, notification_id, channel, status, error_message,
                created_at, updated_at, attempts
            )
            VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5, 0)
            "#,
        )
        .bind(&id)
        .bind(notification_id)
        .bind(channel)
        .bind(initial_status)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error creando notification_delivery")?;

        Ok(id)
    }

    pub async fn update_status(
        &self,
        delivery_id: &str,
        status: &str,
        error_message: Option<&str>,
        increment_attempt: bool,
    ) -> Result<()> {
        let now = now_rfc3339();

        let attempts_sql = if increment_attempt {
            ", attempts = attempts + 1"
        } else {
            ""
        };

        let sql = format!(
            r#"
            UPDATE notification_deliveries
            SET
                status = ?1,
                error_message = ?2,
                updated_at = ?3
                {attempts_sql}
            WHERE id = ?4
            "#
        );

        sqlx::query(&sql)
            .bind(status)
            .bind(error_message)
            .bind(now)
            .bind(delivery_id)
            .execute(&self.db_pool)
            .await
            .context("Error actualizando notification_delivery")?;

        Ok(())
    }

    pub async fn list_for_notification(&self, notification_id: i64) -> Result<Vec<DeliveryRecord>> {
        sqlx::query_as::<_, DeliveryRecord>(
            r#"
            SELECT id, notification_id, channel, status, error_message,
                   created_at, updated_at, attempts
            FROM notification_deliveries
            WHERE notification_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(notification_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando entregas de la notificación")
    }

    /// Entregas fallidas del canal que aún no agotaron los intentos.
    pub async fn list_retryable(&self, channel: &str, max_attempts: i64) -> Result<Vec<DeliveryRecord>> {
        sqlx::query_as::<_, DeliveryRecord>(
            r#"
            SELECT id, notification_id, channel, status, error_message,
                   created_at, updated_at, attempts
            FROM notification_deliveries
            WHERE status = 'failed' AND channel = ?1 AND attempts < ?2
            ORDER BY updated_at
            "#,
        )
        .bind(channel)
        .bind(max_attempts)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando entregas a reintentar")
    }
}
