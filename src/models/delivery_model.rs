use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryRecord {
    pub id: String,
    pub notification_id: i64,
    pub channel: String, // "email", "push"
    pub status: String,  // "pending", "running", "done", "failed", "skipped"
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub attempts: i64,
}
