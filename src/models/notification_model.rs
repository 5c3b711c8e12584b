use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pendiente,
    Enviada,
    Leida,
    Archivada,
    Error,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pendiente => "pendiente",
            NotificationStatus::Enviada => "enviada",
            NotificationStatus::Leida => "leida",
            NotificationStatus::Archivada => "archivada",
            NotificationStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Baja,
    #[default]
    Media,
    Alta,
    Urgente,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Baja => "baja",
            Priority::Media => "media",
            Priority::Alta => "alta",
            Priority::Urgente => "urgente",
        }
    }
}

/// Tipo de notificación del catálogo ("saldo_bajo", "meta_alcanzada", ...)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationType {
    pub id: i64,
    pub name: String,
    pub category: String, // "critical", "warning", "info"
    pub description: String,
    pub icon: String,
    pub color: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationTemplate {
    pub id: i64,
    pub type_id: i64,
    pub name: String,
    pub email_subject: String,
    pub email_body: String,
    pub push_body: String,
    pub sms_body: String,
    pub active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationSettingRow {
    pub id: i64,
    pub user_id: i64,
    pub type_id: i64,
    pub type_name: String,
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub sms_enabled: bool,
    pub digest_frequency: String,
    pub amount_threshold_cents: Option<i64>,
    pub send_time: String,
    pub days_ahead: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationSetting {
    pub id: i64,
    pub user_id: i64,
    pub type_id: i64,
    pub type_name: String,
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub sms_enabled: bool,
    pub digest_frequency: String,
    pub amount_threshold: Option<Decimal>,
    pub send_time: String,
    pub days_ahead: i64,
    pub active: bool,
}

impl From<NotificationSettingRow> for NotificationSetting {
    fn from(r: NotificationSettingRow) -> Self {
        NotificationSetting {
            id: r.id,
            user_id: r.user_id,
            type_id: r.type_id,
            type_name: r.type_name,
            email_enabled: r.email_enabled,
            push_enabled: r.push_enabled,
            sms_enabled: r.sms_enabled,
            digest_frequency: r.digest_frequency,
            amount_threshold: r.amount_threshold_cents.map(crate::models::money::from_cents),
            send_time: r.send_time,
            days_ahead: r.days_ahead,
            active: r.active,
        }
    }
}

/// Cambios parciales sobre la configuración de un tipo
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateSettingRequest {
    pub email_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
    pub sms_enabled: Option<bool>,
    pub digest_frequency: Option<String>,
    pub amount_threshold: Option<Decimal>,
    pub send_time: Option<String>,
    pub days_ahead: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettingChange {
    pub field: &'static str,
    pub new_value: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSettingResponse {
    pub setting: NotificationSetting,
    pub changes: Vec<SettingChange>,
    pub confirmation_sent: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub type_id: i64,
    pub type_name: String,
    pub type_icon: String,
    pub title: String,
    pub message: String,
    pub extra_data: String,
    pub category: String,
    pub source_module: String,
    pub related_object: Option<String>,
    pub status: String,
    pub priority: String,
    pub email_sent: bool,
    pub push_sent: bool,
    pub sms_sent: bool,
    pub created_at: String,
    pub sent_at: Option<String>,
    pub read_at: Option<String>,
    pub expires_at: Option<String>,
    pub action_url: Option<String>,
    pub tags: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub type_id: i64,
    pub type_name: String,
    pub icon: String,
    pub title: String,
    pub message: String,
    pub extra_data: Value,
    pub category: String,
    pub source_module: String,
    pub related_object: Option<String>,
    pub status: String,
    pub priority: String,
    pub email_sent: bool,
    pub push_sent: bool,
    pub sms_sent: bool,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<String>,
    pub read_at: Option<String>,
    pub expires_at: Option<String>,
    pub action_url: Option<String>,
    pub tags: Value,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(r: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: r.id,
            user_id: r.user_id,
            type_id: r.type_id,
            type_name: r.type_name,
            icon: r.type_icon,
            title: r.title,
            message: r.message,
            extra_data: serde_json::from_str(&r.extra_data).unwrap_or(Value::Null),
            category: r.category,
            source_module: r.source_module,
            related_object: r.related_object,
            status: r.status,
            priority: r.priority,
            email_sent: r.email_sent,
            push_sent: r.push_sent,
            sms_sent: r.sms_sent,
            created_at: DateTime::parse_from_rfc3339(&r.created_at)?.with_timezone(&Utc),
            sent_at: r.sent_at,
            read_at: r.read_at,
            expires_at: r.expires_at,
            action_url: r.action_url,
            tags: serde_json::from_str(&r.tags).unwrap_or(Value::Array(vec![])),
        })
    }
}

/// Opcionales al crear una notificación
#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    pub priority: Priority,
    pub extra_data: Option<Value>,
    pub source_module: Option<String>,
    pub related_object: Option<String>,
    pub action_url: Option<String>,
    pub tags: Vec<String>,
}

/// Entrada del historial con los campos de presentación
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub relative_time: String,
    pub hour: String,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListNotificationsResponse {
    pub total: u64,
    pub unread: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<NotificationView>,
}
