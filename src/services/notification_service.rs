use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde_json::Value;
use sqlx::{Pool, Sqlite};

use crate::{
    errors::DomainError,
    models::{
        money::to_cents,
        notification_model::{
            ListNotificationsResponse, Notification, NotificationOptions, NotificationRow,
            NotificationSetting, NotificationSettingRow, NotificationStatus, NotificationTemplate,
            NotificationType, NotificationView, SettingChange, UpdateSettingRequest,
            UpdateSettingResponse,
        },
        user_model::Recipient,
    },
    services::{
        delivery_service::DeliveryService,
        email_service::{self, EmailService},
        now_rfc3339, paginate,
    },
};

const NOTIFICATION_SELECT: &str = r#"
    SELECT n.id, n.user_id, n.type_id, t.name AS type_name, t.icon AS type_icon,
           n.title, n.message, n.extra_data, n.category, n.source_module,
           n.related_object, n.status, n.priority, n.email_sent, n.push_sent,
           n.sms_sent, n.created_at, n.sent_at, n.read_at, n.expires_at,
           n.action_url, n.tags
    FROM notifications n
    JOIN notification_types t ON t.id = n.type_id
"#;

const SETTING_SELECT: &str = r#"
    SELECT s.id, s.user_id, s.type_id, t.name AS type_name, s.email_enabled,
           s.push_enabled, s.sms_enabled, s.digest_frequency,
           s.amount_threshold_cents, s.send_time, s.days_ahead, s.active
    FROM notification_settings s
    JOIN notification_types t ON t.id = s.type_id
"#;

/// (name, category, description, icon, color)
const CATALOG: [(&str, &str, &str, &str, &str); 10] = [
    ("transaction_recorded", "info", "Nuevos ingresos o gastos registrados", "💰", "#3B82F6"),
    ("contribution_made", "info", "Confirmación de aporte realizado a meta de ahorro", "💰", "#3B82F6"),
    ("goal_progress", "info", "Progreso en meta de ahorro", "📈", "#8B5CF6"),
    ("goal_reached", "info", "El usuario completó una meta de ahorro", "🎯", "#10B981"),
    ("new_goal", "info", "Creación de nueva meta de ahorro", "🎯", "#8B5CF6"),
    ("goal_due_soon", "warning", "Meta de ahorro próxima a vencer", "⏰", "#F59E0B"),
    ("low_balance", "critical", "Saldo de una cuenta por debajo del límite", "🚨", "#EF4444"),
    ("negative_balance", "critical", "Cuenta con saldo negativo", "🚨", "#DC2626"),
    ("transfer_made", "info", "Confirmación de transferencia entre cuentas", "🔄", "#3B82F6"),
    ("settings_updated", "info", "Cambio en configuración de notificaciones", "⚙️", "#6366F1"),
];

/// (type, name, email_subject, email_body, push_body)
const TEMPLATES: [(&str, &str, &str, &str, &str); 3] = [
    (
        "goal_reached",
        "Meta de Ahorro Alcanzada",
        "🎉 ¡Meta Alcanzada en FinGest!",
        "<p>¡Felicidades {first_name}!</p>\
         <p>Has alcanzado tu meta de ahorro \"{goal_name}\" por un monto de {currency}{target_amount}.</p>\
         <p>Este es un gran logro en tu camino hacia la estabilidad financiera. ¡Sigue así!</p>\
         <p>Saludos,<br>El equipo de FinGest</p>",
        "🎉 ¡Meta \"{goal_name}\" completada!",
    ),
    (
        "contribution_made",
        "Aporte a Meta Registrado",
        "FinGest - Aporte Registrado",
        "<p>Hola {first_name},</p>\
         <p>Hemos registrado tu aporte de {currency}{contribution_amount} a tu meta \"{goal_name}\".</p>\
         <p>Monto ahorrado: {currency}{saved_amount} de {currency}{target_amount}</p>\
         <p>¡Cada aporte te acerca más a tu objetivo!</p>\
         <p>Saludos,<br>El equipo de FinGest</p>",
        "Aporte de {currency}{contribution_amount} registrado en {goal_name}",
    ),
    (
        "low_balance",
        "Alerta de Saldo Bajo",
        "🚨 FinGest - Alerta de Saldo Bajo",
        "<p>Hola {first_name},</p>\
         <p>Te informamos que el saldo de tu cuenta \"{account_name}\" está por debajo del límite establecido.</p>\
         <p>Saldo actual: {currency}{current_balance}<br>Límite configurado: {currency}{threshold}</p>\
         <p>Te recomendamos revisar tus finanzas y considerar hacer un depósito.</p>\
         <p>Saludos,<br>El equipo de FinGest</p>",
        "🚨 Saldo bajo en {account_name}: {currency}{current_balance}",
    ),
];

const MAX_DELIVERY_ATTEMPTS: i64 = 5;

/// "hace un momento", "hace N min", "hace Nh", "hace Nd" o la fecha dd/mm/YYYY.
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - timestamp).num_minutes();
    if minutes < 1 {
        return "hace un momento".to_string();
    }
    if minutes < 60 {
        return format!("hace {} min", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("hace {}h", hours);
    }
    let days = hours / 24;
    if days < 7 {
        return format!("hace {}d", days);
    }
    timestamp.format("%d/%m/%Y").to_string()
}

/// Contexto de sustitución para plantillas: datos del usuario, de la
/// notificación y todo `extra_data`.
pub fn template_context(notification: &Notification, recipient: &Recipient) -> BTreeMap<String, String> {
    let mut ctx = BTreeMap::new();
    ctx.insert("first_name".to_string(), recipient.first_name.clone());
    ctx.insert("currency".to_string(), recipient.currency_symbol.clone());
    ctx.insert("title".to_string(), notification.title.clone());
    ctx.insert("message".to_string(), notification.message.clone());
    ctx.insert("category".to_string(), notification.category.clone());
    ctx.insert(
        "date".to_string(),
        notification.created_at.format("%d/%m/%Y %H:%M").to_string(),
    );
    if let Some(url) = &notification.action_url {
        ctx.insert("action_url".to_string(), url.clone());
    }
    if let Value::Object(map) = &notification.extra_data {
        for (key, value) in map {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            ctx.insert(key.clone(), text);
        }
    }
    ctx
}

#[derive(Clone)]
pub struct NotificationService {
    db_pool: Pool<Sqlite>,
    email_service: EmailService,
    delivery_service: DeliveryService,
}

impl NotificationService {
    pub fn new(
        db_pool: Pool<Sqlite>,
        email_service: EmailService,
        delivery_service: DeliveryService,
    ) -> Self {
        Self {
            db_pool,
            email_service,
            delivery_service,
        }
    }

    /// Inserta el catálogo de tipos y plantillas; no toca lo que ya exista.
    pub async fn seed_catalog(&self) -> Result<()> {
        for (name, category, description, icon, color) in CATALOG {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO notification_types (name, category, description, icon, color, active)
                VALUES (?1, ?2, ?3, ?4, ?5, 1)
                "#,
            )
            .bind(name)
            .bind(category)
            .bind(description)
            .bind(icon)
            .bind(color)
            .execute(&self.db_pool)
            .await
            .context("Error sembrando tipos de notificación")?;
        }

        let now = now_rfc3339();
        for (type_name, name, subject, body, push) in TEMPLATES {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO notification_templates
                    (type_id, name, email_subject, email_body, push_body, sms_body, active, created_at)
                SELECT id, ?2, ?3, ?4, ?5, '', 1, ?6
                FROM notification_types WHERE name = ?1
                "#,
            )
            .bind(type_name)
            .bind(name)
            .bind(subject)
            .bind(body)
            .bind(push)
            .bind(&now)
            .execute(&self.db_pool)
            .await
            .context("Error sembrando plantillas de notificación")?;
        }

        log::info!("(seed_catalog) Catálogo de notificaciones listo");
        Ok(())
    }

    pub async fn list_types(&self) -> Result<Vec<NotificationType>> {
        sqlx::query_as::<_, NotificationType>(
            "SELECT id, name, category, description, icon, color, active FROM notification_types ORDER BY name",
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando tipos de notificación")
    }

    async fn find_active_type(&self, type_name: &str) -> Result<Option<NotificationType>> {
        sqlx::query_as::<_, NotificationType>(
            r#"
            SELECT id, name, category, description, icon, color, active
            FROM notification_types WHERE name = ?1 AND active = 1
            "#,
        )
        .bind(type_name)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error buscando tipo de notificación")
    }

    pub async fn recipient(&self, user_id: i64) -> Result<Recipient> {
        sqlx::query_as::<_, Recipient>(
            r#"
            SELECT u.id, u.first_name, u.email, c.symbol AS currency_symbol
            FROM users u JOIN currencies c ON c.id = u.currency_id
            WHERE u.id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error buscando destinatario")?
        .ok_or_else(|| DomainError::NotFound("Usuario").into())
    }

    async fn setting_for(&self, user_id: i64, type_id: i64) -> Result<Option<NotificationSettingRow>> {
        sqlx::query_as::<_, NotificationSettingRow>(&format!(
            "{SETTING_SELECT} WHERE s.user_id = ?1 AND s.type_id = ?2"
        ))
        .bind(user_id)
        .bind(type_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error buscando configuración de notificación")
    }

    /// Email y push activos, SMS apagado.
    async fn get_or_create_setting(&self, user_id: i64, type_id: i64) -> Result<NotificationSettingRow> {
        if let Some(existing) = self.setting_for(user_id, type_id).await? {
            return Ok(existing);
        }

        let now = now_rfc3339();
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO notification_settings
                (user_id, type_id, email_enabled, push_enabled, sms_enabled, active, created_at, updated_at)
            VALUES (?1, ?2, 1, 1, 0, 1, ?3, ?3)
            "#,
        )
        .bind(user_id)
        .bind(type_id)
        .bind(&now)
        .execute(&self.db_pool)
        .await
        .context("Error creando configuración por defecto")?;

        self.setting_for(user_id, type_id)
            .await?
            .context("Configuración recién creada no encontrada")
    }

    /// Crea y procesa una notificación. `None` si el tipo no existe o está
    /// inactivo, o si el usuario la tiene deshabilitada.
    pub async fn create_notification(
        &self,
        user_id: i64,
        type_name: &str,
        title: &str,
        message: &str,
        category: &str,
        opts: NotificationOptions,
    ) -> Result<Option<Notification>> {
        let Some(ntype) = self.find_active_type(type_name).await? else {
            log::warn!("(create_notification) Tipo de notificación no encontrado: {}", type_name);
            return Ok(None);
        };

        let setting = self.get_or_create_setting(user_id, ntype.id).await?;
        if !setting.active {
            log::info!(
                "(create_notification) Usuario {} tiene deshabilitado '{}'",
                user_id,
                type_name
            );
            return Ok(None);
        }

        let extra = opts.extra_data.unwrap_or_else(|| Value::Object(Default::default()));
        let tags = serde_json::to_string(&opts.tags)?;
        let now = now_rfc3339();

        let id = sqlx::query(
            r#"
            INSERT INTO notifications (
                user_id, type_id, title, message, extra_data, category,
                source_module, related_object, status, priority, created_at,
                action_url, tags
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'pendiente', ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(user_id)
        .bind(ntype.id)
        .bind(title)
        .bind(message)
        .bind(extra.to_string())
        .bind(category)
        .bind(opts.source_module.as_deref().unwrap_or("notifications"))
        .bind(opts.related_object.as_deref())
        .bind(opts.priority.as_str())
        .bind(&now)
        .bind(opts.action_url.as_deref())
        .bind(tags)
        .execute(&self.db_pool)
        .await
        .context("Error insertando notificación")?
        .last_insert_rowid();

        let notification = self.fetch(id).await?;
        self.process(&notification, &setting).await?;

        log::info!("(create_notification) Notificación {} creada para usuario {}", id, user_id);
        self.fetch(id).await.map(Some)
    }

    /// Una entrega por canal habilitado; el estado final depende del email.
    async fn process(&self, notification: &Notification, setting: &NotificationSettingRow) -> Result<()> {
        let mut email_failed = false;

        if setting.email_enabled {
            let delivery_id = self
                .delivery_service
                .create_delivery(notification.id, "email", "pending")
                .await?;
            self.delivery_service
                .update_status(&delivery_id, "running", None, false)
                .await?;

            match self.send_notification_email(notification).await {
                Ok(true) => {
                    self.delivery_service
                        .update_status(&delivery_id, "done", None, true)
                        .await?;
                    self.set_flag(notification.id, "email_sent").await?;
                }
                Ok(false) => {
                    self.delivery_service
                        .update_status(&delivery_id, "skipped", None, false)
                        .await?;
                }
                Err(e) => {
                    log::error!(
                        "(process) Error enviando email para notificación {}: {:?}",
                        notification.id,
                        e
                    );
                    self.delivery_service
                        .update_status(&delivery_id, "failed", Some(&format!("{:?}", e)), true)
                        .await?;
                    email_failed = true;
                }
            }
        }

        if setting.push_enabled {
            let delivery_id = self
                .delivery_service
                .create_delivery(notification.id, "push", "pending")
                .await?;
            self.delivery_service
                .update_status(&delivery_id, "done", None, false)
                .await?;
            self.set_flag(notification.id, "push_sent").await?;
        }

        if email_failed {
            self.set_status(notification.id, NotificationStatus::Error).await?;
        } else {
            sqlx::query("UPDATE notifications SET status = 'enviada', sent_at = ?1 WHERE id = ?2")
                .bind(now_rfc3339())
                .bind(notification.id)
                .execute(&self.db_pool)
                .await
                .context("Error marcando notificación como enviada")?;
        }
        Ok(())
    }

    /// Plantilla activa del tipo si existe; si no, asunto y HTML por defecto.
    async fn send_notification_email(&self, notification: &Notification) -> Result<bool> {
        let recipient = self.recipient(notification.user_id).await?;

        let template = sqlx::query_as::<_, NotificationTemplate>(
            r#"
            SELECT id, type_id, name, email_subject, email_body, push_body, sms_body, active
            FROM notification_templates
            WHERE type_id = ?1 AND active = 1
            ORDER BY id LIMIT 1
            "#,
        )
        .bind(notification.type_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error buscando plantilla")?;

        let (subject, html) = match template {
            Some(t) => {
                let ctx = template_context(notification, &recipient);
                (
                    email_service::render_template(&t.email_subject, &ctx),
                    email_service::render_template(&t.email_body, &ctx),
                )
            }
            None => (
                email_service::default_subject(notification),
                email_service::default_html(notification, &recipient.currency_symbol),
            ),
        };

        self.email_service.send(&recipient.email, &subject, &html).await
    }

    async fn set_flag(&self, id: i64, column: &'static str) -> Result<()> {
        sqlx::query(&format!("UPDATE notifications SET {column} = 1 WHERE id = ?1"))
            .bind(id)
            .execute(&self.db_pool)
            .await
            .with_context(|| format!("Error actualizando {column}"))?;
        Ok(())
    }

    async fn set_status(&self, id: i64, status: NotificationStatus) -> Result<()> {
        sqlx::query("UPDATE notifications SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.db_pool)
            .await
            .context("Error actualizando estado de notificación")?;
        Ok(())
    }

    async fn fetch(&self, id: i64) -> Result<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!("{NOTIFICATION_SELECT} WHERE n.id = ?1"))
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error leyendo notificación")?
            .ok_or(DomainError::NotFound("Notificación"))?;
        Notification::try_from(row)
    }

    pub async fn get_notification(&self, user_id: i64, id: i64) -> Result<Notification> {
        let notification = self.fetch(id).await?;
        if notification.user_id != user_id {
            return Err(DomainError::NotFound("Notificación").into());
        }
        Ok(notification)
    }

    pub async fn mark_read(&self, user_id: i64, id: i64) -> Result<Notification> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'leida', read_at = ?1 WHERE id = ?2 AND user_id = ?3",
        )
        .bind(now_rfc3339())
        .bind(id)
        .bind(user_id)
        .execute(&self.db_pool)
        .await
        .context("Error marcando notificación como leída")?;

        if result.rows_affected() == 0 {
            log::warn!("(mark_read) Notificación {} no encontrada para usuario {}", id, user_id);
            return Err(DomainError::NotFound("Notificación").into());
        }
        log::info!("(mark_read) Notificación {} marcada como leída", id);
        self.fetch(id).await
    }

    pub async fn archive(&self, user_id: i64, id: i64) -> Result<Notification> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'archivada' WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.db_pool)
        .await
        .context("Error archivando notificación")?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("Notificación").into());
        }
        self.fetch(id).await
    }

    /// Historial paginado, más recientes primero.
    pub async fn list(
        &self,
        user_id: i64,
        status: Option<NotificationStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<ListNotificationsResponse> {
        let (page, page_size, offset) = paginate(page, page_size);
        let status = status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"{NOTIFICATION_SELECT}
            WHERE n.user_id = ?1 AND (?2 IS NULL OR n.status = ?2)
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT ?3 OFFSET ?4"#
        ))
        .bind(user_id)
        .bind(status)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando notificaciones")?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.db_pool)
        .await
        .context("Error contando notificaciones")?;

        let now = Utc::now();
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let notification = Notification::try_from(row)?;
            items.push(NotificationView {
                relative_time: relative_time(notification.created_at, now),
                hour: notification.created_at.format("%H:%M").to_string(),
                read: notification.status == NotificationStatus::Leida.as_str(),
                notification,
            });
        }

        Ok(ListNotificationsResponse {
            total: total as u64,
            unread: self.unread_count(user_id).await?,
            page,
            page_size,
            items,
        })
    }

    /// Pendientes o enviadas, más recientes primero.
    pub async fn unread(&self, user_id: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"{NOTIFICATION_SELECT}
            WHERE n.user_id = ?1 AND n.status IN ('pendiente', 'enviada')
            ORDER BY n.created_at DESC, n.id DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando notificaciones no leídas")?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND status IN ('pendiente', 'enviada')",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Error contando notificaciones no leídas")?;
        Ok(count as u64)
    }

    /// ¿Existe una notificación de esos tipos, creada después de `since`,
    /// cuyo `extra_data` coincide en todas las claves dadas?
    pub async fn exists_recent(
        &self,
        user_id: i64,
        type_names: &[&str],
        matches: &[(&str, Value)],
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let type_params = (0..type_names.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            r#"
            SELECT COUNT(*) FROM notifications n
            JOIN notification_types t ON t.id = n.type_id
            WHERE n.user_id = ?1 AND n.created_at >= ?2 AND t.name IN ({type_params})
            "#
        );
        let base = type_names.len() + 3;
        for (i, (key, _)) in matches.iter().enumerate() {
            sql.push_str(&format!(
                " AND json_extract(n.extra_data, '$.{}') = ?{}",
                key,
                base + i
            ));
        }

        let since = since.to_rfc3339_opts(chrono::SecondsFormat::Micros, true);
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(user_id).bind(since);
        for name in type_names {
            query = query.bind(*name);
        }
        for (_, value) in matches {
            query = match value {
                Value::Number(n) if n.is_i64() => query.bind(n.as_i64()),
                Value::Number(n) => query.bind(n.as_f64()),
                Value::Bool(b) => query.bind(*b),
                Value::String(s) => query.bind(s.clone()),
                other => query.bind(other.to_string()),
            };
        }

        let count = query
            .fetch_one(&self.db_pool)
            .await
            .context("Error buscando notificaciones duplicadas")?;
        Ok(count > 0)
    }

    /// Configuración de cada tipo activo; crea la de por defecto si falta.
    pub async fn list_settings(&self, user_id: i64) -> Result<Vec<NotificationSetting>> {
        self.recipient(user_id).await?;
        for ntype in self.list_types().await?.into_iter().filter(|t| t.active) {
            self.get_or_create_setting(user_id, ntype.id).await?;
        }

        let rows = sqlx::query_as::<_, NotificationSettingRow>(&format!(
            "{SETTING_SELECT} WHERE s.user_id = ?1 AND t.active = 1 ORDER BY t.name"
        ))
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando configuraciones")?;

        Ok(rows.into_iter().map(NotificationSetting::from).collect())
    }

    pub async fn update_setting(
        &self,
        user_id: i64,
        type_name: &str,
        patch: UpdateSettingRequest,
    ) -> Result<UpdateSettingResponse> {
        let recipient = self.recipient(user_id).await?;
        let ntype = self
            .find_active_type(type_name)
            .await?
            .ok_or(DomainError::NotFound("Tipo de notificación"))?;
        let current = self.get_or_create_setting(user_id, ntype.id).await?;

        if let Some(send_time) = &patch.send_time {
            if NaiveTime::parse_from_str(send_time, "%H:%M:%S").is_err()
                && NaiveTime::parse_from_str(send_time, "%H:%M").is_err()
            {
                return Err(DomainError::validation("Hora de envío inválida (HH:MM).").into());
            }
        }
        if matches!(patch.days_ahead, Some(d) if d < 0) {
            return Err(DomainError::validation("Los días de anticipación no pueden ser negativos.").into());
        }
        let threshold_cents = match patch.amount_threshold {
            Some(amount) if amount < rust_decimal::Decimal::ZERO => {
                return Err(DomainError::validation("El monto límite no puede ser negativo.").into());
            }
            Some(amount) => Some(to_cents(amount).ok_or_else(|| DomainError::validation("Monto inválido."))?),
            None => current.amount_threshold_cents,
        };

        let mut changes = Vec::new();
        if let Some(v) = patch.email_enabled.filter(|v| *v != current.email_enabled) {
            changes.push(SettingChange { field: "email_enabled", new_value: v });
        }
        if let Some(v) = patch.push_enabled.filter(|v| *v != current.push_enabled) {
            changes.push(SettingChange { field: "push_enabled", new_value: v });
        }

        sqlx::query(
            r#"
            UPDATE notification_settings
            SET email_enabled = ?1, push_enabled = ?2, sms_enabled = ?3,
                digest_frequency = ?4, amount_threshold_cents = ?5, send_time = ?6,
                days_ahead = ?7, active = ?8, updated_at = ?9
            WHERE id = ?10
            "#,
        )
        .bind(patch.email_enabled.unwrap_or(current.email_enabled))
        .bind(patch.push_enabled.unwrap_or(current.push_enabled))
        .bind(patch.sms_enabled.unwrap_or(current.sms_enabled))
        .bind(patch.digest_frequency.as_deref().unwrap_or(&current.digest_frequency))
        .bind(threshold_cents)
        .bind(patch.send_time.as_deref().unwrap_or(&current.send_time))
        .bind(patch.days_ahead.unwrap_or(current.days_ahead))
        .bind(patch.active.unwrap_or(current.active))
        .bind(now_rfc3339())
        .bind(current.id)
        .execute(&self.db_pool)
        .await
        .context("Error actualizando configuración")?;

        let setting = self
            .setting_for(user_id, ntype.id)
            .await?
            .map(NotificationSetting::from)
            .context("Configuración no encontrada tras actualizar")?;

        let confirmation_sent = if changes.is_empty() {
            false
        } else {
            self.notify_settings_change(&recipient, &changes).await
        };

        log::info!(
            "(update_setting) Usuario {} actualizó '{}' ({} cambios)",
            user_id,
            type_name,
            changes.len()
        );
        Ok(UpdateSettingResponse {
            setting,
            changes,
            confirmation_sent,
        })
    }

    /// Solo se envía si el usuario tiene alguna configuración con email activo.
    async fn notify_settings_change(&self, recipient: &Recipient, changes: &[SettingChange]) -> bool {
        let has_email: Result<i64, _> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification_settings WHERE user_id = ?1 AND email_enabled = 1",
        )
        .bind(recipient.id)
        .fetch_one(&self.db_pool)
        .await;

        match has_email {
            Ok(0) => return false,
            Ok(_) => {}
            Err(e) => {
                log::error!("(notify_settings_change) {:?}", e);
                return false;
            }
        }

        let lines: Vec<String> = changes.iter().map(change_line).collect();
        let message = email_service::config_change_message(&lines);
        let html = email_service::config_change_html(&recipient.first_name, &message);

        match self
            .email_service
            .send(
                &recipient.email,
                "FinGest - Configuración de Notificaciones Actualizada",
                &html,
            )
            .await
        {
            Ok(sent) => {
                if sent {
                    log::info!("Email de confirmación de configuración enviado a {}", recipient.email);
                }
                sent
            }
            Err(e) => {
                log::error!("Error enviando email de configuración: {:?}", e);
                false
            }
        }
    }

    /// Reintenta los emails fallidos; devuelve cuántos salieron.
    pub async fn retry_failed_deliveries(&self, max_attempts: Option<i64>) -> Result<usize> {
        let max_attempts = max_attempts.unwrap_or(MAX_DELIVERY_ATTEMPTS);
        let pending = self.delivery_service.list_retryable("email", max_attempts).await?;
        let mut sent = 0;

        for delivery in pending {
            let notification = match self.fetch(delivery.notification_id).await {
                Ok(n) => n,
                Err(e) => {
                    log::error!("(retry_failed_deliveries) {}: {:?}", delivery.id, e);
                    continue;
                }
            };

            self.delivery_service
                .update_status(&delivery.id, "running", None, false)
                .await?;

            match self.send_notification_email(&notification).await {
                Ok(true) => {
                    self.delivery_service
                        .update_status(&delivery.id, "done", None, true)
                        .await?;
                    self.set_flag(notification.id, "email_sent").await?;
                    sqlx::query(
                        "UPDATE notifications SET status = 'enviada', sent_at = ?1 WHERE id = ?2 AND status = 'error'",
                    )
                    .bind(now_rfc3339())
                    .bind(notification.id)
                    .execute(&self.db_pool)
                    .await
                    .context("Error actualizando notificación reintentada")?;
                    sent += 1;
                }
                Ok(false) => {
                    self.delivery_service
                        .update_status(&delivery.id, "skipped", None, false)
                        .await?;
                }
                Err(e) => {
                    log::error!(
                        "(retry_failed_deliveries) Falló de nuevo la entrega {}: {:?}",
                        delivery.id,
                        e
                    );
                    self.delivery_service
                        .update_status(&delivery.id, "failed", Some(&format!("{:?}", e)), true)
                        .await?;
                }
            }
        }

        Ok(sent)
    }

    /// Ventana de deduplicación usada por los handlers post-guardado.
    pub fn dedup_since(minutes: i64) -> DateTime<Utc> {
        Utc::now() - Duration::minutes(minutes)
    }
}

fn change_line(change: &SettingChange) -> String {
    match (change.field, change.new_value) {
        ("email_enabled", true) => "✅ Notificaciones por email activadas",
        ("email_enabled", false) => "❌ Notificaciones por email desactivadas",
        ("push_enabled", true) => "🔔 Notificaciones push activadas",
        _ => "🔕 Notificaciones push desactivadas",
    }
    .to_string()
}
