//! services/email_service.rs

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
#[cfg(test)]
use lettre::transport::stub::AsyncStubTransport;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    config::app_config::SmtpSettings,
    models::{money::format_currency, notification_model::Notification},
};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Transporte de salida. En pruebas se reemplaza por el stub de lettre.
#[derive(Clone)]
enum Mailer {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    #[cfg(test)]
    Stub(AsyncStubTransport),
}

impl Mailer {
    async fn send(&self, message: Message) -> Result<()> {
        match self {
            Mailer::Smtp(transport) => {
                transport.send(message).await?;
            }
            #[cfg(test)]
            Mailer::Stub(transport) => {
                transport.send(message).await?;
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct EmailService {
    from: Option<Mailbox>,
    mailer: Option<Mailer>,
}

impl EmailService {
    /// Sin configuración SMTP el servicio queda deshabilitado: los envíos se
    /// registran en el log y se reportan como "no enviados".
    pub fn new(smtp: Option<&SmtpSettings>) -> Result<Self> {
        let Some(smtp) = smtp else {
            log::warn!("(EmailService::new) SMTP_HOST no configurado, envío de correos deshabilitado");
            return Ok(Self::disabled());
        };

        let from: Mailbox = format!("FinGest <{}>", smtp.from_email)
            .parse()
            .context("Invalid from address")?;

        let tls_params = TlsParameters::new(smtp.host.clone())?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
            .port(smtp.port)
            .credentials(Credentials::new(smtp.user.clone(), smtp.pass.clone()))
            .tls(Tls::Required(tls_params))
            .build();

        log::info!("(EmailService::new) SMTP listo en {}:{}", smtp.host, smtp.port);
        Ok(Self {
            from: Some(from),
            mailer: Some(Mailer::Smtp(mailer)),
        })
    }

    #[cfg(test)]
    pub fn with_stub(transport: AsyncStubTransport) -> Self {
        Self {
            from: "FinGest <no-reply@fingest.pe>".parse().ok(),
            mailer: Some(Mailer::Stub(transport)),
        }
    }

    pub fn disabled() -> Self {
        Self {
            from: None,
            mailer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Envía un correo HTML. `Ok(false)` si el servicio está deshabilitado.
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<bool> {
        let (Some(mailer), Some(from)) = (&self.mailer, &self.from) else {
            log::info!("(send) Correo a {} no enviado (SMTP deshabilitado): {}", to, subject);
            return Ok(false);
        };

        let to: Mailbox = to.parse().context("Invalid recipient address")?;
        let html_part = SinglePart::builder()
            .header(ContentType::parse("text/html; charset=utf-8")?)
            .body(html.to_string());

        let message = Message::builder()
            .from(from.clone())
            .to(to)
            .subject(subject)
            .multipart(MultiPart::mixed().singlepart(html_part))?;

        tokio::time::timeout(SEND_TIMEOUT, mailer.send(message))
            .await
            .context("Timeout enviando correo")??;

        Ok(true)
    }
}

/// Reemplaza cada `{clave}` del texto por su valor en el contexto.
pub fn render_template(template: &str, context: &BTreeMap<String, String>) -> String {
    context.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

/// Color del encabezado según el título de la notificación.
pub fn icon_color(title: &str) -> &'static str {
    let title = title.to_lowercase();
    if title.contains("gasto") || title.contains("egreso") {
        "#EF4444"
    } else if title.contains("ingreso") {
        "#10B981"
    } else if title.contains("meta") {
        "#8B5CF6"
    } else if title.contains("saldo") {
        "#F59E0B"
    } else {
        "#3B82F6"
    }
}

/// Asunto cuando el tipo no tiene plantilla activa.
pub fn default_subject(notification: &Notification) -> String {
    let extra = &notification.extra_data;
    let detail = extra
        .get("transaction_name")
        .or_else(|| extra.get("goal_name"))
        .and_then(Value::as_str);

    match detail {
        Some(name) => format!("FinGest - {}: {}", notification.title, name),
        None => format!("FinGest - {}", notification.title),
    }
}

fn decimal_field(extra: &Value, key: &str) -> Decimal {
    match extra.get(key) {
        Some(Value::String(s)) => s.parse().unwrap_or(Decimal::ZERO),
        Some(Value::Number(n)) => n.to_string().parse().unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Cuerpo HTML por defecto de una notificación.
pub fn default_html(notification: &Notification, currency_symbol: &str) -> String {
    let color = icon_color(&notification.title);
    let extra = &notification.extra_data;
    let mut details = String::new();

    if let Some(kind) = extra.get("transaction_kind").and_then(Value::as_str) {
        let (emoji, label) = if kind == "income" {
            ("💰", "Ingreso")
        } else {
            ("💸", "Gasto")
        };
        details.push_str(&format!(
            r#"<div style="background-color:#f8fafc;border-radius:8px;padding:16px;margin:20px 0;">
<h4 style="margin:0 0 10px 0;color:#1f2937;">📋 Detalles de la Transacción</h4>
<p><strong>Tipo:</strong> <span style="color:{color};font-weight:bold;">{emoji} {label}</span></p>
<p><strong>Monto:</strong> {amount}</p>
<p><strong>Cuenta:</strong> {account}</p>
<p><strong>Saldo actual:</strong> <span style="color:#059669;">{balance}</span></p>
</div>"#,
            amount = format_currency(decimal_field(extra, "amount"), currency_symbol),
            account = extra
                .get("account_name")
                .and_then(Value::as_str)
                .unwrap_or("N/A"),
            balance = format_currency(decimal_field(extra, "current_balance"), currency_symbol),
        ));
    }

    if let Some(goal) = extra.get("goal_name").and_then(Value::as_str) {
        let progress = extra.get("progress").and_then(Value::as_f64).unwrap_or(0.0);
        details.push_str(&format!(
            r#"<div style="background-color:#f0f9ff;border-radius:8px;padding:16px;margin:20px 0;">
<h4 style="margin:0 0 10px 0;color:#1f2937;">🎯 Información de la Meta</h4>
<p><strong>Meta:</strong> {goal}</p>
<p><strong>Progreso:</strong> <span style="color:#8B5CF6;">{progress:.1}%</span></p>
<p><strong>Objetivo:</strong> {target}</p>
</div>"#,
            target = format_currency(decimal_field(extra, "target_amount"), currency_symbol),
        ));
    }

    let action = notification
        .action_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<a href="{}" style="display:inline-block;background:{};color:white;padding:14px 28px;border-radius:8px;text-decoration:none;">🔍 Ver Detalles</a>"#,
                url, color
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>FinGest - {title}</title></head>
<body style="font-family:Arial,sans-serif;background:#f5f5f5;padding:20px;">
<div style="max-width:600px;margin:0 auto;background:white;border-radius:16px;overflow:hidden;">
<div style="background:{color};color:white;text-align:center;padding:30px 20px;">
<div style="font-size:28px;font-weight:800;">FinGest</div>
<div style="font-size:64px;margin:15px 0;">{icon}</div>
<p style="font-size:14px;margin:0;">Tu asistente financiero personal</p>
</div>
<div style="padding:30px;">
<div style="font-size:12px;font-weight:600;text-transform:uppercase;">{category}</div>
<h2 style="color:#1f2937;">{title}</h2>
<div style="color:#4b5563;line-height:1.6;white-space:pre-line;">{message}</div>
{details}
<div style="background:#f9fafb;border-radius:8px;padding:12px;text-align:center;color:#6b7280;">📅 {date}</div>
{action}
<div style="margin-top:40px;border-top:2px solid #e5e7eb;text-align:center;color:#6b7280;font-size:14px;">
<p>📧 Has recibido esta notificación porque tienes habilitadas las notificaciones por email en FinGest.</p>
</div>
</div>
</div>
</body>
</html>"#,
        title = notification.title,
        icon = notification.icon,
        category = notification.category,
        message = notification.message,
        date = notification.created_at.format("%d/%m/%Y %H:%M"),
    )
}

/// Mensaje con la lista de cambios de configuración.
pub fn config_change_message(lines: &[String]) -> String {
    format!(
        "Hemos actualizado tus preferencias de notificación:\n\n{}",
        lines.join("\n")
    )
}

pub fn config_change_html(first_name: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Configuración Actualizada</title></head>
<body style="font-family:Arial,sans-serif;background:#f5f5f5;padding:20px;">
<div style="max-width:600px;margin:0 auto;background:white;border-radius:10px;padding:30px;">
<div style="text-align:center;"><div style="font-size:24px;font-weight:bold;color:#3B82F6;">FinGest</div><div style="font-size:48px;">⚙️</div></div>
<div style="color:#1f2937;font-size:20px;font-weight:bold;">Configuración Actualizada</div>
<div style="color:#4b5563;line-height:1.6;white-space:pre-line;">Hola {first_name},

{message}

Estos cambios son efectivos inmediatamente. Puedes modificar tu configuración en cualquier momento desde tu panel de configuración.</div>
<div style="margin-top:30px;border-top:1px solid #e5e7eb;text-align:center;color:#6b7280;font-size:14px;">
<p>Si no realizaste estos cambios, por favor contacta con nuestro soporte.</p>
</div>
</div>
</body>
</html>"#
    )
}
