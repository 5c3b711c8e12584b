//! config/app_config.rs
//! Configuración global del servicio, leída desde variables de entorno (.env).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

/// Datos de conexión SMTP. Si no hay host configurado el envío de correos queda deshabilitado.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from_email: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub workers: usize,
    pub smtp: Option<SmtpSettings>,
    /// Por debajo de este saldo se envía la alerta de saldo bajo
    pub low_balance_threshold: Decimal,
    pub signal_lock_ttl: Duration,
    pub goal_check_interval: Duration,
    pub delivery_retry_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: "sqlite:data/fingest.db".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: 5022,
            workers: 1,
            smtp: None,
            low_balance_threshold: Decimal::from(50),
            signal_lock_ttl: Duration::from_secs(60),
            goal_check_interval: Duration::from_secs(86_400),
            delivery_retry_interval: Duration::from_secs(300),
        }
    }
}

impl AppConfig {
    /// Construye la configuración a partir del entorno; lo que falte toma el valor por defecto.
    pub fn from_env() -> Self {
        let defaults = AppConfig::default();

        let smtp = env::var("SMTP_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .map(|host| {
                let user = env::var("SMTP_USER").unwrap_or_default();
                SmtpSettings {
                    host,
                    port: env_or("SMTP_PORT", 587),
                    pass: env::var("SMTP_PASS").unwrap_or_default(),
                    from_email: env::var("DEFAULT_FROM_EMAIL").unwrap_or_else(|_| user.clone()),
                    user,
                }
            });

        AppConfig {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: env_or("PORT", defaults.port),
            workers: env_or("WORKERS", defaults.workers),
            smtp,
            low_balance_threshold: env_or("LOW_BALANCE_THRESHOLD", defaults.low_balance_threshold),
            signal_lock_ttl: Duration::from_secs(env_or("SIGNAL_LOCK_TTL_SECS", 60)),
            goal_check_interval: Duration::from_secs(env_or("GOAL_CHECK_INTERVAL_SECS", 86_400)),
            delivery_retry_interval: Duration::from_secs(env_or(
                "DELIVERY_RETRY_INTERVAL_SECS",
                300,
            )),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Valor inválido para {}='{}', usando el valor por defecto", key, raw);
            default
        }),
        Err(_) => default,
    }
}
