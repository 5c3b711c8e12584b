//! models/account_model.rs
//! Cuentas principales, subcuentas y transferencias.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::money::{self, from_cents};

/// Color que se asigna cuando el cliente no elige uno.
pub const DEFAULT_SUB_ACCOUNT_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub balance_cents: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub balance: Decimal,
    /// saldo - saldo asignado a subcuentas vinculadas
    pub available_balance: Decimal,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    pub fn from_row(row: AccountRow, allocated_cents: i64) -> Self {
        Account {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            balance: from_cents(row.balance_cents),
            available_balance: from_cents(row.balance_cents - allocated_cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub description: Option<String>,
    pub initial_balance: Option<Decimal>,
}

/// Categorías de subcuenta: negocios y gestión personal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubAccountKind {
    TiendaOnline,
    TiendaFisica,
    ServiciosProfesionales,
    Freelance,
    NegocioPropio,
    IngresosPasivos,
    VentasProductos,
    Consultoria,
    AlquilerPropiedades,
    AhorroMeta,
    Emergencia,
    Inversion,
    GastosFijos,
    GastosVariables,
    Entretenimiento,
    Viajes,
    Educacion,
    Salud,
    Familia,
    Otros,
}

impl SubAccountKind {
    pub const ALL: [SubAccountKind; 20] = [
        SubAccountKind::TiendaOnline,
        SubAccountKind::TiendaFisica,
        SubAccountKind::ServiciosProfesionales,
        SubAccountKind::Freelance,
        SubAccountKind::NegocioPropio,
        SubAccountKind::IngresosPasivos,
        SubAccountKind::VentasProductos,
        SubAccountKind::Consultoria,
        SubAccountKind::AlquilerPropiedades,
        SubAccountKind::AhorroMeta,
        SubAccountKind::Emergencia,
        SubAccountKind::Inversion,
        SubAccountKind::GastosFijos,
        SubAccountKind::GastosVariables,
        SubAccountKind::Entretenimiento,
        SubAccountKind::Viajes,
        SubAccountKind::Educacion,
        SubAccountKind::Salud,
        SubAccountKind::Familia,
        SubAccountKind::Otros,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubAccountKind::TiendaOnline => "tienda_online",
            SubAccountKind::TiendaFisica => "tienda_fisica",
            SubAccountKind::ServiciosProfesionales => "servicios_profesionales",
            SubAccountKind::Freelance => "freelance",
            SubAccountKind::NegocioPropio => "negocio_propio",
            SubAccountKind::IngresosPasivos => "ingresos_pasivos",
            SubAccountKind::VentasProductos => "ventas_productos",
            SubAccountKind::Consultoria => "consultoria",
            SubAccountKind::AlquilerPropiedades => "alquiler_propiedades",
            SubAccountKind::AhorroMeta => "ahorro_meta",
            SubAccountKind::Emergencia => "emergencia",
            SubAccountKind::Inversion => "inversion",
            SubAccountKind::GastosFijos => "gastos_fijos",
            SubAccountKind::GastosVariables => "gastos_variables",
            SubAccountKind::Entretenimiento => "entretenimiento",
            SubAccountKind::Viajes => "viajes",
            SubAccountKind::Educacion => "educacion",
            SubAccountKind::Salud => "salud",
            SubAccountKind::Familia => "familia",
            SubAccountKind::Otros => "otros",
        }
    }

    /// Valores desconocidos en DB se tratan como "otros".
    pub fn parse(raw: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == raw)
            .unwrap_or(SubAccountKind::Otros)
    }

    pub fn is_business(&self) -> bool {
        matches!(
            self,
            SubAccountKind::TiendaOnline
                | SubAccountKind::TiendaFisica
                | SubAccountKind::ServiciosProfesionales
                | SubAccountKind::Freelance
                | SubAccountKind::NegocioPropio
                | SubAccountKind::IngresosPasivos
                | SubAccountKind::VentasProductos
                | SubAccountKind::Consultoria
                | SubAccountKind::AlquilerPropiedades
        )
    }

    pub fn color(&self) -> &'static str {
        match self {
            SubAccountKind::TiendaOnline => "#1E40AF",
            SubAccountKind::TiendaFisica => "#059669",
            SubAccountKind::ServiciosProfesionales => "#7C3AED",
            SubAccountKind::Freelance => "#DC2626",
            SubAccountKind::NegocioPropio => "#EA580C",
            SubAccountKind::IngresosPasivos => "#10B981",
            SubAccountKind::VentasProductos => "#2563EB",
            SubAccountKind::Consultoria => "#8B5CF6",
            SubAccountKind::AlquilerPropiedades => "#059669",
            SubAccountKind::AhorroMeta => "#00b894",
            SubAccountKind::Emergencia => "#ff6b6b",
            SubAccountKind::Inversion => "#74b9ff",
            SubAccountKind::GastosFijos => "#636e72",
            SubAccountKind::GastosVariables => "#a29bfe",
            SubAccountKind::Entretenimiento => "#fd79a8",
            SubAccountKind::Viajes => "#6c5ce7",
            SubAccountKind::Educacion => "#fdcb6e",
            SubAccountKind::Salud => "#55efc4",
            SubAccountKind::Familia => "#e17055",
            SubAccountKind::Otros => "#636e72",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubAccountKind::TiendaOnline => "🛍️ Tienda Online",
            SubAccountKind::TiendaFisica => "🏪 Tienda Física",
            SubAccountKind::ServiciosProfesionales => "💼 Servicios Profesionales",
            SubAccountKind::Freelance => "💻 Trabajo Freelance",
            SubAccountKind::NegocioPropio => "🏢 Negocio Propio",
            SubAccountKind::IngresosPasivos => "💸 Ingresos Pasivos",
            SubAccountKind::VentasProductos => "📦 Ventas de Productos",
            SubAccountKind::Consultoria => "🎯 Consultoría",
            SubAccountKind::AlquilerPropiedades => "🏠 Alquiler de Propiedades",
            SubAccountKind::AhorroMeta => "🎯 Ahorro para Meta",
            SubAccountKind::Emergencia => "🚨 Fondo de Emergencia",
            SubAccountKind::Inversion => "📈 Inversiones",
            SubAccountKind::GastosFijos => "🔒 Gastos Fijos",
            SubAccountKind::GastosVariables => "📊 Gastos Variables",
            SubAccountKind::Entretenimiento => "🎭 Entretenimiento",
            SubAccountKind::Viajes => "✈️ Viajes y Vacaciones",
            SubAccountKind::Educacion => "📚 Educación y Cursos",
            SubAccountKind::Salud => "🏥 Salud y Bienestar",
            SubAccountKind::Familia => "👨‍👩‍👧‍👦 Gastos Familiares",
            SubAccountKind::Otros => "📁 Otros",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubAccountRow {
    pub id: i64,
    pub account_id: Option<i64>,
    pub owner_id: Option<i64>,
    /// Usuario efectivo: propietario directo o dueño de la cuenta principal
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub color: String,
    pub balance_cents: i64,
    pub active: bool,
    pub is_business: bool,
    pub target_cents: Option<i64>,
    pub target_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubAccount {
    pub id: i64,
    pub account_id: Option<i64>,
    pub owner_id: Option<i64>,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub kind: SubAccountKind,
    pub kind_label: &'static str,
    pub color: String,
    pub balance: Decimal,
    pub active: bool,
    pub is_business: bool,
    pub is_independent: bool,
    pub target_amount: Option<Decimal>,
    pub target_date: Option<NaiveDate>,
    pub goal_progress: f64,
    pub days_to_target: Option<i64>,
    pub goal_reached: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl SubAccount {
    pub fn from_row(row: SubAccountRow, today: NaiveDate) -> Self {
        let kind = SubAccountKind::parse(&row.kind);
        let balance = from_cents(row.balance_cents);
        let target_amount = row.target_cents.map(from_cents);
        let target_date = row
            .target_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        SubAccount {
            id: row.id,
            account_id: row.account_id,
            owner_id: row.owner_id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            kind,
            kind_label: kind.label(),
            color: row.color,
            balance,
            active: row.active,
            is_business: row.is_business,
            is_independent: row.owner_id.is_some() && row.account_id.is_none(),
            target_amount,
            target_date,
            goal_progress: goal_progress(balance, target_amount),
            days_to_target: days_to_target(target_date, today),
            goal_reached: target_amount.map(|t| balance >= t).unwrap_or(false),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn from_row_now(row: SubAccountRow) -> Self {
        Self::from_row(row, Utc::now().date_naive())
    }
}

/// Progreso hacia la meta en %, máximo 100. Sin meta (o meta <= 0) es 0.
pub fn goal_progress(balance: Decimal, target: Option<Decimal>) -> f64 {
    match target {
        Some(t) if t > Decimal::ZERO => money::percentage(balance, t).min(100.0),
        _ => 0.0,
    }
}

/// Días hasta la fecha meta; 0 si ya pasó.
pub fn days_to_target(target_date: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    let date = target_date?;
    if date <= today {
        return Some(0);
    }
    Some((date - today).num_days())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubAccountRequest {
    pub name: String,
    pub description: Option<String>,
    pub kind: Option<SubAccountKind>,
    pub color: Option<String>,
    pub account_id: Option<i64>,
    /// Subcuentas independientes: propietario directo
    pub independent: Option<bool>,
    pub initial_balance: Option<Decimal>,
    pub target_amount: Option<Decimal>,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubAccountTransferRequest {
    pub from_id: i64,
    pub to_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainTransferKind {
    /// Subcuenta -> cuenta principal
    Deposit,
    /// Cuenta principal -> subcuenta
    Withdrawal,
}

impl MainTransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MainTransferKind::Deposit => "deposit",
            MainTransferKind::Withdrawal => "withdrawal",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainAccountTransferRequest {
    pub account_id: Option<i64>,
    pub kind: MainTransferKind,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub transfer_id: i64,
    pub amount: Decimal,
    pub source_balance: Decimal,
    pub target_balance: Decimal,
    pub message: String,
}
