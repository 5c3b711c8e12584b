//! models/transaction_model.rs
//! Movimientos (ingresos y egresos) del libro de una cuenta.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::money::from_cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

pub const EXPENSE_CATEGORIES: [(&str, &str); 11] = [
    ("alimentacion", "🍽️ Alimentación"),
    ("transporte", "🚗 Transporte"),
    ("entretenimiento", "🎬 Entretenimiento"),
    ("salud", "🏥 Salud"),
    ("educacion", "📚 Educación"),
    ("compras", "🛒 Compras"),
    ("servicios", "🔧 Servicios"),
    ("vivienda", "🏠 Vivienda"),
    ("trabajo", "💼 Trabajo"),
    ("ahorros", "🎯 Ahorros/Metas"),
    ("otros", "📦 Otros"),
];

pub const INCOME_CATEGORIES: [(&str, &str); 6] = [
    ("salario", "💰 Salario"),
    ("freelance", "💻 Freelance"),
    ("negocio", "🏢 Negocio"),
    ("inversion", "📈 Inversión"),
    ("regalo", "🎁 Regalo"),
    ("otros", "📦 Otros"),
];

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }

    /// Nombre para mostrar en mensajes ("ingreso" / "egreso").
    pub fn display(&self) -> &'static str {
        match self {
            TransactionKind::Income => "ingreso",
            TransactionKind::Expense => "egreso",
        }
    }

    pub fn categories(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            TransactionKind::Income => &INCOME_CATEGORIES,
            TransactionKind::Expense => &EXPENSE_CATEGORIES,
        }
    }

    pub fn accepts_category(&self, category: &str) -> bool {
        self.categories().iter().any(|(key, _)| *key == category)
    }
}

/// Etiqueta con emoji de la categoría; cualquier cosa desconocida es "📦 Otros".
pub fn category_label(kind: TransactionKind, category: Option<&str>) -> &'static str {
    category
        .and_then(|c| kind.categories().iter().find(|(key, _)| *key == c))
        .map(|(_, label)| *label)
        .unwrap_or("📦 Otros")
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub account_name: String,
    pub name: String,
    pub kind: String,
    pub category: Option<String>,
    pub amount_cents: i64,
    pub occurred_at: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub account_name: String,
    pub name: String,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub category_label: &'static str,
    pub amount: Decimal,
    pub occurred_at: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = anyhow::Error;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind = TransactionKind::parse(&row.kind)
            .ok_or_else(|| anyhow::anyhow!("Tipo de movimiento desconocido: {}", row.kind))?;
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            account_id: row.account_id,
            account_name: row.account_name,
            name: row.name,
            kind,
            category_label: category_label(kind, row.category.as_deref()),
            category: row.category,
            amount: from_cents(row.amount_cents),
            occurred_at: row.occurred_at,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordTransactionRequest {
    pub account_id: i64,
    pub name: String,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub amount: Decimal,
    /// Si no viene se usa el momento del registro
    pub occurred_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordTransactionResponse {
    pub transaction: Transaction,
    pub account_balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionFilter {
    #[default]
    All,
    Income,
    Expenses,
}

/// Para listar movimientos con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListTransactionsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<Transaction>,
}
