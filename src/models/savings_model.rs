//! models/savings_model.rs
//! Metas de ahorro y sus aportes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::money::{self, from_cents};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContributionFrequency {
    Diaria,
    Semanal,
    Quincenal,
    #[default]
    Mensual,
    Bimestral,
    Trimestral,
    Semestral,
    Anual,
}

impl ContributionFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionFrequency::Diaria => "diaria",
            ContributionFrequency::Semanal => "semanal",
            ContributionFrequency::Quincenal => "quincenal",
            ContributionFrequency::Mensual => "mensual",
            ContributionFrequency::Bimestral => "bimestral",
            ContributionFrequency::Trimestral => "trimestral",
            ContributionFrequency::Semestral => "semestral",
            ContributionFrequency::Anual => "anual",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SavingsGoalRow {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub name: String,
    pub description: String,
    pub target_cents: i64,
    pub start_date: String,
    pub deadline: String,
    pub frequency: String,
    pub created_at: String,
    /// Suma de aportes, calculada en la consulta
    pub saved_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingsGoal {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub name: String,
    pub description: String,
    pub target_amount: Decimal,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    pub frequency: String,
    pub saved: Decimal,
    pub progress: f64,
    pub remaining: Decimal,
    pub reached: bool,
    pub created_at: String,
}

impl TryFrom<SavingsGoalRow> for SavingsGoal {
    type Error = anyhow::Error;

    fn try_from(row: SavingsGoalRow) -> Result<Self, Self::Error> {
        let target = from_cents(row.target_cents);
        let saved = from_cents(row.saved_cents);
        Ok(SavingsGoal {
            id: row.id,
            user_id: row.user_id,
            account_id: row.account_id,
            name: row.name,
            description: row.description,
            target_amount: target,
            start_date: NaiveDate::parse_from_str(&row.start_date, "%Y-%m-%d")?,
            deadline: NaiveDate::parse_from_str(&row.deadline, "%Y-%m-%d")?,
            frequency: row.frequency,
            progress: progress(saved, target),
            remaining: remaining(saved, target),
            reached: saved >= target,
            saved,
            created_at: row.created_at,
        })
    }
}

/// % ahorrado respecto al objetivo, tope 100.
pub fn progress(saved: Decimal, target: Decimal) -> f64 {
    money::percentage(saved, target).min(100.0)
}

/// Lo que falta para la meta, nunca negativo.
pub fn remaining(saved: Decimal, target: Decimal) -> Decimal {
    (target - saved).max(Decimal::ZERO)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGoalRequest {
    pub account_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub frequency: ContributionFrequency,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContributionRow {
    pub id: i64,
    pub goal_id: i64,
    pub user_id: i64,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub id: i64,
    pub goal_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<ContributionRow> for Contribution {
    fn from(row: ContributionRow) -> Self {
        Contribution {
            id: row.id,
            goal_id: row.goal_id,
            user_id: row.user_id,
            amount: from_cents(row.amount_cents),
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddContributionRequest {
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddContributionResponse {
    pub contribution: Contribution,
    pub goal: SavingsGoal,
}
