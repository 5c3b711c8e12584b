//! models/report_model.rs
//! Estructuras de datos de reportes, gráficos y dashboard.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::transaction_model::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    ExpensesByCategory,
    IncomeVsExpenses,
    SubAccountAnalysis,
    BalanceSheet,
    CashFlow,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::ExpensesByCategory => "expenses_by_category",
            ReportKind::IncomeVsExpenses => "income_vs_expenses",
            ReportKind::SubAccountAnalysis => "sub_account_analysis",
            ReportKind::BalanceSheet => "balance_sheet",
            ReportKind::CashFlow => "cash_flow",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "expenses_by_category" => Some(ReportKind::ExpensesByCategory),
            "income_vs_expenses" => Some(ReportKind::IncomeVsExpenses),
            "sub_account_analysis" => Some(ReportKind::SubAccountAnalysis),
            "balance_sheet" => Some(ReportKind::BalanceSheet),
            "cash_flow" => Some(ReportKind::CashFlow),
            _ => None,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            ReportKind::ExpensesByCategory => "Gastos por Categoría",
            ReportKind::IncomeVsExpenses => "Ingresos vs Egresos",
            ReportKind::SubAccountAnalysis => "Análisis de Subcuentas",
            ReportKind::BalanceSheet => "Balance General",
            ReportKind::CashFlow => "Flujo de Efectivo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    CurrentWeek,
    #[default]
    CurrentMonth,
    CurrentQuarter,
    CurrentYear,
    Last30Days,
    Last90Days,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::CurrentWeek => "current_week",
            ReportPeriod::CurrentMonth => "current_month",
            ReportPeriod::CurrentQuarter => "current_quarter",
            ReportPeriod::CurrentYear => "current_year",
            ReportPeriod::Last30Days => "last_30_days",
            ReportPeriod::Last90Days => "last_90_days",
        }
    }

    /// Periodos desconocidos caen en el mes actual.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "current_week" => ReportPeriod::CurrentWeek,
            "current_quarter" => ReportPeriod::CurrentQuarter,
            "current_year" => ReportPeriod::CurrentYear,
            "last_30_days" => ReportPeriod::Last30Days,
            "last_90_days" => ReportPeriod::Last90Days,
            _ => ReportPeriod::CurrentMonth,
        }
    }
}

/// Rango de fechas inclusivo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralStats {
    pub total_balance: Decimal,
    pub sub_accounts_total: Decimal,
    pub period_income: Decimal,
    pub period_expenses: Decimal,
    pub period_balance: Decimal,
    pub account_count: i64,
    pub sub_account_count: i64,
    pub average_transaction: Decimal,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryBreakdown {
    pub labels: Vec<String>,
    pub data: Vec<Decimal>,
    pub counts: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeVsExpenses {
    pub labels: Vec<String>,
    pub data: Vec<Decimal>,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubAccountStats {
    pub labels: Vec<String>,
    pub balances: Vec<Decimal>,
    pub counts: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyFlow {
    pub labels: Vec<String>,
    pub income: Vec<Decimal>,
    pub expenses: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSheetSubAccount {
    pub name: String,
    pub kind: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSheetEntry {
    pub account: String,
    pub main_balance: Decimal,
    pub sub_accounts_balance: Decimal,
    pub total_balance: Decimal,
    pub sub_accounts: Vec<BalanceSheetSubAccount>,
}

/// Datos calculados de un reporte; el tipo se guarda aparte en la fila.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ReportData {
    ExpensesByCategory(CategoryBreakdown),
    IncomeVsExpenses(IncomeVsExpenses),
    SubAccountAnalysis(SubAccountStats),
    BalanceSheet(Vec<BalanceSheetEntry>),
    CashFlow(MonthlyFlow),
}

impl ReportData {
    pub fn from_json(kind: ReportKind, raw: &str) -> serde_json::Result<Self> {
        Ok(match kind {
            ReportKind::ExpensesByCategory => {
                ReportData::ExpensesByCategory(serde_json::from_str(raw)?)
            }
            ReportKind::IncomeVsExpenses => ReportData::IncomeVsExpenses(serde_json::from_str(raw)?),
            ReportKind::SubAccountAnalysis => {
                ReportData::SubAccountAnalysis(serde_json::from_str(raw)?)
            }
            ReportKind::BalanceSheet => ReportData::BalanceSheet(serde_json::from_str(raw)?),
            ReportKind::CashFlow => ReportData::CashFlow(serde_json::from_str(raw)?),
        })
    }
}

/// Vista procesada para pintar tablas (ítems con totales y porcentajes).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessedReport {
    ExpensesByCategory {
        items: Vec<CategoryItem>,
        total: Decimal,
        total_count: i64,
    },
    IncomeVsExpenses {
        income: Decimal,
        expenses: Decimal,
        balance: Decimal,
        expenses_pct: f64,
        balance_pct: f64,
    },
    SubAccountAnalysis {
        items: Vec<SubAccountItem>,
        total_balance: Decimal,
        total_count: i64,
        overall_average: Decimal,
    },
    CashFlow {
        items: Vec<CashFlowItem>,
    },
    BalanceSheet {
        entries: Vec<BalanceSheetEntry>,
        grand_total: Decimal,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryItem {
    pub category: String,
    pub amount: Decimal,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubAccountItem {
    pub kind: String,
    pub balance: Decimal,
    pub count: i64,
    pub average: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CashFlowItem {
    pub period: String,
    pub income: Decimal,
    pub expenses: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub data: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub id: i64,
    pub kind: ReportKind,
    pub kind_display: &'static str,
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub summary: ReportSummary,
    pub data: ReportData,
    pub processed: ProcessedReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListReportsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<ReportSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateReportRequest {
    pub kind: ReportKind,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    ExpensesByCategory,
    IncomeVsExpenses,
    SubAccounts,
    MonthlyFlow,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportSettings {
    pub user_id: i64,
    pub default_period: String,
    pub include_inactive_sub_accounts: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportsOverview {
    pub period: ReportPeriod,
    pub range: DateRange,
    pub stats: GeneralStats,
    pub expenses_by_category: CategoryBreakdown,
    pub income_vs_expenses: IncomeVsExpenses,
    pub sub_accounts: SubAccountStats,
    pub monthly_flow: MonthlyFlow,
    pub recent_reports: Vec<ReportSummary>,
    pub settings: ReportSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_income: Decimal,
    pub income_count: i64,
    pub total_expenses: Decimal,
    /// egresos / ingresos * 100
    pub expense_ratio: f64,
    pub total_balance: Decimal,
    pub currency_symbol: String,
    pub recent_transactions: Vec<Transaction>,
}
