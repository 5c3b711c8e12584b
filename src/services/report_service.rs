//! services/report_service.rs
//! Estadísticas, datos para gráficos y reportes guardados.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Pool, Sqlite};

use crate::{
    errors::DomainError,
    models::{
        account_model::SubAccountKind,
        money::{from_cents, normalize, percentage},
        report_model::{
            BalanceSheetEntry, BalanceSheetSubAccount, CashFlowItem, CategoryBreakdown,
            CategoryItem, ChartKind, Dashboard, DateRange, GenerateReportRequest, GeneralStats,
            IncomeVsExpenses, ListReportsResponse, MonthlyFlow, ProcessedReport, ReportData,
            ReportDetail, ReportKind, ReportPeriod, ReportRow, ReportSettings, ReportSummary,
            ReportsOverview, SubAccountItem, SubAccountStats,
        },
        transaction_model::{category_label, TransactionKind},
    },
    services::{now_rfc3339, paginate, transaction_service::TransactionService},
};

const RECENT_TRANSACTIONS: i64 = 10;
const RECENT_REPORTS: u64 = 5;
/// Años aceptados en reportes personalizados.
const MIN_REPORT_YEAR: i32 = 1900;
const MAX_REPORT_YEAR: i32 = 9999;
/// Un reporte cubre como máximo diez años.
const MAX_REPORT_DAYS: i64 = 3660;

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Rango de fechas (inclusivo) de un periodo respecto de `today`.
pub fn period_range(period: ReportPeriod, today: NaiveDate) -> DateRange {
    match period {
        ReportPeriod::CurrentWeek => {
            let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            DateRange {
                start,
                end: start + Duration::days(6),
            }
        }
        ReportPeriod::CurrentMonth => DateRange {
            start: first_day_of_month(today),
            end: last_day_of_month(today.year(), today.month()),
        },
        ReportPeriod::CurrentQuarter => {
            let first_month = (today.month() - 1) / 3 * 3 + 1;
            DateRange {
                start: NaiveDate::from_ymd_opt(today.year(), first_month, 1).unwrap_or(today),
                end: last_day_of_month(today.year(), first_month + 2),
            }
        }
        ReportPeriod::CurrentYear => DateRange {
            start: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
            end: NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
        },
        ReportPeriod::Last30Days => DateRange {
            start: today - Duration::days(30),
            end: today,
        },
        ReportPeriod::Last90Days => DateRange {
            start: today - Duration::days(90),
            end: today,
        },
    }
}

/// Límites como texto para comparar contra `occurred_at` (RFC 3339):
/// [inicio, fin + 1 día).
fn range_bounds(range: &DateRange) -> (String, String) {
    (
        range.start.to_string(),
        range.end.succ_opt().unwrap_or(range.end).to_string(),
    )
}

/// Rango personalizado de un reporte: ordenado, dentro de años válidos y
/// con una extensión acotada.
pub fn validate_report_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, DomainError> {
    if end < start {
        return Err(DomainError::validation(
            "La fecha de fin no puede ser anterior a la fecha de inicio.",
        ));
    }
    let years = MIN_REPORT_YEAR..=MAX_REPORT_YEAR;
    if !years.contains(&start.year()) || !years.contains(&end.year()) {
        return Err(DomainError::validation(format!(
            "Las fechas del reporte deben estar entre los años {} y {}.",
            MIN_REPORT_YEAR, MAX_REPORT_YEAR
        )));
    }
    if end.signed_duration_since(start).num_days() >= MAX_REPORT_DAYS {
        return Err(DomainError::validation(
            "El periodo de un reporte no puede superar los 10 años.",
        ));
    }
    Ok(DateRange { start, end })
}

/// Vista de tabla a partir de los datos guardados de un reporte.
pub fn process_report(data: &ReportData) -> ProcessedReport {
    match data {
        ReportData::ExpensesByCategory(d) => {
            let total: Decimal = d.data.iter().sum();
            let items = d
                .labels
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let amount = d.data.get(i).copied().unwrap_or(Decimal::ZERO);
                    CategoryItem {
                        category: label.clone(),
                        amount,
                        count: d.counts.get(i).copied().unwrap_or(0),
                        percentage: percentage(amount, total),
                    }
                })
                .collect();
            ProcessedReport::ExpensesByCategory {
                items,
                total,
                total_count: d.counts.iter().sum(),
            }
        }
        ReportData::IncomeVsExpenses(d) => {
            let income = d.data.first().copied().unwrap_or(Decimal::ZERO);
            let expenses = d.data.get(1).copied().unwrap_or(Decimal::ZERO);
            let balance = income - expenses;
            ProcessedReport::IncomeVsExpenses {
                income,
                expenses,
                balance,
                expenses_pct: percentage(expenses, income),
                balance_pct: percentage(balance, income),
            }
        }
        ReportData::SubAccountAnalysis(d) => {
            let items = d
                .labels
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let balance = d.balances.get(i).copied().unwrap_or(Decimal::ZERO);
                    let count = d.counts.get(i).copied().unwrap_or(0);
                    SubAccountItem {
                        kind: label.clone(),
                        balance,
                        count,
                        average: average(balance, count),
                    }
                })
                .collect();
            let total_balance: Decimal = d.balances.iter().sum();
            let total_count: i64 = d.counts.iter().sum();
            ProcessedReport::SubAccountAnalysis {
                items,
                total_balance,
                total_count,
                overall_average: average(total_balance, total_count),
            }
        }
        ReportData::CashFlow(d) => ProcessedReport::CashFlow {
            items: d
                .labels
                .iter()
                .enumerate()
                .map(|(i, period)| {
                    let income = d.income.get(i).copied().unwrap_or(Decimal::ZERO);
                    let expenses = d.expenses.get(i).copied().unwrap_or(Decimal::ZERO);
                    CashFlowItem {
                        period: period.clone(),
                        income,
                        expenses,
                        balance: income - expenses,
                    }
                })
                .collect(),
        },
        ReportData::BalanceSheet(entries) => ProcessedReport::BalanceSheet {
            grand_total: entries.iter().map(|e| e.total_balance).sum(),
            entries: entries.clone(),
        },
    }
}

fn average(total: Decimal, count: i64) -> Decimal {
    if count > 0 {
        normalize(total / Decimal::from(count))
    } else {
        Decimal::ZERO
    }
}

#[derive(Clone)]
pub struct ReportService {
    db_pool: Pool<Sqlite>,
    transactions: TransactionService,
}

impl ReportService {
    pub fn new(db_pool: Pool<Sqlite>, transactions: TransactionService) -> Self {
        Self {
            db_pool,
            transactions,
        }
    }

    async fn sum_kind(&self, user_id: i64, kind: TransactionKind, range: Option<&DateRange>) -> Result<(i64, i64)> {
        let (from, to) = match range {
            Some(r) => {
                let (from, to) = range_bounds(r);
                (Some(from), Some(to))
            }
            None => (None, None),
        };
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0), COUNT(*)
            FROM transactions
            WHERE user_id = ?1 AND kind = ?2
              AND (?3 IS NULL OR occurred_at >= ?3)
              AND (?4 IS NULL OR occurred_at < ?4)
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(from)
        .bind(to)
        .fetch_one(&self.db_pool)
        .await
        .context("Error sumando movimientos")
    }

    pub async fn general_stats(&self, user_id: i64, range: &DateRange) -> Result<GeneralStats> {
        let (balance_cents, account_count): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(balance_cents), 0), COUNT(*) FROM accounts WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Error sumando cuentas")?;

        let (sub_cents, sub_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(s.balance_cents), 0), COUNT(*)
            FROM sub_accounts s LEFT JOIN accounts a ON a.id = s.account_id
            WHERE COALESCE(s.owner_id, a.user_id) = ?1 AND s.active = 1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Error sumando subcuentas")?;

        let (income_cents, income_count) = self.sum_kind(user_id, TransactionKind::Income, Some(range)).await?;
        let (expense_cents, expense_count) = self.sum_kind(user_id, TransactionKind::Expense, Some(range)).await?;

        let income = from_cents(income_cents);
        let expenses = from_cents(expense_cents);
        let count = income_count + expense_count;

        Ok(GeneralStats {
            total_balance: from_cents(balance_cents),
            sub_accounts_total: from_cents(sub_cents),
            period_income: income,
            period_expenses: expenses,
            period_balance: income - expenses,
            account_count,
            sub_account_count: sub_count,
            average_transaction: average(income + expenses, count),
            transaction_count: count,
        })
    }

    /// Egresos del periodo agrupados por categoría, mayor total primero.
    pub async fn expenses_by_category(&self, user_id: i64, range: &DateRange) -> Result<CategoryBreakdown> {
        let (from, to) = range_bounds(range);
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT COALESCE(category, 'otros') AS cat, SUM(amount_cents) AS total, COUNT(*) AS n
            FROM transactions
            WHERE user_id = ?1 AND kind = 'expense' AND occurred_at >= ?2 AND occurred_at < ?3
            GROUP BY cat
            ORDER BY total DESC, cat
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db_pool)
        .await
        .context("Error agrupando gastos por categoría")?;

        let mut breakdown = CategoryBreakdown {
            labels: Vec::with_capacity(rows.len()),
            data: Vec::with_capacity(rows.len()),
            counts: Vec::with_capacity(rows.len()),
        };
        for (category, total, count) in rows {
            breakdown
                .labels
                .push(category_label(TransactionKind::Expense, Some(&category)).to_string());
            breakdown.data.push(from_cents(total));
            breakdown.counts.push(count);
        }
        Ok(breakdown)
    }

    pub async fn income_vs_expenses(&self, user_id: i64, range: &DateRange) -> Result<IncomeVsExpenses> {
        let (income, _) = self.sum_kind(user_id, TransactionKind::Income, Some(range)).await?;
        let (expenses, _) = self.sum_kind(user_id, TransactionKind::Expense, Some(range)).await?;
        Ok(IncomeVsExpenses {
            labels: vec!["Ingresos".to_string(), "Egresos".to_string()],
            data: vec![from_cents(income), from_cents(expenses)],
            balance: from_cents(income - expenses),
        })
    }

    /// Saldo y cantidad de subcuentas por tipo.
    pub async fn sub_account_stats(&self, user_id: i64, include_inactive: bool) -> Result<SubAccountStats> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT s.kind, COALESCE(SUM(s.balance_cents), 0) AS total, COUNT(*) AS n
            FROM sub_accounts s LEFT JOIN accounts a ON a.id = s.account_id
            WHERE COALESCE(s.owner_id, a.user_id) = ?1 AND (?2 OR s.active = 1)
            GROUP BY s.kind
            ORDER BY total DESC, s.kind
            "#,
        )
        .bind(user_id)
        .bind(include_inactive)
        .fetch_all(&self.db_pool)
        .await
        .context("Error agrupando subcuentas")?;

        let mut stats = SubAccountStats {
            labels: Vec::with_capacity(rows.len()),
            balances: Vec::with_capacity(rows.len()),
            counts: Vec::with_capacity(rows.len()),
        };
        for (kind, total, count) in rows {
            stats.labels.push(SubAccountKind::parse(&kind).label().to_string());
            stats.balances.push(from_cents(total));
            stats.counts.push(count);
        }
        Ok(stats)
    }

    /// Ingresos y egresos por mes calendario dentro del rango.
    pub async fn monthly_flow(&self, user_id: i64, range: &DateRange) -> Result<MonthlyFlow> {
        let mut flow = MonthlyFlow {
            labels: vec![],
            income: vec![],
            expenses: vec![],
        };

        let mut month_start = first_day_of_month(range.start);
        while month_start <= range.end {
            let month_end = last_day_of_month(month_start.year(), month_start.month());
            let window = DateRange {
                start: month_start.max(range.start),
                end: month_end.min(range.end),
            };

            let (income, _) = self.sum_kind(user_id, TransactionKind::Income, Some(&window)).await?;
            let (expenses, _) = self.sum_kind(user_id, TransactionKind::Expense, Some(&window)).await?;

            flow.labels.push(month_start.format("%B %Y").to_string());
            flow.income.push(from_cents(income));
            flow.expenses.push(from_cents(expenses));

            month_start = match month_end.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        Ok(flow)
    }

    /// Por cuenta: saldo principal, subcuentas activas vinculadas y total.
    pub async fn balance_sheet(&self, user_id: i64) -> Result<Vec<BalanceSheetEntry>> {
        let accounts: Vec<(i64, String, i64)> =
            sqlx::query_as("SELECT id, name, balance_cents FROM accounts WHERE user_id = ?1 ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.db_pool)
                .await
                .context("Error leyendo cuentas")?;

        let mut entries = Vec::with_capacity(accounts.len());
        for (account_id, name, balance_cents) in accounts {
            let subs: Vec<(String, String, i64)> = sqlx::query_as(
                "SELECT name, kind, balance_cents FROM sub_accounts WHERE account_id = ?1 AND active = 1 ORDER BY id",
            )
            .bind(account_id)
            .fetch_all(&self.db_pool)
            .await
            .context("Error leyendo subcuentas de la cuenta")?;

            let sub_total: i64 = subs.iter().map(|(_, _, b)| b).sum();
            entries.push(BalanceSheetEntry {
                account: name,
                main_balance: from_cents(balance_cents),
                sub_accounts_balance: from_cents(sub_total),
                total_balance: from_cents(balance_cents + sub_total),
                sub_accounts: subs
                    .into_iter()
                    .map(|(name, kind, balance)| BalanceSheetSubAccount {
                        name,
                        kind,
                        balance: from_cents(balance),
                    })
                    .collect(),
            });
        }
        Ok(entries)
    }

    async fn compute(&self, user_id: i64, kind: ReportKind, range: &DateRange) -> Result<ReportData> {
        Ok(match kind {
            ReportKind::ExpensesByCategory => {
                ReportData::ExpensesByCategory(self.expenses_by_category(user_id, range).await?)
            }
            ReportKind::IncomeVsExpenses => {
                ReportData::IncomeVsExpenses(self.income_vs_expenses(user_id, range).await?)
            }
            ReportKind::SubAccountAnalysis => {
                let settings = self.report_settings(user_id).await?;
                ReportData::SubAccountAnalysis(
                    self.sub_account_stats(user_id, settings.include_inactive_sub_accounts)
                        .await?,
                )
            }
            ReportKind::BalanceSheet => ReportData::BalanceSheet(self.balance_sheet(user_id).await?),
            ReportKind::CashFlow => ReportData::CashFlow(self.monthly_flow(user_id, range).await?),
        })
    }

    pub async fn generate_report(&self, user_id: i64, req: GenerateReportRequest) -> Result<ReportDetail> {
        let range = validate_report_range(req.start_date, req.end_date)?;
        self.ensure_user(user_id).await?;

        let data = self.compute(user_id, req.kind, &range).await?;
        let title = req
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Reporte {}", req.kind.display()));

        let id = sqlx::query(
            r#"
            INSERT INTO reports (user_id, kind, title, description, start_date, end_date, data, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(user_id)
        .bind(req.kind.as_str())
        .bind(&title)
        .bind(req.description.as_deref())
        .bind(range.start.to_string())
        .bind(range.end.to_string())
        .bind(serde_json::to_string(&data)?)
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Error guardando reporte")?
        .last_insert_rowid();

        log::info!("(generate_report) Reporte \"{}\" ({}) generado", title, id);
        self.get_report(user_id, id).await
    }

    fn summary(row: &ReportRow) -> Result<ReportSummary> {
        let kind = ReportKind::parse(&row.kind)
            .with_context(|| format!("Tipo de reporte desconocido: {}", row.kind))?;
        Ok(ReportSummary {
            id: row.id,
            kind,
            kind_display: kind.display(),
            title: row.title.clone(),
            description: row.description.clone(),
            start_date: row.start_date.clone(),
            end_date: row.end_date.clone(),
            created_at: row.created_at.clone(),
        })
    }

    pub async fn get_report(&self, user_id: i64, id: i64) -> Result<ReportDetail> {
        let row = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT id, user_id, kind, title, description, start_date, end_date, data, created_at
            FROM reports WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo reporte")?
        .ok_or(DomainError::NotFound("Reporte"))?;

        let summary = Self::summary(&row)?;
        let data = ReportData::from_json(summary.kind, &row.data).context("Datos de reporte corruptos")?;
        let processed = process_report(&data);
        Ok(ReportDetail {
            summary,
            data,
            processed,
        })
    }

    pub async fn list_reports(&self, user_id: i64, page: u64, page_size: u64) -> Result<ListReportsResponse> {
        let (page, page_size, offset) = paginate(page, page_size);
        let rows = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT id, user_id, kind, title, description, start_date, end_date, data, created_at
            FROM reports WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(user_id)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando reportes")?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.db_pool)
            .await
            .context("Error contando reportes")?;

        Ok(ListReportsResponse {
            total: total as u64,
            page,
            page_size,
            items: rows.iter().map(Self::summary).collect::<Result<Vec<_>>>()?,
        })
    }

    /// Datos de un gráfico para el periodo pedido.
    pub async fn chart_data(
        &self,
        user_id: i64,
        kind: ChartKind,
        period: ReportPeriod,
        today: NaiveDate,
    ) -> Result<Value> {
        let range = period_range(period, today);
        Ok(match kind {
            ChartKind::ExpensesByCategory => {
                serde_json::to_value(self.expenses_by_category(user_id, &range).await?)?
            }
            ChartKind::IncomeVsExpenses => {
                serde_json::to_value(self.income_vs_expenses(user_id, &range).await?)?
            }
            ChartKind::SubAccounts => serde_json::to_value(self.sub_account_stats(user_id, false).await?)?,
            ChartKind::MonthlyFlow => serde_json::to_value(self.monthly_flow(user_id, &range).await?)?,
        })
    }

    /// Pantalla principal de reportes; sin periodo usa el de la configuración.
    pub async fn overview(&self, user_id: i64, period: Option<&str>, today: NaiveDate) -> Result<ReportsOverview> {
        let settings = self.report_settings(user_id).await?;
        let period = ReportPeriod::parse_or_default(period.unwrap_or(settings.default_period.as_str()));
        let range = period_range(period, today);

        Ok(ReportsOverview {
            period,
            range,
            stats: self.general_stats(user_id, &range).await?,
            expenses_by_category: self.expenses_by_category(user_id, &range).await?,
            income_vs_expenses: self.income_vs_expenses(user_id, &range).await?,
            sub_accounts: self
                .sub_account_stats(user_id, settings.include_inactive_sub_accounts)
                .await?,
            monthly_flow: self.monthly_flow(user_id, &range).await?,
            recent_reports: self.list_reports(user_id, 1, RECENT_REPORTS).await?.items,
            settings,
        })
    }

    /// Totales históricos del usuario y sus últimos movimientos.
    pub async fn dashboard(&self, user_id: i64) -> Result<Dashboard> {
        let symbol: String = sqlx::query_scalar(
            "SELECT c.symbol FROM users u JOIN currencies c ON c.id = u.currency_id WHERE u.id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo moneda del usuario")?
        .ok_or(DomainError::NotFound("Usuario"))?;

        let (income_cents, income_count) = self.sum_kind(user_id, TransactionKind::Income, None).await?;
        let (expense_cents, _) = self.sum_kind(user_id, TransactionKind::Expense, None).await?;
        let income = from_cents(income_cents);
        let expenses = from_cents(expense_cents);

        Ok(Dashboard {
            total_income: income,
            income_count,
            total_expenses: expenses,
            expense_ratio: percentage(expenses, income),
            total_balance: income - expenses,
            currency_symbol: symbol,
            recent_transactions: self.transactions.recent(user_id, RECENT_TRANSACTIONS).await?,
        })
    }

    async fn ensure_user(&self, user_id: i64) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error buscando usuario")?;
        exists.map(|_| ()).ok_or_else(|| DomainError::NotFound("Usuario").into())
    }

    pub async fn report_settings(&self, user_id: i64) -> Result<ReportSettings> {
        self.ensure_user(user_id).await?;
        sqlx::query("INSERT OR IGNORE INTO report_settings (user_id) VALUES (?1)")
            .bind(user_id)
            .execute(&self.db_pool)
            .await
            .context("Error creando configuración de reportes")?;

        sqlx::query_as::<_, ReportSettings>(
            "SELECT user_id, default_period, include_inactive_sub_accounts FROM report_settings WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .context("Error leyendo configuración de reportes")
    }

    pub async fn update_report_settings(
        &self,
        user_id: i64,
        default_period: Option<ReportPeriod>,
        include_inactive_sub_accounts: Option<bool>,
    ) -> Result<ReportSettings> {
        let current = self.report_settings(user_id).await?;
        sqlx::query(
            "UPDATE report_settings SET default_period = ?1, include_inactive_sub_accounts = ?2 WHERE user_id = ?3",
        )
        .bind(
            default_period
                .map(|p| p.as_str().to_string())
                .unwrap_or(current.default_period),
        )
        .bind(include_inactive_sub_accounts.unwrap_or(current.include_inactive_sub_accounts))
        .bind(user_id)
        .execute(&self.db_pool)
        .await
        .context("Error actualizando configuración de reportes")?;

        self.report_settings(user_id).await
    }
}
