//! services/savings_service.rs
//! Metas de ahorro y aportes.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use sqlx::{Pool, Sqlite};

use crate::{
    errors::DomainError,
    models::{
        money::to_cents,
        savings_model::{
            AddContributionRequest, AddContributionResponse, Contribution, ContributionRow,
            CreateGoalRequest, SavingsGoal, SavingsGoalRow,
        },
    },
    services::{account_service::positive_cents, now_rfc3339, signals::FinanceSignals},
};

const GOAL_SELECT: &str = r#"
    SELECT g.id, g.user_id, g.account_id, g.name, g.description, g.target_cents,
           g.start_date, g.deadline, g.frequency, g.created_at,
           COALESCE((SELECT SUM(c.amount_cents) FROM goal_contributions c WHERE c.goal_id = g.id), 0)
               AS saved_cents
    FROM savings_goals g
"#;

/// Días hacia adelante en los que una meta se considera por vencer.
const DUE_SOON_DAYS: i64 = 7;

#[derive(Clone)]
pub struct SavingsService {
    db_pool: Pool<Sqlite>,
    signals: FinanceSignals,
}

impl SavingsService {
    pub fn new(db_pool: Pool<Sqlite>, signals: FinanceSignals) -> Self {
        Self { db_pool, signals }
    }

    pub async fn create_goal(&self, user_id: i64, req: CreateGoalRequest) -> Result<SavingsGoal> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("El nombre de la meta es obligatorio.").into());
        }
        if req.target_amount <= rust_decimal::Decimal::ZERO {
            return Err(DomainError::validation("El monto objetivo debe ser mayor a cero.").into());
        }
        let target_cents =
            to_cents(req.target_amount).ok_or_else(|| DomainError::validation("Monto objetivo inválido."))?;
        if req.deadline < req.start_date {
            return Err(DomainError::validation(
                "La fecha límite no puede ser anterior a la fecha de inicio.",
            )
            .into());
        }

        let owned: Option<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE id = ?1 AND user_id = ?2")
            .bind(req.account_id)
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error verificando cuenta")?;
        if owned.is_none() {
            return Err(DomainError::NotFound("Cuenta").into());
        }

        let id = sqlx::query(
            r#"
            INSERT INTO savings_goals (
                user_id, account_id, name, description, target_cents,
                start_date, deadline, frequency, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(user_id)
        .bind(req.account_id)
        .bind(name)
        .bind(req.description.as_deref().unwrap_or(""))
        .bind(target_cents)
        .bind(req.start_date.to_string())
        .bind(req.deadline.to_string())
        .bind(req.frequency.as_str())
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Error creando meta de ahorro")?
        .last_insert_rowid();

        let goal = self.get_goal(user_id, id).await?;
        log::info!("(create_goal) Meta {} creada para usuario {}", id, user_id);
        self.signals.goal_created(&goal).await;
        Ok(goal)
    }

    pub async fn get_goal(&self, user_id: i64, id: i64) -> Result<SavingsGoal> {
        let row = sqlx::query_as::<_, SavingsGoalRow>(&format!(
            "{GOAL_SELECT} WHERE g.id = ?1 AND g.user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Error leyendo meta")?
        .ok_or(DomainError::NotFound("Meta de ahorro"))?;
        SavingsGoal::try_from(row)
    }

    pub async fn list_goals(&self, user_id: i64) -> Result<Vec<SavingsGoal>> {
        let rows = sqlx::query_as::<_, SavingsGoalRow>(&format!(
            "{GOAL_SELECT} WHERE g.user_id = ?1 ORDER BY g.deadline, g.id"
        ))
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando metas")?;

        rows.into_iter().map(SavingsGoal::try_from).collect()
    }

    /// Los aportes no mueven saldos de cuentas.
    pub async fn add_contribution(
        &self,
        user_id: i64,
        goal_id: i64,
        req: AddContributionRequest,
    ) -> Result<AddContributionResponse> {
        let cents = positive_cents(req.amount)?;
        let goal = self.get_goal(user_id, goal_id).await?;

        let id = sqlx::query(
            r#"
            INSERT INTO goal_contributions (goal_id, user_id, amount_cents, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(goal.id)
        .bind(user_id)
        .bind(cents)
        .bind(req.description.as_deref())
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Error registrando aporte")?
        .last_insert_rowid();

        let contribution: Contribution = sqlx::query_as::<_, ContributionRow>(
            "SELECT id, goal_id, user_id, amount_cents, description, created_at FROM goal_contributions WHERE id = ?1",
        )
        .bind(id)
        .fetch_one(&self.db_pool)
        .await
        .context("Error leyendo aporte")?
        .into();

        let goal = self.get_goal(user_id, goal_id).await?;
        log::info!(
            "(add_contribution) Aporte {} a meta {} ({:.1}%)",
            id,
            goal.id,
            goal.progress
        );
        self.signals.contribution_created(&contribution, &goal).await;

        Ok(AddContributionResponse { contribution, goal })
    }

    /// Más recientes primero.
    pub async fn list_contributions(&self, user_id: i64, goal_id: i64) -> Result<Vec<Contribution>> {
        let goal = self.get_goal(user_id, goal_id).await?;
        let rows = sqlx::query_as::<_, ContributionRow>(
            r#"
            SELECT id, goal_id, user_id, amount_cents, description, created_at
            FROM goal_contributions WHERE goal_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(goal.id)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando aportes")?;

        Ok(rows.into_iter().map(Contribution::from).collect())
    }

    /// Metas no alcanzadas con fecha límite en [hoy, hoy + 7]. Devuelve
    /// cuántos avisos se crearon.
    pub async fn check_goals_due_soon(&self, today: NaiveDate) -> Result<usize> {
        let until = today + Duration::days(DUE_SOON_DAYS);
        let rows = sqlx::query_as::<_, SavingsGoalRow>(&format!(
            "{GOAL_SELECT} WHERE g.deadline >= ?1 AND g.deadline <= ?2 ORDER BY g.deadline"
        ))
        .bind(today.to_string())
        .bind(until.to_string())
        .fetch_all(&self.db_pool)
        .await
        .context("Error buscando metas por vencer")?;

        let mut created = 0;
        for row in rows {
            let goal = SavingsGoal::try_from(row)?;
            if goal.reached {
                continue;
            }
            match self.signals.goal_due_soon(&goal, today).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => log::error!("(check_goals_due_soon) Meta {}: {:?}", goal.id, e),
            }
        }

        log::info!("(check_goals_due_soon) {} avisos de metas por vencer", created);
        Ok(created)
    }
}
