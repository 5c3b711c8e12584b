//! services/course_service.rs
//! Catálogo de cursos externos, favoritos y calculadoras.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};

use crate::{
    errors::DomainError,
    models::{
        course_model::{
            Course, CourseLevel, CourseRow, FavoriteResponse, LoanCalculatorResponse,
            SavingsCalculatorResponse,
        },
        money::normalize,
    },
    services::now_rfc3339,
};

const COURSE_SELECT: &str = r#"
    SELECT c.id, c.title, c.description, c.level, c.platform, c.url, c.image_url,
           c.duration, c.instructor, c.language, c.free, c.sort_order,
           EXISTS (
               SELECT 1 FROM course_favorites f WHERE f.course_id = c.id AND f.user_id = ?1
           ) AS is_favorite
    FROM courses c
"#;

const MAX_YEARS: u32 = 50;
const INVALID_VALUES: &str = "Error en los valores ingresados";

fn invalid() -> DomainError {
    DomainError::validation(INVALID_VALUES)
}

fn check_terms(annual_rate: Decimal, years: u32) -> Result<(Decimal, u32), DomainError> {
    if annual_rate < Decimal::ZERO || annual_rate > Decimal::ONE_HUNDRED {
        return Err(invalid());
    }
    if years == 0 || years > MAX_YEARS {
        return Err(invalid());
    }
    let monthly_rate = annual_rate / Decimal::ONE_HUNDRED / Decimal::from(12);
    Ok((monthly_rate, years * 12))
}

/// (1 + r)^n por multiplicaciones sucesivas; `None` si desborda.
fn growth_factor(monthly_rate: Decimal, months: u32) -> Option<Decimal> {
    let base = Decimal::ONE + monthly_rate;
    (0..months).try_fold(Decimal::ONE, |acc, _| acc.checked_mul(base))
}

/// Valor futuro de un ahorro con capital inicial y aportes mensuales,
/// capitalización mensual.
pub fn savings_future_value(
    initial: Decimal,
    monthly: Decimal,
    annual_rate: Decimal,
    years: u32,
) -> Result<SavingsCalculatorResponse, DomainError> {
    if initial < Decimal::ZERO || monthly < Decimal::ZERO {
        return Err(invalid());
    }
    let (rate, months) = check_terms(annual_rate, years)?;
    let months_dec = Decimal::from(months);

    let contributed = monthly
        .checked_mul(months_dec)
        .and_then(|m| m.checked_add(initial))
        .ok_or_else(invalid)?;

    let future_value = if rate.is_zero() {
        contributed
    } else {
        let growth = growth_factor(rate, months).ok_or_else(invalid)?;
        let from_initial = initial.checked_mul(growth);
        let from_monthly = (growth - Decimal::ONE)
            .checked_div(rate)
            .and_then(|annuity| monthly.checked_mul(annuity));
        from_initial
            .zip(from_monthly)
            .and_then(|(a, b)| a.checked_add(b))
            .ok_or_else(invalid)?
    };

    let future_value = normalize(future_value);
    Ok(SavingsCalculatorResponse {
        future_value,
        total_contributed: normalize(contributed),
        interest_earned: normalize(future_value - contributed),
    })
}

/// Cuota mensual fija de un préstamo (sistema francés).
pub fn loan_monthly_payment(
    amount: Decimal,
    annual_rate: Decimal,
    years: u32,
) -> Result<LoanCalculatorResponse, DomainError> {
    if amount <= Decimal::ZERO {
        return Err(invalid());
    }
    let (rate, months) = check_terms(annual_rate, years)?;
    let months_dec = Decimal::from(months);

    let payment = if rate.is_zero() {
        amount / months_dec
    } else {
        let growth = growth_factor(rate, months).ok_or_else(invalid)?;
        let discount = Decimal::ONE - Decimal::ONE / growth;
        amount
            .checked_mul(rate)
            .and_then(|p| p.checked_div(discount))
            .ok_or_else(invalid)?
    };

    let payment = normalize(payment);
    let total_paid = normalize(payment.checked_mul(months_dec).ok_or_else(invalid)?);
    Ok(LoanCalculatorResponse {
        monthly_payment: payment,
        total_paid,
        total_interest: normalize(total_paid - amount),
    })
}

#[derive(Clone)]
pub struct CourseService {
    db_pool: Pool<Sqlite>,
}

impl CourseService {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        Self { db_pool }
    }

    /// Cursos activos ordenados por (orden, título). Con usuario se marca
    /// cuáles tiene como favoritos.
    pub async fn list_courses(&self, user_id: Option<i64>, level: Option<CourseLevel>) -> Result<Vec<Course>> {
        if let Some(user_id) = user_id {
            self.ensure_user(user_id).await?;
        }
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "{COURSE_SELECT} WHERE c.active = 1 AND (?2 IS NULL OR c.level = ?2) ORDER BY c.sort_order, c.title"
        ))
        .bind(user_id)
        .bind(level.map(|l| l.as_str()))
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando cursos")?;

        Ok(rows.into_iter().map(Course::from).collect())
    }

    pub async fn list_favorites(&self, user_id: i64) -> Result<Vec<Course>> {
        self.ensure_user(user_id).await?;
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            r#"{COURSE_SELECT}
            JOIN course_favorites fav ON fav.course_id = c.id AND fav.user_id = ?1
            WHERE c.active = 1
            ORDER BY fav.created_at DESC, fav.id DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Error listando cursos favoritos")?;

        Ok(rows.into_iter().map(Course::from).collect())
    }

    /// Idempotente: marcar dos veces deja un solo favorito.
    pub async fn add_favorite(&self, user_id: i64, course_id: i64) -> Result<FavoriteResponse> {
        self.ensure_user(user_id).await?;
        self.ensure_course(course_id).await?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO course_favorites (user_id, course_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(user_id)
        .bind(course_id)
        .bind(now_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Error guardando favorito")?
        .rows_affected();

        if inserted > 0 {
            log::info!("(add_favorite) Curso {} agregado a favoritos de usuario {}", course_id, user_id);
        }
        Ok(FavoriteResponse {
            success: true,
            course_id,
            is_favorite: true,
        })
    }

    pub async fn remove_favorite(&self, user_id: i64, course_id: i64) -> Result<FavoriteResponse> {
        self.ensure_user(user_id).await?;
        self.ensure_course(course_id).await?;

        let removed = sqlx::query("DELETE FROM course_favorites WHERE user_id = ?1 AND course_id = ?2")
            .bind(user_id)
            .bind(course_id)
            .execute(&self.db_pool)
            .await
            .context("Error quitando favorito")?
            .rows_affected();

        if removed > 0 {
            log::info!("(remove_favorite) Curso {} quitado de favoritos de usuario {}", course_id, user_id);
        }
        Ok(FavoriteResponse {
            success: true,
            course_id,
            is_favorite: false,
        })
    }

    /// Alterna el favorito y devuelve el estado resultante.
    pub async fn toggle_favorite(&self, user_id: i64, course_id: i64) -> Result<FavoriteResponse> {
        let current: Option<i64> =
            sqlx::query_scalar("SELECT id FROM course_favorites WHERE user_id = ?1 AND course_id = ?2")
                .bind(user_id)
                .bind(course_id)
                .fetch_optional(&self.db_pool)
                .await
                .context("Error buscando favorito")?;

        match current {
            Some(_) => self.remove_favorite(user_id, course_id).await,
            None => self.add_favorite(user_id, course_id).await,
        }
    }

    async fn ensure_course(&self, course_id: i64) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM courses WHERE id = ?1 AND active = 1")
            .bind(course_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error buscando curso")?;
        exists.map(|_| ()).ok_or_else(|| DomainError::NotFound("Curso").into())
    }

    async fn ensure_user(&self, user_id: i64) -> Result<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Error buscando usuario")?;
        exists.map(|_| ()).ok_or_else(|| DomainError::NotFound("Usuario").into())
    }
}
