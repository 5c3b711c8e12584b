//! models/course_model.rs
//! Cursos externos, favoritos y calculadoras financieras.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    #[default]
    Basico,
    Intermedio,
    Avanzado,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Basico => "basico",
            CourseLevel::Intermedio => "intermedio",
            CourseLevel::Avanzado => "avanzado",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "basico" => Some(CourseLevel::Basico),
            "intermedio" => Some(CourseLevel::Intermedio),
            "avanzado" => Some(CourseLevel::Avanzado),
            _ => None,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            CourseLevel::Basico => "Básico",
            CourseLevel::Intermedio => "Intermedio",
            CourseLevel::Avanzado => "Avanzado",
        }
    }

    /// Color de la etiqueta de nivel.
    pub fn color(&self) -> &'static str {
        match self {
            CourseLevel::Basico => "green",
            CourseLevel::Intermedio => "yellow",
            CourseLevel::Avanzado => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Youtube,
    Udemy,
    Coursera,
    Platzi,
    Otro,
}

impl Platform {
    /// Valores desconocidos caen en `Otro`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "youtube" => Platform::Youtube,
            "udemy" => Platform::Udemy,
            "coursera" => Platform::Coursera,
            "platzi" => Platform::Platzi,
            _ => Platform::Otro,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Udemy => "Udemy",
            Platform::Coursera => "Coursera",
            Platform::Platzi => "Platzi",
            Platform::Otro => "Otro",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Platform::Youtube => "🎬",
            Platform::Udemy => "🎓",
            Platform::Coursera => "📚",
            Platform::Platzi => "💚",
            Platform::Otro => "🔗",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub level: String,
    pub platform: String,
    pub url: String,
    pub image_url: Option<String>,
    pub duration: String,
    pub instructor: String,
    pub language: String,
    pub free: bool,
    pub sort_order: i64,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub level: CourseLevel,
    pub level_display: &'static str,
    pub level_color: &'static str,
    pub platform: Platform,
    pub platform_display: &'static str,
    pub platform_icon: &'static str,
    pub url: String,
    pub image_url: Option<String>,
    pub duration: String,
    pub instructor: String,
    pub language: String,
    pub free: bool,
    pub sort_order: i64,
    pub is_favorite: bool,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        let level = CourseLevel::parse(&row.level).unwrap_or_default();
        let platform = Platform::parse(&row.platform);
        Course {
            id: row.id,
            title: row.title,
            description: row.description,
            level,
            level_display: level.display(),
            level_color: level.color(),
            platform,
            platform_display: platform.display(),
            platform_icon: platform.icon(),
            url: row.url,
            image_url: row.image_url,
            duration: row.duration,
            instructor: row.instructor,
            language: row.language,
            free: row.free,
            sort_order: row.sort_order,
            is_favorite: row.is_favorite,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteResponse {
    pub success: bool,
    pub course_id: i64,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavingsCalculatorRequest {
    pub initial_amount: Decimal,
    pub monthly_contribution: Decimal,
    /// Tasa anual en porcentaje
    pub annual_rate: Decimal,
    pub years: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingsCalculatorResponse {
    pub future_value: Decimal,
    pub total_contributed: Decimal,
    pub interest_earned: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoanCalculatorRequest {
    pub amount: Decimal,
    /// Tasa anual en porcentaje
    pub annual_rate: Decimal,
    pub years: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoanCalculatorResponse {
    pub monthly_payment: Decimal,
    pub total_paid: Decimal,
    pub total_interest: Decimal,
}
