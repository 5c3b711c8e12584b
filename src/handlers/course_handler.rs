//! handlers/course_handler.rs
//! Educación financiera: cursos, favoritos y calculadoras.
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::handlers::error_response;
use crate::models::course_model::{CourseLevel, LoanCalculatorRequest, SavingsCalculatorRequest};
use crate::services::course_service::{loan_monthly_payment, savings_future_value, CourseService};

#[derive(Deserialize)]
pub struct CourseQuery {
    level: Option<CourseLevel>,
}

/// GET /api/courses?level=basico
pub async fn list_courses_endpoint(
    course_service: web::Data<CourseService>,
    query: web::Query<CourseQuery>,
) -> HttpResponse {
    match course_service.list_courses(None, query.level).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/courses
pub async fn list_user_courses_endpoint(
    course_service: web::Data<CourseService>,
    path: web::Path<i64>,
    query: web::Query<CourseQuery>,
) -> HttpResponse {
    match course_service
        .list_courses(Some(path.into_inner()), query.level)
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/courses/favorites
pub async fn list_favorites_endpoint(
    course_service: web::Data<CourseService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match course_service.list_favorites(path.into_inner()).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/courses/{course_id}/favorite
pub async fn add_favorite_endpoint(
    course_service: web::Data<CourseService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, course_id) = path.into_inner();
    match course_service.add_favorite(user_id, course_id).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/users/{user_id}/courses/{course_id}/favorite
pub async fn remove_favorite_endpoint(
    course_service: web::Data<CourseService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, course_id) = path.into_inner();
    match course_service.remove_favorite(user_id, course_id).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/courses/{course_id}/favorite/toggle
pub async fn toggle_favorite_endpoint(
    course_service: web::Data<CourseService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, course_id) = path.into_inner();
    match course_service.toggle_favorite(user_id, course_id).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(e),
    }
}

/// POST /api/calculators/savings
pub async fn savings_calculator_endpoint(body: web::Json<SavingsCalculatorRequest>) -> HttpResponse {
    let req = body.into_inner();
    match savings_future_value(
        req.initial_amount,
        req.monthly_contribution,
        req.annual_rate,
        req.years,
    ) {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(e.into()),
    }
}

/// POST /api/calculators/loan
pub async fn loan_calculator_endpoint(body: web::Json<LoanCalculatorRequest>) -> HttpResponse {
    let req = body.into_inner();
    match loan_monthly_payment(req.amount, req.annual_rate, req.years) {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(e.into()),
    }
}
