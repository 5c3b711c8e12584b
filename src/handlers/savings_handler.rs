//! handlers/savings_handler.rs
use actix_web::{web, HttpResponse};

use crate::handlers::error_response;
use crate::models::savings_model::{AddContributionRequest, CreateGoalRequest};
use crate::services::savings_service::SavingsService;

/// POST /api/users/{user_id}/goals
pub async fn create_goal_endpoint(
    savings_service: web::Data<SavingsService>,
    path: web::Path<i64>,
    body: web::Json<CreateGoalRequest>,
) -> HttpResponse {
    match savings_service
        .create_goal(path.into_inner(), body.into_inner())
        .await
    {
        Ok(goal) => HttpResponse::Created().json(goal),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/goals
pub async fn list_goals_endpoint(
    savings_service: web::Data<SavingsService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match savings_service.list_goals(path.into_inner()).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/goals/{goal_id}
pub async fn get_goal_endpoint(
    savings_service: web::Data<SavingsService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, goal_id) = path.into_inner();
    match savings_service.get_goal(user_id, goal_id).await {
        Ok(goal) => HttpResponse::Ok().json(goal),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/goals/{goal_id}/contributions
pub async fn add_contribution_endpoint(
    savings_service: web::Data<SavingsService>,
    path: web::Path<(i64, i64)>,
    body: web::Json<AddContributionRequest>,
) -> HttpResponse {
    let (user_id, goal_id) = path.into_inner();
    match savings_service
        .add_contribution(user_id, goal_id, body.into_inner())
        .await
    {
        Ok(resp) => HttpResponse::Created().json(resp),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/goals/{goal_id}/contributions
pub async fn list_contributions_endpoint(
    savings_service: web::Data<SavingsService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, goal_id) = path.into_inner();
    match savings_service.list_contributions(user_id, goal_id).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}
