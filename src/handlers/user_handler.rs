//! handlers/user_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::handlers::error_response;
use crate::models::user_model::{CreateUserRequest, QuickAccessRequest};
use crate::services::user_service::UserService;

/// GET /api/currencies
pub async fn list_currencies_endpoint(user_service: web::Data<UserService>) -> HttpResponse {
    match user_service.list_currencies().await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// POST /api/users
pub async fn create_user_endpoint(
    user_service: web::Data<UserService>,
    body: web::Json<CreateUserRequest>,
) -> HttpResponse {
    match user_service.create_user(body.into_inner()).await {
        Ok(resp) => HttpResponse::Created().json(resp),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}
pub async fn get_user_endpoint(
    user_service: web::Data<UserService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match user_service.get_user(path.into_inner()).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/pin
pub async fn verify_pin_endpoint(
    user_service: web::Data<UserService>,
    path: web::Path<i64>,
    body: web::Json<QuickAccessRequest>,
) -> HttpResponse {
    let user_id = path.into_inner();
    match user_service.verify_quick_access_pin(user_id, &body.pin).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "user_id": user_id })),
        Err(e) => error_response(e),
    }
}
