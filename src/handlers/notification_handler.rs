//! handlers/notification_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::error_response;
use crate::models::notification_model::{NotificationStatus, UpdateSettingRequest};
use crate::services::notification_service::NotificationService;

#[derive(Deserialize)]
pub struct NotificationQuery {
    status: Option<NotificationStatus>,
    page: Option<u64>,
    page_size: Option<u64>,
}

/// GET /api/notification-types
pub async fn list_types_endpoint(notification_service: web::Data<NotificationService>) -> HttpResponse {
    match notification_service.list_types().await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/notifications?status=pendiente&page=1
pub async fn list_notifications_endpoint(
    notification_service: web::Data<NotificationService>,
    path: web::Path<i64>,
    query: web::Query<NotificationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    match notification_service
        .list(path.into_inner(), query.status, page, page_size)
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/notifications/unread
pub async fn unread_notifications_endpoint(
    notification_service: web::Data<NotificationService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match notification_service.unread(path.into_inner()).await {
        Ok(items) => HttpResponse::Ok().json(json!({
            "count": items.len(),
            "items": items,
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/notifications/{id}
pub async fn get_notification_endpoint(
    notification_service: web::Data<NotificationService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, id) = path.into_inner();
    match notification_service.get_notification(user_id, id).await {
        Ok(n) => HttpResponse::Ok().json(n),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/notifications/{id}/read
pub async fn mark_read_endpoint(
    notification_service: web::Data<NotificationService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, id) = path.into_inner();
    match notification_service.mark_read(user_id, id).await {
        Ok(n) => HttpResponse::Ok().json(n),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/notifications/{id}/archive
pub async fn archive_endpoint(
    notification_service: web::Data<NotificationService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, id) = path.into_inner();
    match notification_service.archive(user_id, id).await {
        Ok(n) => HttpResponse::Ok().json(n),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/notification-settings
pub async fn list_settings_endpoint(
    notification_service: web::Data<NotificationService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match notification_service.list_settings(path.into_inner()).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// PATCH /api/users/{user_id}/notification-settings/{type_name}
pub async fn update_setting_endpoint(
    notification_service: web::Data<NotificationService>,
    path: web::Path<(i64, String)>,
    body: web::Json<UpdateSettingRequest>,
) -> HttpResponse {
    let (user_id, type_name) = path.into_inner();
    match notification_service
        .update_setting(user_id, &type_name, body.into_inner())
        .await
    {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => error_response(e),
    }
}
