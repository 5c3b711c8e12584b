//! handlers/account_handler.rs
//! Cuentas, subcuentas y transferencias.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::error_response;
use crate::models::account_model::{
    CreateAccountRequest, CreateSubAccountRequest, MainAccountTransferRequest,
    SubAccountKind, SubAccountTransferRequest,
};
use crate::services::account_service::AccountService;

#[derive(Deserialize)]
pub struct SubAccountQuery {
    include_inactive: Option<bool>,
}

/// POST /api/users/{user_id}/accounts
pub async fn create_account_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<i64>,
    body: web::Json<CreateAccountRequest>,
) -> HttpResponse {
    match account_service
        .create_account(path.into_inner(), body.into_inner())
        .await
    {
        Ok(account) => HttpResponse::Created().json(account),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/accounts
pub async fn list_accounts_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match account_service.list_accounts(path.into_inner()).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/accounts/{account_id}
pub async fn get_account_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, account_id) = path.into_inner();
    match account_service.get_account(user_id, account_id).await {
        Ok(account) => HttpResponse::Ok().json(account),
        Err(e) => error_response(e),
    }
}

/// GET /api/sub-account-kinds
pub async fn list_sub_account_kinds_endpoint() -> HttpResponse {
    let kinds: Vec<_> = SubAccountKind::ALL
        .iter()
        .map(|k| {
            json!({
                "kind": k.as_str(),
                "label": k.label(),
                "color": k.color(),
                "is_business": k.is_business(),
            })
        })
        .collect();
    HttpResponse::Ok().json(kinds)
}

/// POST /api/users/{user_id}/subaccounts
pub async fn create_sub_account_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<i64>,
    body: web::Json<CreateSubAccountRequest>,
) -> HttpResponse {
    match account_service
        .create_sub_account(path.into_inner(), body.into_inner())
        .await
    {
        Ok(sub) => HttpResponse::Created().json(sub),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/subaccounts?include_inactive=true
pub async fn list_sub_accounts_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<i64>,
    query: web::Query<SubAccountQuery>,
) -> HttpResponse {
    let include_inactive = query.include_inactive.unwrap_or(false);
    match account_service
        .list_sub_accounts(path.into_inner(), include_inactive)
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/subaccounts/{sub_id}
pub async fn get_sub_account_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, sub_id) = path.into_inner();
    match account_service.get_sub_account(user_id, sub_id).await {
        Ok(sub) => HttpResponse::Ok().json(sub),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/users/{user_id}/subaccounts/{sub_id}
pub async fn deactivate_sub_account_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, sub_id) = path.into_inner();
    match account_service.deactivate_sub_account(user_id, sub_id).await {
        Ok(sub) => HttpResponse::Ok().json(sub),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/transfers
pub async fn transfer_between_sub_accounts_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<i64>,
    body: web::Json<SubAccountTransferRequest>,
) -> HttpResponse {
    match account_service
        .transfer_between_sub_accounts(path.into_inner(), body.into_inner())
        .await
    {
        Ok(receipt) => HttpResponse::Ok().json(receipt),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/subaccounts/{sub_id}/main-transfer
pub async fn transfer_with_main_account_endpoint(
    account_service: web::Data<AccountService>,
    path: web::Path<(i64, i64)>,
    body: web::Json<MainAccountTransferRequest>,
) -> HttpResponse {
    let (user_id, sub_id) = path.into_inner();
    match account_service
        .transfer_with_main_account(user_id, sub_id, body.into_inner())
        .await
    {
        Ok(receipt) => HttpResponse::Ok().json(receipt),
        Err(e) => error_response(e),
    }
}
