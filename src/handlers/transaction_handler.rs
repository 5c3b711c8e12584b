//! handlers/transaction_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::handlers::error_response;
use crate::models::transaction_model::{RecordTransactionRequest, TransactionFilter};
use crate::services::transaction_service::TransactionService;

#[derive(Deserialize)]
pub struct TransactionQuery {
    filter: Option<TransactionFilter>,
    page: Option<u64>,
    page_size: Option<u64>,
}

/// POST /api/users/{user_id}/transactions
pub async fn record_transaction_endpoint(
    transaction_service: web::Data<TransactionService>,
    path: web::Path<i64>,
    body: web::Json<RecordTransactionRequest>,
) -> HttpResponse {
    match transaction_service
        .record_transaction(path.into_inner(), body.into_inner())
        .await
    {
        Ok(resp) => HttpResponse::Created().json(resp),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/transactions?filter=income&page=1
pub async fn list_transactions_endpoint(
    transaction_service: web::Data<TransactionService>,
    path: web::Path<i64>,
    query: web::Query<TransactionQuery>,
) -> HttpResponse {
    let filter = query.filter.unwrap_or_default();
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(10);

    match transaction_service
        .list_transactions(path.into_inner(), filter, page, page_size)
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/transactions/{id}
pub async fn get_transaction_endpoint(
    transaction_service: web::Data<TransactionService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, id) = path.into_inner();
    match transaction_service.get_transaction(user_id, id).await {
        Ok(tx) => HttpResponse::Ok().json(tx),
        Err(e) => error_response(e),
    }
}
