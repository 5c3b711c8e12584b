//! handlers/report_handler.rs
//! Reportes, gráficos y dashboard.
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::handlers::{error_response, PaginationQuery};
use crate::models::report_model::{ChartKind, GenerateReportRequest, ReportPeriod};
use crate::services::report_service::ReportService;
use crate::services::today_utc;

#[derive(Deserialize)]
pub struct PeriodQuery {
    period: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateReportSettingsRequest {
    default_period: Option<ReportPeriod>,
    include_inactive_sub_accounts: Option<bool>,
}

/// GET /api/users/{user_id}/dashboard
pub async fn dashboard_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match report_service.dashboard(path.into_inner()).await {
        Ok(d) => HttpResponse::Ok().json(d),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/reports/overview?period=current_year
pub async fn overview_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<i64>,
    query: web::Query<PeriodQuery>,
) -> HttpResponse {
    let today = today_utc();
    match report_service
        .overview(path.into_inner(), query.period.as_deref(), today)
        .await
    {
        Ok(o) => HttpResponse::Ok().json(o),
        Err(e) => error_response(e),
    }
}

/// POST /api/users/{user_id}/reports
pub async fn generate_report_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<i64>,
    body: web::Json<GenerateReportRequest>,
) -> HttpResponse {
    match report_service
        .generate_report(path.into_inner(), body.into_inner())
        .await
    {
        Ok(r) => HttpResponse::Created().json(r),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/reports
pub async fn list_reports_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<i64>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let (page, page_size) = query.values();
    match report_service
        .list_reports(path.into_inner(), page, page_size)
        .await
    {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/reports/{report_id}
pub async fn get_report_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<(i64, i64)>,
) -> HttpResponse {
    let (user_id, report_id) = path.into_inner();
    match report_service.get_report(user_id, report_id).await {
        Ok(r) => HttpResponse::Ok().json(r),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/charts/{kind}?period=last_30_days
pub async fn chart_data_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<(i64, ChartKind)>,
    query: web::Query<PeriodQuery>,
) -> HttpResponse {
    let (user_id, kind) = path.into_inner();
    let period = ReportPeriod::parse_or_default(query.period.as_deref().unwrap_or_default());
    let today = today_utc();

    match report_service.chart_data(user_id, kind, period, today).await {
        Ok(data) => HttpResponse::Ok().json(data),
        Err(e) => error_response(e),
    }
}

/// GET /api/users/{user_id}/report-settings
pub async fn get_report_settings_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<i64>,
) -> HttpResponse {
    match report_service.report_settings(path.into_inner()).await {
        Ok(s) => HttpResponse::Ok().json(s),
        Err(e) => error_response(e),
    }
}

/// PATCH /api/users/{user_id}/report-settings
pub async fn update_report_settings_endpoint(
    report_service: web::Data<ReportService>,
    path: web::Path<i64>,
    body: web::Json<UpdateReportSettingsRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    match report_service
        .update_report_settings(
            path.into_inner(),
            body.default_period,
            body.include_inactive_sub_accounts,
        )
        .await
    {
        Ok(s) => HttpResponse::Ok().json(s),
        Err(e) => error_response(e),
    }
}
