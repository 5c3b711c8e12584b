//! tests/handler_tests.rs
//! Rutas HTTP completas sobre la base en memoria.

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use crate::app::init_app;
use crate::services::paginate;
use crate::tests::{setup, TestContext, TEST_PIN};

macro_rules! test_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.users.clone()))
                .app_data(web::Data::new($ctx.accounts.clone()))
                .app_data(web::Data::new($ctx.transactions.clone()))
                .app_data(web::Data::new($ctx.savings.clone()))
                .app_data(web::Data::new($ctx.notifications.clone()))
                .app_data(web::Data::new($ctx.reports.clone()))
                .app_data(web::Data::new($ctx.courses.clone()))
                .configure(init_app),
        )
        .await
    };
}

fn new_user_body(email: &str, initial_balance: &str) -> Value {
    json!({
        "document_id": "12345678",
        "first_name": "Ana",
        "paternal_surname": "Quispe",
        "maternal_surname": "Rojas",
        "email": email,
        "phone": "999888777",
        "quick_access_pin": TEST_PIN,
        "currency_id": 2,
        "initial_balance": initial_balance,
    })
}

async fn ctx() -> TestContext {
    setup().await
}

#[actix_rt::test]
async fn currencies_catalog() {
    let ctx = ctx().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/api/currencies").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let list = body.as_array().expect("lista");
    assert_eq!(list.len(), 3);
    assert!(list.iter().any(|c| c["code"] == "PEN" && c["symbol"] == "S/"));
}

#[actix_rt::test]
async fn user_lifecycle_over_http() {
    let ctx = ctx().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .set_json(new_user_body("Ana@Correo.pe", "100"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["user"]["email"], "ana@correo.pe");
    let user_id = created["user"]["id"].as_i64().expect("id");
    let account_id = created["account_id"].as_i64().expect("account_id");

    // Email repetido
    let req = test::TestRequest::post()
        .uri("/api/users")
        .set_json(new_user_body("ana@correo.pe", "0"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/pin", user_id))
        .set_json(json!({ "pin": "000000" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/pin", user_id))
        .set_json(json!({ "pin": TEST_PIN }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user_id"], user_id);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/accounts/{}", user_id, account_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn missing_user_is_404() {
    let ctx = ctx().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::get().uri("/api/users/999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap_or_default().contains("Usuario"));
}

#[actix_rt::test]
async fn transactions_over_http() {
    let ctx = ctx().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .set_json(new_user_body("ana@correo.pe", "100"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let user_id = created["user"]["id"].as_i64().expect("id");
    let account_id = created["account_id"].as_i64().expect("account_id");

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/transactions", user_id))
        .set_json(json!({
            "account_id": account_id,
            "name": "Pasajes",
            "kind": "expense",
            "category": "transporte",
            "amount": "30",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["account_balance"], "70.00");

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/transactions", user_id))
        .set_json(json!({
            "account_id": account_id,
            "name": "Televisor",
            "kind": "expense",
            "category": "compras",
            "amount": "500",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "El saldo no puede ser negativo.");

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/transactions?filter=expenses", user_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/notifications/unread", user_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["type_name"], "transaction_recorded");

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/charts/income_vs_expenses?period=last_30_days", user_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["labels"], json!(["Ingresos", "Egresos"]));
    assert_eq!(body["data"][1], "30.00");
}

#[actix_rt::test]
async fn invalid_settings_and_unknown_chart() {
    let ctx = ctx().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .set_json(new_user_body("ana@correo.pe", "0"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let user_id = created["user"]["id"].as_i64().expect("id");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/users/{}/notification-settings/low_balance", user_id))
        .set_json(json!({ "send_time": "99:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/users/{}/report-settings", user_id))
        .set_json(json!({ "default_period": "last_90_days" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["default_period"], "last_90_days");

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/charts/pastel", user_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[::core::prelude::v1::test]
fn pagination_offsets_saturate() {
    assert_eq!(paginate(0, 0), (1, 1, 0));
    assert_eq!(paginate(3, 500), (3, 100, 200));
    assert_eq!(paginate(u64::MAX, 100), (u64::MAX, 100, i64::MAX));
}

#[actix_rt::test]
async fn huge_page_returns_empty_list() {
    let ctx = ctx().await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .set_json(new_user_body("ana@correo.pe", "100"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let user_id = created["user"]["id"].as_i64().expect("id");

    for resource in ["transactions", "notifications", "reports"] {
        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/users/{}/{}?page=18446744073709551615&page_size=100",
                user_id, resource
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", resource);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["items"], json!([]), "{}", resource);
    }
}
