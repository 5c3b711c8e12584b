//! tests/course_tests.rs

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::app::init_app;
use crate::errors::DomainError;
use crate::models::course_model::{CourseLevel, Platform};
use crate::services::course_service::{loan_monthly_payment, savings_future_value};
use crate::tests::{create_user, dec, domain_error, setup};

#[::core::prelude::v1::test]
fn level_and_platform_badges() {
    assert_eq!(CourseLevel::Basico.color(), "green");
    assert_eq!(CourseLevel::Intermedio.color(), "yellow");
    assert_eq!(CourseLevel::Avanzado.color(), "red");
    assert_eq!(CourseLevel::parse("experto"), None);

    assert_eq!(Platform::Youtube.icon(), "🎬");
    assert_eq!(Platform::Udemy.icon(), "🎓");
    assert_eq!(Platform::Coursera.icon(), "📚");
    assert_eq!(Platform::Platzi.icon(), "💚");
    assert_eq!(Platform::parse("edx"), Platform::Otro);
    assert_eq!(Platform::Otro.icon(), "🔗");
}

#[::core::prelude::v1::test]
fn savings_calculator() {
    let r = savings_future_value(dec("1000"), dec("100"), dec("5"), 10).expect("ahorro");
    assert_eq!(r.future_value, dec("17175.24"));
    assert_eq!(r.total_contributed, dec("13000"));
    assert_eq!(r.interest_earned, dec("4175.24"));

    // Sin interés solo se suman los aportes
    let flat = savings_future_value(dec("500"), dec("50"), Decimal::ZERO, 2).expect("sin interés");
    assert_eq!(flat.future_value, dec("1700"));
    assert_eq!(flat.interest_earned, Decimal::ZERO);

    for (initial, monthly, rate, years) in [
        ("-1", "100", "5", 10),
        ("1000", "-5", "5", 10),
        ("1000", "100", "-1", 10),
        ("1000", "100", "150", 10),
        ("1000", "100", "5", 0),
        ("1000", "100", "5", 80),
    ] {
        let err = savings_future_value(dec(initial), dec(monthly), dec(rate), years)
            .expect_err("valores inválidos");
        assert_eq!(err.to_string(), "Error en los valores ingresados");
    }
}

#[::core::prelude::v1::test]
fn loan_calculator() {
    let r = loan_monthly_payment(dec("10000"), dec("12"), 1).expect("préstamo");
    assert_eq!(r.monthly_payment, dec("888.49"));
    assert_eq!(r.total_paid, dec("10661.88"));
    assert_eq!(r.total_interest, dec("661.88"));

    let flat = loan_monthly_payment(dec("1200"), Decimal::ZERO, 1).expect("sin interés");
    assert_eq!(flat.monthly_payment, dec("100"));
    assert_eq!(flat.total_interest, Decimal::ZERO);

    assert!(matches!(
        loan_monthly_payment(Decimal::ZERO, dec("12"), 1),
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        loan_monthly_payment(dec("1000"), dec("12"), 0),
        Err(DomainError::Validation(_))
    ));
}

#[actix_rt::test]
async fn catalogue_is_seeded_in_order() {
    let ctx = setup().await;
    let courses = ctx.courses.list_courses(None, None).await.expect("cursos");
    assert_eq!(courses.len(), 8);
    assert_eq!(courses[0].title, "Finanzas Personales - Curso Completo");
    assert_eq!(courses[0].platform_icon, "🎬");
    assert!(courses.windows(2).all(|w| w[0].sort_order <= w[1].sort_order));
    assert!(courses.iter().all(|c| !c.is_favorite));

    let advanced = ctx
        .courses
        .list_courses(None, Some(CourseLevel::Avanzado))
        .await
        .expect("avanzados");
    assert_eq!(advanced.len(), 2);
    assert!(advanced.iter().all(|c| c.level_color == "red" && !c.free));
}

#[actix_rt::test]
async fn favorites_are_per_user_and_idempotent() {
    let ctx = setup().await;
    let (user_id, _) = create_user(&ctx, "ana@correo.pe", 0).await;
    let (other, _) = create_user(&ctx, "luis@correo.pe", 0).await;
    let courses = ctx.courses.list_courses(None, None).await.expect("cursos");
    let (first, third) = (courses[0].id, courses[2].id);

    ctx.courses.add_favorite(user_id, first).await.expect("favorito");
    ctx.courses.add_favorite(user_id, first).await.expect("de nuevo");
    ctx.courses.add_favorite(user_id, third).await.expect("favorito 2");

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_favorites WHERE user_id = ?1")
        .bind(user_id)
        .fetch_one(&ctx.pool)
        .await
        .expect("count");
    assert_eq!(rows, 2);

    let listed = ctx.courses.list_courses(Some(user_id), None).await.expect("cursos");
    let marked: Vec<i64> = listed.iter().filter(|c| c.is_favorite).map(|c| c.id).collect();
    assert_eq!(marked, vec![first, third]);

    let others = ctx.courses.list_courses(Some(other), None).await.expect("cursos");
    assert!(others.iter().all(|c| !c.is_favorite));

    let favorites = ctx.courses.list_favorites(user_id).await.expect("favoritos");
    assert_eq!(favorites.len(), 2);
    assert_eq!(favorites[0].id, third);

    let toggled = ctx.courses.toggle_favorite(user_id, first).await.expect("toggle");
    assert!(!toggled.is_favorite);
    let toggled = ctx.courses.toggle_favorite(user_id, first).await.expect("toggle 2");
    assert!(toggled.is_favorite);

    let removed = ctx.courses.remove_favorite(user_id, third).await.expect("quitar");
    assert!(!removed.is_favorite);
    assert_eq!(ctx.courses.list_favorites(user_id).await.expect("favoritos").len(), 1);

    let missing = ctx.courses.add_favorite(user_id, 9999).await.expect_err("curso");
    assert!(matches!(domain_error(&missing), DomainError::NotFound("Curso")));
    let no_user = ctx.courses.list_favorites(9999).await.expect_err("usuario");
    assert!(matches!(domain_error(&no_user), DomainError::NotFound("Usuario")));
}

#[actix_rt::test]
async fn courses_and_calculators_over_http() {
    let ctx = setup().await;
    let (user_id, _) = create_user(&ctx, "ana@correo.pe", 0).await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(ctx.courses.clone()))
            .configure(init_app),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/courses?level=basico").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let list = body.as_array().expect("lista");
    assert_eq!(list.len(), 3);
    let course_id = list[1]["id"].as_i64().expect("id");
    assert_eq!(list[1]["level_display"], "Básico");

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/courses/{}/favorite", user_id, course_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["is_favorite"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/users/{}/courses/favorites", user_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["id"], course_id);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/{}/courses/{}/favorite", user_id, course_id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["is_favorite"], false);

    let req = test::TestRequest::post()
        .uri(&format!("/api/users/{}/courses/9999/favorite", user_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/calculators/loan")
        .set_json(json!({ "amount": "10000", "annual_rate": "12", "years": 1 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["monthly_payment"], "888.49");

    let req = test::TestRequest::post()
        .uri("/api/calculators/savings")
        .set_json(json!({
            "initial_amount": "1000",
            "monthly_contribution": "100",
            "annual_rate": "5",
            "years": 0,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Error en los valores ingresados");
}
