//! app.rs
use crate::handlers::{
    account_handler, course_handler, notification_handler, report_handler, savings_handler,
    transaction_handler, user_handler,
};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/currencies", web::get().to(user_handler::list_currencies_endpoint))
            .route(
                "/sub-account-kinds",
                web::get().to(account_handler::list_sub_account_kinds_endpoint),
            )
            .route(
                "/notification-types",
                web::get().to(notification_handler::list_types_endpoint),
            )
            // Educación financiera
            .route("/courses", web::get().to(course_handler::list_courses_endpoint))
            .route(
                "/calculators/savings",
                web::post().to(course_handler::savings_calculator_endpoint),
            )
            .route(
                "/calculators/loan",
                web::post().to(course_handler::loan_calculator_endpoint),
            )
            .route("/users", web::post().to(user_handler::create_user_endpoint))
            .service(
                web::scope("/users/{user_id}")
                    .route("", web::get().to(user_handler::get_user_endpoint))
                    .route("/pin", web::post().to(user_handler::verify_pin_endpoint))
                    .route("/dashboard", web::get().to(report_handler::dashboard_endpoint))
                    // Cuentas
                    .route(
                        "/accounts",
                        web::post().to(account_handler::create_account_endpoint),
                    )
                    .route(
                        "/accounts",
                        web::get().to(account_handler::list_accounts_endpoint),
                    )
                    .route(
                        "/accounts/{account_id}",
                        web::get().to(account_handler::get_account_endpoint),
                    )
                    // Subcuentas
                    .route(
                        "/subaccounts",
                        web::post().to(account_handler::create_sub_account_endpoint),
                    )
                    .route(
                        "/subaccounts",
                        web::get().to(account_handler::list_sub_accounts_endpoint),
                    )
                    .route(
                        "/subaccounts/{sub_id}",
                        web::get().to(account_handler::get_sub_account_endpoint),
                    )
                    .route(
                        "/subaccounts/{sub_id}",
                        web::delete().to(account_handler::deactivate_sub_account_endpoint),
                    )
                    .route(
                        "/subaccounts/{sub_id}/main-transfer",
                        web::post().to(account_handler::transfer_with_main_account_endpoint),
                    )
                    .route(
                        "/transfers",
                        web::post().to(account_handler::transfer_between_sub_accounts_endpoint),
                    )
                    // Movimientos
                    .route(
                        "/transactions",
                        web::post().to(transaction_handler::record_transaction_endpoint),
                    )
                    .route(
                        "/transactions",
                        web::get().to(transaction_handler::list_transactions_endpoint),
                    )
                    .route(
                        "/transactions/{id}",
                        web::get().to(transaction_handler::get_transaction_endpoint),
                    )
                    // Metas de ahorro
                    .route("/goals", web::post().to(savings_handler::create_goal_endpoint))
                    .route("/goals", web::get().to(savings_handler::list_goals_endpoint))
                    .route(
                        "/goals/{goal_id}",
                        web::get().to(savings_handler::get_goal_endpoint),
                    )
                    .route(
                        "/goals/{goal_id}/contributions",
                        web::post().to(savings_handler::add_contribution_endpoint),
                    )
                    .route(
                        "/goals/{goal_id}/contributions",
                        web::get().to(savings_handler::list_contributions_endpoint),
                    )
                    // Notificaciones
                    .route(
                        "/notifications",
                        web::get().to(notification_handler::list_notifications_endpoint),
                    )
                    .route(
                        "/notifications/unread",
                        web::get().to(notification_handler::unread_notifications_endpoint),
                    )
                    .route(
                        "/notifications/{id}",
                        web::get().to(notification_handler::get_notification_endpoint),
                    )
                    .route(
                        "/notifications/{id}/read",
                        web::post().to(notification_handler::mark_read_endpoint),
                    )
                    .route(
                        "/notifications/{id}/archive",
                        web::post().to(notification_handler::archive_endpoint),
                    )
                    .route(
                        "/notification-settings",
                        web::get().to(notification_handler::list_settings_endpoint),
                    )
                    .route(
                        "/notification-settings/{type_name}",
                        web::patch().to(notification_handler::update_setting_endpoint),
                    )
                    // Reportes
                    .route(
                        "/reports/overview",
                        web::get().to(report_handler::overview_endpoint),
                    )
                    .route(
                        "/reports",
                        web::post().to(report_handler::generate_report_endpoint),
                    )
                    .route(
                        "/reports",
                        web::get().to(report_handler::list_reports_endpoint),
                    )
                    .route(
                        "/reports/{report_id}",
                        web::get().to(report_handler::get_report_endpoint),
                    )
                    .route(
                        "/charts/{kind}",
                        web::get().to(report_handler::chart_data_endpoint),
                    )
                    .route(
                        "/report-settings",
                        web::get().to(report_handler::get_report_settings_endpoint),
                    )
                    .route(
                        "/report-settings",
                        web::patch().to(report_handler::update_report_settings_endpoint),
                    )
                    // Cursos
                    .route(
                        "/courses",
                        web::get().to(course_handler::list_user_courses_endpoint),
                    )
                    .route(
                        "/courses/favorites",
                        web::get().to(course_handler::list_favorites_endpoint),
                    )
                    .route(
                        "/courses/{course_id}/favorite",
                        web::post().to(course_handler::add_favorite_endpoint),
                    )
                    .route(
                        "/courses/{course_id}/favorite",
                        web::delete().to(course_handler::remove_favorite_endpoint),
                    )
                    .route(
                        "/courses/{course_id}/favorite/toggle",
                        web::post().to(course_handler::toggle_favorite_endpoint),
                    ),
            ),
    );
}
