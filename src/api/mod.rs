pub mod health;
pub mod queries;
pub mod recommendations;
pub mod session;
pub mod swagger;

use actix_web::web;

use crate::middleware::{FirebaseAuth, OwnershipGuard};
use crate::utils::AppError;

/// Registra todas as rotas. Usado pelo `main` e pelos testes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Body/query inválidos viram 400 {"message": ...}
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::bad_request(format!("Invalid JSON body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::bad_request(format!("Invalid query string: {err}")).into()
    }));

    cfg
        // Health
        .route("/", web::get().to(health::liveness))
        .route("/health", web::get().to(health::health_check))
        // Sessão Firebase (cookie httpOnly)
        .route("/sessionLogin", web::post().to(session::session_login))
        .route("/logout", web::post().to(session::logout))
        // ==================== QUERIES ====================
        .route("/query", web::post().to(queries::submit_query))
        .route("/querys/recent", web::get().to(queries::recent_queries))
        .route("/highlighted-products", web::get().to(queries::highlighted_products))
        .route("/allQuery", web::get().to(queries::all_queries))
        .route("/queryDetails/{id}", web::get().to(queries::query_details))
        .route("/myQueryDetails/{id}", web::get().to(queries::query_details))
        .service(
            web::resource("/query/{id}")
                .route(web::put().to(queries::update_query))
                .route(web::delete().to(queries::delete_query))
                .route(web::patch().to(queries::decrement_recommendation_count)),
        )
        // 🔒 Token verificado + ?email= igual ao do token
        .service(
            web::resource("/myQuery")
                .wrap(OwnershipGuard::new())
                .wrap(FirebaseAuth)
                .route(web::get().to(queries::my_queries)),
        )
        // ==================== RECOMMENDATIONS ====================
        .service(
            web::resource("/recommendations")
                .route(web::post().to(recommendations::create_recommendation))
                .route(web::get().to(recommendations::recommendations_for_query)),
        )
        .service(
            web::resource("/my-recommendations")
                .wrap(OwnershipGuard::new().email_required())
                .wrap(FirebaseAuth)
                .route(web::get().to(recommendations::my_recommendations)),
        )
        .route(
            "/my-recommendations/{id}",
            web::delete().to(recommendations::delete_recommendation),
        )
        .service(
            web::resource("/recommendations-for-me")
                .wrap(OwnershipGuard::new().email_required())
                .wrap(FirebaseAuth)
                .route(web::get().to(recommendations::recommendations_for_me)),
        );
}
