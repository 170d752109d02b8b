use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::services::QueryStore;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

/// GET / - liveness, mesmo texto de sempre
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up", body = String)
    )
)]
pub async fn liveness() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Prod Query to be ready")
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(store: web::Data<dyn QueryStore>) -> impl Responder {
    let (status, database) = match store.ping().await {
        Ok(()) => ("healthy", "up".to_string()),
        Err(e) => {
            log::warn!("⚠️  Health check: database unreachable: {}", e);
            ("degraded", "down".to_string())
        }
    };

    let body = HealthResponse {
        status: status.to_string(),
        service: "prodquery-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: chrono::Utc::now().timestamp(),
    };

    if status == "healthy" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_app, test_store};
    use actix_web::test;

    #[actix_web::test]
    async fn liveness_returns_plain_text() {
        let app = test::init_service(test_app(test_store())).await;
        let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(&body[..], b"Prod Query to be ready");
    }

    #[actix_web::test]
    async fn health_reports_database_up() {
        let app = test::init_service(test_app(test_store())).await;
        let res: HealthResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(res.status, "healthy");
        assert_eq!(res.database, "up");
    }
}
