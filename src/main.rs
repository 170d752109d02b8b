mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::{
    middleware::{Compress, Logger},
    web, App, HttpServer,
};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::{Config, StorageBackend};
use services::{FirebaseVerifier, IdentityVerifier, MemoryStore, QueryStore, RecommendationStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("❌ Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("🚀 Starting ProdQuery service...");
    log::info!("🔐 Auth mode: {:?}", config.auth.mode);

    let (queries, recommendations): (Arc<dyn QueryStore>, Arc<dyn RecommendationStore>) = match config.storage {
        StorageBackend::MongoDb => {
            log::info!("📊 Database: {}", config.redacted_mongodb_uri());
            let db = database::MongoDB::new(
                &config.mongodb_uri,
                &config.mongodb_database,
                config.mongodb_transactions,
            )
            .await
            .map_err(|e| {
                log::error!("❌ Failed to connect to MongoDB: {}", e);
                io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string())
            })?;
            log::info!("✅ MongoDB connected successfully");

            let db = Arc::new(db);
            let queries: Arc<dyn QueryStore> = db.clone();
            let recommendations: Arc<dyn RecommendationStore> = db;
            (queries, recommendations)
        }
        StorageBackend::Memory => {
            log::warn!("⚠️  Using in-memory storage, data is lost on restart");
            let store = Arc::new(MemoryStore::default());
            let queries: Arc<dyn QueryStore> = store.clone();
            let recommendations: Arc<dyn RecommendationStore> = store;
            (queries, recommendations)
        }
    };

    let mut firebase = FirebaseVerifier::new(config.firebase_project_id.clone());
    if let Some(url) = &config.firebase_jwks_url {
        log::info!("🔑 Firebase signing keys from {}", url);
        firebase = firebase.with_keys_url(url.clone());
    }
    log::info!("🔥 Firebase project: {}", firebase.project_id());
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(firebase);

    let query_data = web::Data::from(queries);
    let recommendation_data = web::Data::from(recommendations);
    let verifier_data = web::Data::from(verifier);
    let auth_data = web::Data::new(config.auth.clone());

    let host = config.host.clone();
    let port = config.port;
    let cors_origins = config.cors_origins.clone();

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(query_data.clone())
            .app_data(recommendation_data.clone())
            .app_data(verifier_data.clone())
            .app_data(auth_data.clone())
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
