use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, ToSchema};

use crate::middleware::SESSION_COOKIE;

/// Query como guardada na coleção `query`. Campos além destes são aceitos e
/// devolvidos como vieram.
#[derive(ToSchema)]
#[allow(dead_code, non_snake_case)]
pub struct QueryBody {
    /// Gerado pelo servidor (hex de 24 caracteres)
    #[schema(read_only)]
    _id: Option<String>,
    /// Email do dono
    #[schema(example = "hr@example.com")]
    hr_email: String,
    /// ISO-8601 ou epoch em ms
    #[schema(example = "2025-06-01T10:00:00Z")]
    createdAt: String,
    /// Mantido pelo servidor
    #[schema(read_only)]
    recommendationCount: Option<i32>,
    productName: Option<String>,
    productBrand: Option<String>,
    productImageUrl: Option<String>,
    queryTitle: Option<String>,
    boycottingReason: Option<String>,
}

/// Recomendação como guardada na coleção `recommendations`.
#[derive(ToSchema)]
#[allow(dead_code, non_snake_case)]
pub struct RecommendationBody {
    #[schema(read_only)]
    _id: Option<String>,
    /// Id da query recomendada
    #[schema(example = "665f1c2e9b1e8a3d4c5b6a79")]
    queryId: String,
    #[schema(example = "friend@example.com")]
    recommenderEmail: String,
    /// Dono da query
    #[schema(example = "hr@example.com")]
    userEmail: String,
    /// ISO-8601 ou epoch em ms
    timestamp: String,
    recommendationTitle: Option<String>,
    recommendedProductName: Option<String>,
    recommendedProductImage: Option<String>,
    recommendationReason: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ProdQuery API",
        version = "1.0.0",
        description = "Product alternative queries and recommendations.\n\n**Authentication:** the user-scoped routes (`/myQuery`, `/my-recommendations`, `/recommendations-for-me`) need a Firebase ID token, sent as the `firebaseToken` session cookie (see `/sessionLogin`) or as `Authorization: Bearer <token>`, and an `email` query parameter equal to the token's email."
    ),
    paths(
        // Health
        crate::api::health::liveness,
        crate::api::health::health_check,

        // Session
        crate::api::session::session_login,
        crate::api::session::logout,

        // Queries
        crate::api::queries::submit_query,
        crate::api::queries::recent_queries,
        crate::api::queries::highlighted_products,
        crate::api::queries::all_queries,
        crate::api::queries::query_details,
        crate::api::queries::my_queries,
        crate::api::queries::update_query,
        crate::api::queries::delete_query,
        crate::api::queries::decrement_recommendation_count,

        // Recommendations
        crate::api::recommendations::create_recommendation,
        crate::api::recommendations::recommendations_for_query,
        crate::api::recommendations::my_recommendations,
        crate::api::recommendations::delete_recommendation,
        crate::api::recommendations::recommendations_for_me,
    ),
    components(
        schemas(
            QueryBody,
            RecommendationBody,
            crate::api::health::HealthResponse,
            crate::api::session::SessionLoginRequest,
            crate::api::session::SessionResponse,
            crate::models::InsertResponse,
            crate::models::UpdateResponse,
            crate::models::DeleteResponse,
            crate::utils::ErrorBody,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and database health."),
        (name = "Session", description = "Firebase session cookie login and logout."),
        (name = "Queries", description = "Product queries: submit, browse, update and delete."),
        (name = "Recommendations", description = "Recommendations for queries. Creating one increments the query's recommendationCount."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Firebase ID token"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "firebase_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE,
                    "Session cookie set by /sessionLogin",
                ))),
            );
        }
    }
}
