use actix_web::{web, HttpResponse};

use crate::models::{parse_object_id, to_json_list, EmailParam, NewRecommendation, QueryIdParam};
use crate::services::RecommendationStore;
use crate::utils::AppError;

/// POST /recommendations - cria a recomendação e incrementa o contador da query
#[utoipa::path(
    post,
    path = "/recommendations",
    tag = "Recommendations",
    request_body = crate::api::swagger::RecommendationBody,
    responses(
        (status = 200, description = "Recommendation stored, parent counter incremented", body = crate::models::InsertResponse),
        (status = 400, description = "Invalid body", body = crate::utils::ErrorBody),
        (status = 404, description = "Parent query not found", body = crate::utils::ErrorBody)
    )
)]
pub async fn create_recommendation(
    store: web::Data<dyn RecommendationStore>,
    body: web::Json<NewRecommendation>,
) -> Result<HttpResponse, AppError> {
    let recommendation = body.into_inner().validate()?;
    let query_id = recommendation.query_id.to_hex();
    log::info!("💡 POST /recommendations - query: {}", query_id);

    let result = store.create_recommendation(recommendation).await?;
    log::info!("✅ Recommendation {} stored for query {}", result.inserted_id, query_id);
    Ok(HttpResponse::Ok().json(result))
}

/// GET /recommendations?queryId= - recomendações de uma query
#[utoipa::path(
    get,
    path = "/recommendations",
    tag = "Recommendations",
    params(QueryIdParam),
    responses(
        (status = 200, description = "Recommendations for the query", body = [crate::api::swagger::RecommendationBody]),
        (status = 400, description = "queryId missing", body = crate::utils::ErrorBody)
    )
)]
pub async fn recommendations_for_query(
    store: web::Data<dyn RecommendationStore>,
    params: web::Query<QueryIdParam>,
) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /recommendations - query: {}", params.query_id);
    let recommendations = store.list_by_query(params.query_id.trim()).await?;
    Ok(HttpResponse::Ok().json(to_json_list(recommendations)))
}

/// GET /my-recommendations?email= - recomendações feitas pelo usuário logado
#[utoipa::path(
    get,
    path = "/my-recommendations",
    tag = "Recommendations",
    params(EmailParam),
    responses(
        (status = 200, description = "Recommendations authored by email, newest first", body = [crate::api::swagger::RecommendationBody]),
        (status = 400, description = "email missing", body = crate::utils::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::utils::ErrorBody),
        (status = 403, description = "email does not match the token", body = crate::utils::ErrorBody)
    ),
    security(("firebase_cookie" = []), ("bearer_auth" = []))
)]
pub async fn my_recommendations(
    store: web::Data<dyn RecommendationStore>,
    params: web::Query<EmailParam>,
) -> Result<HttpResponse, AppError> {
    let email = params
        .email
        .as_deref()
        .ok_or_else(|| AppError::bad_request("email query parameter is required"))?;
    log::info!("👤 GET /my-recommendations - email: {}", email);

    let recommendations = store.list_by_recommender(email).await?;
    Ok(HttpResponse::Ok().json(to_json_list(recommendations)))
}

/// DELETE /my-recommendations/{id} - não mexe no contador da query
#[utoipa::path(
    delete,
    path = "/my-recommendations/{id}",
    tag = "Recommendations",
    params(("id" = String, Path, description = "Recommendation id")),
    responses(
        (status = 200, description = "Delete result", body = crate::models::DeleteResponse),
        (status = 400, description = "Malformed id", body = crate::utils::ErrorBody)
    )
)]
pub async fn delete_recommendation(
    store: web::Data<dyn RecommendationStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /my-recommendations/{}", id);
    let id = parse_object_id(&id)?;
    let result = store.delete_recommendation(id).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /recommendations-for-me?email= - recomendações recebidas
#[utoipa::path(
    get,
    path = "/recommendations-for-me",
    tag = "Recommendations",
    params(EmailParam),
    responses(
        (status = 200, description = "Recommendations received by email, newest first", body = [crate::api::swagger::RecommendationBody]),
        (status = 400, description = "email missing", body = crate::utils::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::utils::ErrorBody),
        (status = 403, description = "email does not match the token", body = crate::utils::ErrorBody)
    ),
    security(("firebase_cookie" = []), ("bearer_auth" = []))
)]
pub async fn recommendations_for_me(
    store: web::Data<dyn RecommendationStore>,
    params: web::Query<EmailParam>,
) -> Result<HttpResponse, AppError> {
    let email = params
        .email
        .as_deref()
        .ok_or_else(|| AppError::bad_request("email query parameter is required"))?;
    log::info!("📬 GET /recommendations-for-me - email: {}", email);

    let recommendations = store.list_received_by(email).await?;
    Ok(HttpResponse::Ok().json(to_json_list(recommendations)))
}
