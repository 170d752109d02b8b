use actix_web::{web, HttpResponse};

use crate::models::{
    parse_object_id, to_json, to_json_list, EmailParam, NewQuery, QueryUpdate, HIGHLIGHTED_LIMIT,
    OWNER_FIELD, RECENT_LIMIT,
};
use crate::services::QueryStore;
use crate::utils::AppError;

/// POST /query - Cadastra uma nova query (pedido de produto)
#[utoipa::path(
    post,
    path = "/query",
    tag = "Queries",
    request_body = crate::api::swagger::QueryBody,
    responses(
        (status = 200, description = "Query stored", body = crate::models::InsertResponse),
        (status = 400, description = "Invalid body", body = crate::utils::ErrorBody)
    )
)]
pub async fn submit_query(
    store: web::Data<dyn QueryStore>,
    body: web::Json<NewQuery>,
) -> Result<HttpResponse, AppError> {
    let document = body.into_inner().into_document()?;
    log::info!("📝 POST /query - owner: {}", document.get_str(OWNER_FIELD).unwrap_or_default());

    let result = store.submit_query(document).await?;
    log::info!("✅ Query stored: {}", result.inserted_id);
    Ok(HttpResponse::Ok().json(result))
}

/// GET /querys/recent - 6 queries mais recentes
#[utoipa::path(
    get,
    path = "/querys/recent",
    tag = "Queries",
    responses(
        (status = 200, description = "Most recent queries, newest first", body = [crate::api::swagger::QueryBody])
    )
)]
pub async fn recent_queries(store: web::Data<dyn QueryStore>) -> Result<HttpResponse, AppError> {
    log::info!("🕒 GET /querys/recent");
    let queries = store.list_recent(RECENT_LIMIT).await?;
    Ok(HttpResponse::Ok().json(to_json_list(queries)))
}

/// GET /highlighted-products - queries com mais recomendações
#[utoipa::path(
    get,
    path = "/highlighted-products",
    tag = "Queries",
    responses(
        (status = 200, description = "Queries with the most recommendations", body = [crate::api::swagger::QueryBody]),
        (status = 500, description = "Lookup failed", body = crate::utils::ErrorBody)
    )
)]
pub async fn highlighted_products(store: web::Data<dyn QueryStore>) -> Result<HttpResponse, AppError> {
    log::info!("⭐ GET /highlighted-products");
    let queries = store.list_highlighted(HIGHLIGHTED_LIMIT).await.map_err(|e| {
        log::error!("❌ Highlighted products lookup failed: {}", e);
        AppError::Upstream("Failed to fetch highlighted products".to_string())
    })?;
    Ok(HttpResponse::Ok().json(to_json_list(queries)))
}

/// GET /allQuery - todas as queries, sem paginação
#[utoipa::path(
    get,
    path = "/allQuery",
    tag = "Queries",
    responses(
        (status = 200, description = "Every query", body = [crate::api::swagger::QueryBody])
    )
)]
pub async fn all_queries(store: web::Data<dyn QueryStore>) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /allQuery");
    let queries = store.list_all().await?;
    log::info!("✅ Listed {} queries", queries.len());
    Ok(HttpResponse::Ok().json(to_json_list(queries)))
}

/// GET /queryDetails/{id} e GET /myQueryDetails/{id}
#[utoipa::path(
    get,
    path = "/queryDetails/{id}",
    tag = "Queries",
    params(("id" = String, Path, description = "Query id")),
    responses(
        (status = 200, description = "The query", body = crate::api::swagger::QueryBody),
        (status = 400, description = "Malformed id", body = crate::utils::ErrorBody),
        (status = 404, description = "No query with this id", body = crate::utils::ErrorBody)
    )
)]
pub async fn query_details(
    store: web::Data<dyn QueryStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔍 GET query details {}", id);
    let id = parse_object_id(&id)?;

    match store.get_query(id).await? {
        Some(query) => Ok(HttpResponse::Ok().json(to_json(query))),
        None => Err(AppError::not_found("query not found")),
    }
}

/// GET /myQuery?email= - queries do usuário logado (token + dono)
#[utoipa::path(
    get,
    path = "/myQuery",
    tag = "Queries",
    params(EmailParam),
    responses(
        (status = 200, description = "Queries owned by email, newest first", body = [crate::api::swagger::QueryBody]),
        (status = 401, description = "Missing or invalid token", body = crate::utils::ErrorBody),
        (status = 403, description = "email does not match the token", body = crate::utils::ErrorBody)
    ),
    security(("firebase_cookie" = []), ("bearer_auth" = []))
)]
pub async fn my_queries(
    store: web::Data<dyn QueryStore>,
    params: web::Query<EmailParam>,
) -> Result<HttpResponse, AppError> {
    let email = params.email.as_deref().ok_or(AppError::Forbidden)?;
    log::info!("👤 GET /myQuery - email: {}", email);

    let queries = store.list_owned_by(email).await?;
    log::info!("✅ {} queries for {}", queries.len(), email);
    Ok(HttpResponse::Ok().json(to_json_list(queries)))
}

/// PUT /query/{id} - upsert dos campos enviados
#[utoipa::path(
    put,
    path = "/query/{id}",
    tag = "Queries",
    params(("id" = String, Path, description = "Query id")),
    request_body = crate::api::swagger::QueryBody,
    responses(
        (status = 200, description = "Fields stored (created when absent)", body = crate::models::UpdateResponse),
        (status = 400, description = "Invalid id or body", body = crate::utils::ErrorBody)
    )
)]
pub async fn update_query(
    store: web::Data<dyn QueryStore>,
    id: web::Path<String>,
    body: web::Json<QueryUpdate>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔧 PUT /query/{}", id);
    let id = parse_object_id(&id)?;
    let fields = body.into_inner().into_fields()?;

    let result = store.replace_query(id, fields).await?;
    if result.upserted_count > 0 {
        log::info!("✅ Query {} created by upsert", id.to_hex());
    }
    Ok(HttpResponse::Ok().json(result))
}

/// DELETE /query/{id}
#[utoipa::path(
    delete,
    path = "/query/{id}",
    tag = "Queries",
    params(("id" = String, Path, description = "Query id")),
    responses(
        (status = 200, description = "Delete result", body = crate::models::DeleteResponse),
        (status = 400, description = "Malformed id", body = crate::utils::ErrorBody)
    )
)]
pub async fn delete_query(
    store: web::Data<dyn QueryStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️  DELETE /query/{}", id);
    let id = parse_object_id(&id)?;
    let result = store.delete_query(id).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// PATCH /query/{id} - decrementa `recommendationCount` (chamar depois de apagar uma recomendação)
#[utoipa::path(
    patch,
    path = "/query/{id}",
    tag = "Queries",
    params(("id" = String, Path, description = "Query id")),
    responses(
        (status = 200, description = "Counter decremented", body = crate::models::UpdateResponse),
        (status = 400, description = "Malformed id", body = crate::utils::ErrorBody)
    )
)]
pub async fn decrement_recommendation_count(
    store: web::Data<dyn QueryStore>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    log::info!("➖ PATCH /query/{}", id);
    let id = parse_object_id(&id)?;
    let result = store.adjust_recommendation_count(id, -1).await?;
    Ok(HttpResponse::Ok().json(result))
}

#[cfg(test)]
mod tests {
    use crate::models::{InsertResponse, UpdateResponse};
    use crate::test_support::{bearer, test_app, test_store, token_for};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    fn submit(email: &str, created_at: &str, name: &str) -> test::TestRequest {
        test::TestRequest::post().uri("/query").set_json(json!({
            "hr_email": email,
            "createdAt": created_at,
            "productName": name,
        }))
    }

    #[actix_web::test]
    async fn submitted_query_shows_up_in_all_queries() {
        let app = test::init_service(test_app(test_store())).await;

        let inserted: InsertResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/query")
                .set_json(json!({
                    "hr_email": "a@x.com",
                    "createdAt": "2025-06-01T10:00:00Z",
                    "productName": "Noise cancelling headphones",
                    "productBrand": "Acme",
                    "boycottingReason": "too loud",
                }))
                .to_request(),
        )
        .await;
        assert!(inserted.acknowledged);

        let all: Vec<Value> =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/allQuery").to_request()).await;
        assert_eq!(all.len(), 1);
        let stored = &all[0];
        assert_eq!(stored["_id"], json!(inserted.inserted_id));
        assert_eq!(stored["hr_email"], json!("a@x.com"));
        assert_eq!(stored["createdAt"], json!("2025-06-01T10:00:00Z"));
        assert_eq!(stored["productName"], json!("Noise cancelling headphones"));
        assert_eq!(stored["productBrand"], json!("Acme"));
        assert_eq!(stored["boycottingReason"], json!("too loud"));
        assert_eq!(stored["recommendationCount"], json!(0));
    }

    #[actix_web::test]
    async fn created_at_comes_back_exactly_as_submitted() {
        let app = test::init_service(test_app(test_store())).await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/query")
                .set_json(json!({ "hr_email": "a@x.com", "createdAt": 1718000000000i64, "productName": "epoch" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        test::call_service(&app, submit("a@x.com", "2025-06-01", "day").to_request()).await;
        test::call_service(&app, submit("a@x.com", "2025-06-01T10:00:00.000Z", "millis").to_request()).await;

        let all: Vec<Value> =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/allQuery").to_request()).await;
        let created: Vec<(&str, &Value)> = all
            .iter()
            .map(|q| (q["productName"].as_str().unwrap(), &q["createdAt"]))
            .collect();
        assert_eq!(
            created,
            vec![
                ("epoch", &json!(1718000000000i64)),
                ("day", &json!("2025-06-01")),
                ("millis", &json!("2025-06-01T10:00:00.000Z")),
            ]
        );
        assert!(all.iter().all(|q| q.get("_createdAtDate").is_none()));

        // Ordenação usa a data normalizada, não o valor enviado
        let mine: Vec<Value> = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/myQuery?email=a@x.com")
                .insert_header(bearer("a@x.com"))
                .to_request(),
        )
        .await;
        let names: Vec<&str> = mine.iter().map(|q| q["productName"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["millis", "day", "epoch"]);
    }

    #[actix_web::test]
    async fn invalid_bodies_get_json_400() {
        let app = test::init_service(test_app(test_store())).await;

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/query")
                .set_json(json!({ "productName": "no owner" }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert!(body["message"].is_string());

        let res = test::call_service(&app, submit("not-an-email", "2025-06-01", "x").to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn recent_is_capped_at_six_newest_first() {
        let app = test::init_service(test_app(test_store())).await;
        for day in 1..=9 {
            let created = format!("2025-06-{:02}T00:00:00Z", day);
            test::call_service(&app, submit("a@x.com", &created, &format!("p{day}")).to_request()).await;
        }

        let recent: Vec<Value> =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/querys/recent").to_request()).await;
        let names: Vec<&str> = recent.iter().map(|q| q["productName"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["p9", "p8", "p7", "p6", "p5", "p4"]);
    }

    #[actix_web::test]
    async fn highlighted_orders_by_recommendation_count() {
        let store = test_store();
        let app = test::init_service(test_app(store.clone())).await;

        let mut ids = Vec::new();
        for i in 0..10 {
            let inserted: InsertResponse = test::call_and_read_body_json(
                &app,
                submit("a@x.com", "2025-06-01T00:00:00Z", &format!("p{i}")).to_request(),
            )
            .await;
            ids.push(inserted.inserted_id);
        }
        // p3 recebe 3 recomendações, p7 recebe 1
        for (id, times) in [(&ids[3], 3), (&ids[7], 1)] {
            for _ in 0..times {
                let res = test::call_service(
                    &app,
                    test::TestRequest::post()
                        .uri("/recommendations")
                        .set_json(json!({
                            "queryId": id,
                            "recommenderEmail": "b@x.com",
                            "userEmail": "a@x.com",
                            "timestamp": 1718000000000i64,
                        }))
                        .to_request(),
                )
                .await;
                assert_eq!(res.status(), StatusCode::OK);
            }
        }

        let top: Vec<Value> = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/highlighted-products").to_request(),
        )
        .await;
        assert_eq!(top.len(), 8);
        assert_eq!(top[0]["productName"], json!("p3"));
        assert_eq!(top[0]["recommendationCount"], json!(3));
        assert_eq!(top[1]["productName"], json!("p7"));
    }

    #[actix_web::test]
    async fn details_return_404_and_400() {
        let app = test::init_service(test_app(test_store())).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/queryDetails/665f1c2e9b1e8a3d4c5b6a79").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = test::call_service(&app, test::TestRequest::get().uri("/myQueryDetails/nope").to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn my_query_returns_only_owned_queries() {
        let app = test::init_service(test_app(test_store())).await;
        test::call_service(&app, submit("a@x.com", "2025-06-01T00:00:00Z", "mine-old").to_request()).await;
        test::call_service(&app, submit("b@x.com", "2025-06-02T00:00:00Z", "theirs").to_request()).await;
        test::call_service(&app, submit("a@x.com", "2025-06-03T00:00:00Z", "mine-new").to_request()).await;

        let mine: Vec<Value> = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/myQuery?email=a@x.com")
                .insert_header(bearer("a@x.com"))
                .to_request(),
        )
        .await;
        let names: Vec<&str> = mine.iter().map(|q| q["productName"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["mine-new", "mine-old"]);
    }

    #[actix_web::test]
    async fn my_query_with_someone_elses_token_is_forbidden() {
        let app = test::init_service(test_app(test_store())).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/myQuery?email=a@x.com")
                .insert_header(bearer("b@x.com"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({ "message": "forbidden access" }));

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/myQuery").insert_header(bearer("a@x.com")).to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn my_query_without_valid_token_is_unauthorized() {
        let app = test::init_service(test_app(test_store())).await;

        for req in [
            test::TestRequest::get().uri("/myQuery?email=a@x.com"),
            test::TestRequest::get().uri("/myQuery"),
            test::TestRequest::get()
                .uri("/myQuery?email=a@x.com")
                .insert_header(("Authorization", "Bearer not-a-token")),
            test::TestRequest::get()
                .uri("/myQuery?email=a@x.com")
                .insert_header(("Authorization", token_for("a@x.com"))),
        ] {
            let res = test::call_service(&app, req.to_request()).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            let body: Value = test::read_body_json(res).await;
            assert_eq!(body, json!({ "message": "unauthorized access" }));
        }
    }

    #[actix_web::test]
    async fn put_on_missing_id_upserts_exactly_the_submitted_fields() {
        let app = test::init_service(test_app(test_store())).await;
        let id = "665f1c2e9b1e8a3d4c5b6a79";

        let result: UpdateResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::put()
                .uri(&format!("/query/{id}"))
                .set_json(json!({ "productName": "Standing desk", "productBrand": "Acme" }))
                .to_request(),
        )
        .await;
        assert_eq!(result.upserted_id.as_deref(), Some(id));

        let stored: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri(&format!("/queryDetails/{id}")).to_request(),
        )
        .await;
        assert_eq!(
            stored,
            json!({ "_id": id, "productName": "Standing desk", "productBrand": "Acme" })
        );
    }

    #[actix_web::test]
    async fn put_keeps_the_counter_and_delete_removes() {
        let app = test::init_service(test_app(test_store())).await;
        let inserted: InsertResponse = test::call_and_read_body_json(
            &app,
            submit("a@x.com", "2025-06-01T00:00:00Z", "old name").to_request(),
        )
        .await;
        let uri = format!("/query/{}", inserted.inserted_id);

        let result: UpdateResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::put()
                .uri(&uri)
                .set_json(json!({ "productName": "new name", "recommendationCount": 99 }))
                .to_request(),
        )
        .await;
        assert_eq!((result.matched_count, result.modified_count), (1, 1));

        let stored: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri(&format!("/queryDetails/{}", inserted.inserted_id)).to_request(),
        )
        .await;
        assert_eq!(stored["productName"], json!("new name"));
        assert_eq!(stored["recommendationCount"], json!(0));

        let deleted: Value =
            test::call_and_read_body_json(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
        assert_eq!(deleted, json!({ "acknowledged": true, "deletedCount": 1 }));

        let all: Vec<Value> =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/allQuery").to_request()).await;
        assert!(all.is_empty());
    }
}
