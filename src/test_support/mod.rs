//! Helpers de teste: chave RSA fixa, tokens Firebase assinados e o app montado
//! sobre o `MemoryStore`.

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::header::{HeaderName, AUTHORIZATION},
    web, App,
};
use jsonwebtoken::{jwk::JwkSet, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api;
use crate::config::AuthSettings;
use crate::services::{FirebaseVerifier, IdentityVerifier, MemoryStore, QueryStore, RecommendationStore};

pub const TEST_PROJECT: &str = "prodquery-test";
pub const TEST_KID: &str = "prodquery-test-key";

const TEST_KEY_PEM: &str = include_str!("firebase_test_key.pem");
const TEST_JWKS: &str = include_str!("firebase_test_jwks.json");

pub fn test_jwks() -> JwkSet {
    serde_json::from_str(TEST_JWKS).expect("test JWKS is valid JSON")
}

/// Claims no formato de um ID token Firebase válido para `TEST_PROJECT`.
pub fn test_claims(email: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "sub": format!("uid-{email}"),
        "email": email,
        "email_verified": true,
        "aud": TEST_PROJECT,
        "iss": format!("https://securetoken.google.com/{TEST_PROJECT}"),
        "iat": now - 10,
        "exp": now + 3600,
        "auth_time": now - 10,
    })
}

pub fn sign_with_header(header: &Header, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).expect("test key is a valid RSA PEM");
    jsonwebtoken::encode(header, claims, &key).expect("signing test token")
}

pub fn sign_token(claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    sign_with_header(&header, claims)
}

pub fn token_for(email: &str) -> String {
    sign_token(&test_claims(email))
}

/// `Authorization: Bearer <token de email>`
pub fn bearer(email: &str) -> (HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {}", token_for(email)))
}

pub fn test_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::default())
}

pub fn test_app(
    store: Arc<MemoryStore>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let queries: Arc<dyn QueryStore> = store.clone();
    let recommendations: Arc<dyn RecommendationStore> = store;
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(FirebaseVerifier::with_keys(TEST_PROJECT, test_jwks()));

    App::new()
        .app_data(web::Data::from(queries))
        .app_data(web::Data::from(recommendations))
        .app_data(web::Data::from(verifier))
        .app_data(web::Data::new(AuthSettings::default()))
        .configure(api::configure)
}
