use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie},
    web, HttpResponse,
};
use serde::{Deserialize, Serialize};

use crate::config::AuthSettings;
use crate::middleware::SESSION_COOKIE;
use crate::services::IdentityVerifier;
use crate::utils::AppError;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SessionLoginRequest {
    /// ID token emitido pelo Firebase Auth no cliente
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// POST /sessionLogin - troca o ID token por um cookie httpOnly
#[utoipa::path(
    post,
    path = "/sessionLogin",
    tag = "Session",
    request_body = SessionLoginRequest,
    responses(
        (status = 200, description = "Token verified, session cookie set", body = SessionResponse),
        (status = 401, description = "Invalid token", body = crate::utils::ErrorBody)
    )
)]
pub async fn session_login(
    verifier: web::Data<dyn IdentityVerifier>,
    settings: web::Data<AuthSettings>,
    body: web::Json<SessionLoginRequest>,
) -> Result<HttpResponse, AppError> {
    let token = body.into_inner().token;

    let claims = verifier.verify(token.trim()).await.map_err(|e| {
        log::warn!("🔒 POST /sessionLogin rejected: {}", e);
        AppError::Unauthorized
    })?;

    // O cookie vive enquanto o token for válido
    let remaining = (claims.exp - chrono::Utc::now().timestamp()).max(0);
    let cookie = Cookie::build(SESSION_COOKIE, token.trim().to_string())
        .http_only(true)
        .path("/")
        .secure(settings.cookie_secure)
        .same_site(settings.cookie_same_site)
        .max_age(CookieDuration::seconds(remaining))
        .finish();

    log::info!("🔑 Session opened for {} ({}s)", claims.email.as_deref().unwrap_or(&claims.sub), remaining);

    Ok(HttpResponse::Ok().cookie(cookie).json(SessionResponse {
        success: true,
        email: claims.email,
    }))
}

/// POST /logout - remove o cookie de sessão
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Session",
    responses(
        (status = 200, description = "Session cookie cleared", body = SessionResponse)
    )
)]
pub async fn logout(settings: web::Data<AuthSettings>) -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .http_only(true)
        .path("/")
        .secure(settings.cookie_secure)
        .same_site(settings.cookie_same_site)
        .finish();
    cookie.make_removal();

    log::info!("👋 Session closed");
    HttpResponse::Ok().cookie(cookie).json(SessionResponse {
        success: true,
        email: None,
    })
}
