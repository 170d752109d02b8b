use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web, Error, HttpMessage, HttpRequest, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::config::{AuthMode, AuthSettings};
use crate::services::{bearer_token, AuthError, IdentityVerifier};
use crate::utils::AppError;

/// Cookie httpOnly gravado pelo `/sessionLogin`
pub const SESSION_COOKIE: &str = "firebaseToken";

/// Verifica o token Firebase (cookie de sessão e/ou Bearer) e coloca os
/// `FirebaseClaims` nas extensions do request. Falha → 401.
pub struct FirebaseAuth;

impl<S, B> Transform<S, ServiceRequest> for FirebaseAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = FirebaseAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(FirebaseAuthService {
            service: Rc::new(service),
        }))
    }
}

pub struct FirebaseAuthService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for FirebaseAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let Some(verifier) = req.app_data::<web::Data<dyn IdentityVerifier>>().cloned() else {
                log::error!("❌ No IdentityVerifier registered in app data");
                let response = AppError::Internal("identity verifier missing".to_string()).error_response();
                return Ok(req.into_response(response).map_into_right_body());
            };
            let mode = req
                .app_data::<web::Data<AuthSettings>>()
                .map(|settings| settings.mode)
                .unwrap_or(AuthMode::Any);

            let verified = match credential(req.request(), mode) {
                Ok(token) => verifier.verify(&token).await,
                Err(e) => Err(e),
            };

            match verified {
                Ok(claims) => {
                    log::debug!("🔓 {} {} verified for uid {}", req.method(), req.path(), claims.sub);
                    req.extensions_mut().insert(claims);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    log::warn!("🔒 {} {} rejected: {}", req.method(), req.path(), e);
                    let response = AppError::Unauthorized.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

/// Lê o token conforme o `AuthMode` configurado.
pub fn credential(req: &HttpRequest, mode: AuthMode) -> Result<String, AuthError> {
    let from_cookie = || {
        req.cookie(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    };
    let from_header = || -> Result<String, AuthError> {
        let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingCredential)?;
        let value = header.to_str().map_err(|_| AuthError::MalformedHeader)?;
        bearer_token(value).map(str::to_string)
    };

    match mode {
        AuthMode::Cookie => from_cookie().ok_or(AuthError::MissingCredential),
        AuthMode::Bearer => from_header(),
        AuthMode::Any => match from_cookie() {
            Some(token) => Ok(token),
            None => from_header(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    #[test]
    fn cookie_mode_ignores_bearer_header() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer header-token"))
            .to_http_request();
        assert!(matches!(credential(&req, AuthMode::Cookie), Err(AuthError::MissingCredential)));
        assert_eq!(credential(&req, AuthMode::Bearer).unwrap(), "header-token");
    }

    #[test]
    fn any_mode_prefers_the_session_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "cookie-token"))
            .insert_header((AUTHORIZATION, "Bearer header-token"))
            .to_http_request();
        assert_eq!(credential(&req, AuthMode::Any).unwrap(), "cookie-token");
    }

    #[test]
    fn malformed_header_is_rejected() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Token abc"))
            .to_http_request();
        assert!(matches!(credential(&req, AuthMode::Any), Err(AuthError::MalformedHeader)));
    }
}
