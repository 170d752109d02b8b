use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::models::EmailParam;
use crate::services::FirebaseClaims;
use crate::utils::AppError;

/// Só deixa passar quando `?email=` é igual ao email do token verificado.
///
/// Precisa rodar depois do `FirebaseAuth` (registre-o por último com `.wrap`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipGuard {
    email_required: bool,
}

impl OwnershipGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Email ausente vira 400 em vez de 403.
    pub fn email_required(mut self) -> Self {
        self.email_required = true;
        self
    }

    pub fn check(&self, claims: Option<&FirebaseClaims>, email: Option<&str>) -> Result<(), AppError> {
        let claims = claims.ok_or(AppError::Unauthorized)?;

        let email = match email.filter(|e| !e.is_empty()) {
            Some(email) => email,
            None if self.email_required => {
                return Err(AppError::bad_request("email query parameter is required"))
            }
            None => return Err(AppError::Forbidden),
        };

        match claims.email.as_deref() {
            Some(verified) if verified == email => Ok(()),
            _ => Err(AppError::Forbidden),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for OwnershipGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = OwnershipGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(OwnershipGuardService { service, guard: *self }))
    }
}

pub struct OwnershipGuardService<S> {
    service: S,
    guard: OwnershipGuard,
}

impl<S, B> Service<ServiceRequest> for OwnershipGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let email = web::Query::<EmailParam>::from_query(req.query_string())
            .ok()
            .and_then(|query| query.into_inner().email);

        let decision = {
            let extensions = req.extensions();
            self.guard.check(extensions.get::<FirebaseClaims>(), email.as_deref())
        };

        if let Err(e) = decision {
            log::warn!("🚫 {} {} blocked: {}", req.method(), req.path(), e);
            let response = e.error_response();
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(email: &str) -> FirebaseClaims {
        FirebaseClaims {
            sub: format!("uid-{email}"),
            email: Some(email.to_string()),
            email_verified: true,
            name: None,
            iat: 0,
            exp: i64::MAX,
            auth_time: None,
        }
    }

    #[test]
    fn matching_email_passes() {
        let guard = OwnershipGuard::new();
        assert!(guard.check(Some(&claims("a@x.com")), Some("a@x.com")).is_ok());
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let guard = OwnershipGuard::new();
        let err = guard.check(Some(&claims("a@x.com")), Some("A@x.com")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn missing_email_is_forbidden_unless_required() {
        let alice = claims("a@x.com");
        assert!(matches!(OwnershipGuard::new().check(Some(&alice), None), Err(AppError::Forbidden)));
        assert!(matches!(
            OwnershipGuard::new().email_required().check(Some(&alice), Some("")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn unverified_request_is_unauthorized() {
        assert!(matches!(OwnershipGuard::new().check(None, Some("a@x.com")), Err(AppError::Unauthorized)));
    }

    #[test]
    fn token_without_email_is_forbidden() {
        let mut anonymous = claims("a@x.com");
        anonymous.email = None;
        assert!(matches!(OwnershipGuard::new().check(Some(&anonymous), Some("a@x.com")), Err(AppError::Forbidden)));
    }
}
