use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::{AuthenticatedUser, SESSION_COOKIE};
use crate::error::AppError;
use crate::state::AppState;

/// Session gate for protected scopes.
///
/// Takes the token from the `token` cookie, falling back to an
/// `Authorization: Bearer` header, and verifies it with the [`TokenCodec`] held
/// in [`AppState`]. The account row is not re-read; the embedded identity is
/// trusted until the token expires.
///
/// [`TokenCodec`]: crate::auth::TokenCodec
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

fn session_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUser, AppError> {
    let token = session_token(req)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        AppError::InternalServerError("AppState is not registered on the app".into())
    })?;

    let claims = state.codec.verify(&token).map_err(|reason| {
        log::debug!("rejected session token on {}: {}", req.path(), reason);
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    Ok(AuthenticatedUser {
        id: claims.sub,
        name: claims.name,
        email: claims.email,
    })
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(app_err) => Box::pin(async move { Err(app_err.into()) }),
        }
    }
}
