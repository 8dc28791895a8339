use std::rc::Rc;

use actix_service::{forward_ready, Service};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ok, ready, LocalBoxFuture, Ready};
use mongodb::bson::oid::ObjectId;

use crate::auth::Tokens;
use crate::error::AppError;

pub const TOKEN_HEADER: &str = "auth-token";

/// Identity of the caller, set by [`AuthMiddleware`] once the token checks out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub ObjectId);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .copied()
                .ok_or(AppError::Unauthenticated),
        )
    }
}

/// The raw token: the `auth-token` header, or an `Authorization: Bearer` one.
fn request_token(req: &ServiceRequest) -> Option<String> {
    if let Some(value) = req.headers().get(TOKEN_HEADER) {
        return value.to_str().ok().map(|s| s.trim().to_string());
    }
    let auth = req.headers().get("Authorization")?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

pub struct AuthMiddleware {
    tokens: Tokens,
}

impl AuthMiddleware {
    pub fn new(tokens: Tokens) -> Self {
        AuthMiddleware { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();

    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    tokens: Tokens,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verified = request_token(&req)
            .ok_or(AppError::Unauthenticated)
            .and_then(|token| self.tokens.authenticate(&token));

        Box::pin(async move {
            match verified {
                Ok(user_id) => {
                    req.extensions_mut().insert(AuthUser(user_id));
                    service.call(req).await
                }
                Err(e) => {
                    log::debug!("Rejected {} {}: {}", req.method(), req.path(), e);
                    Err(e.into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.0.to_hex())
    }

    #[actix_web::test]
    async fn accepts_both_header_styles() {
        let tokens = Tokens::new("secret");
        let id = ObjectId::new();
        let token = tokens.issue(&id).unwrap();
        let app = test::init_service(App::new().service(
            web::resource("/me")
                .wrap(AuthMiddleware::new(tokens.clone()))
                .route(web::get().to(whoami)),
        ))
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((TOKEN_HEADER, token.as_str()))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, id.to_hex().as_bytes());

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, id.to_hex().as_bytes());
    }

    #[actix_web::test]
    async fn missing_or_forged_tokens_get_401() {
        let app = test::init_service(App::new().service(
            web::resource("/me")
                .wrap(AuthMiddleware::new(Tokens::new("secret")))
                .route(web::get().to(whoami)),
        ))
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let forged = Tokens::new("other").issue(&ObjectId::new()).unwrap();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header((TOKEN_HEADER, forged))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);
    }
}
