use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("existing user found with this email")]
    DuplicateEmail,

    #[error("please try with correct email/password")]
    InvalidCredentials,

    #[error("Please authenticate using a valid token")]
    Unauthenticated,

    #[error("quantity must not be negative, got {0}")]
    InvalidQuantity(i64),

    #[error("upload failed: {0}")]
    UploadFailure(String),

    #[error("password hashing failed: {0}")]
    Hash(#[from] argon2::Error),

    #[error("token encoding failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DuplicateEmail
            | AppError::InvalidCredentials
            | AppError::InvalidQuantity(_)
            | AppError::UploadFailure(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Hash(_) | AppError::Token(_) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::Unauthenticated => {
                HttpResponse::build(status).json(json!({ "errors": self.to_string() }))
            }
            AppError::UploadFailure(_) => HttpResponse::build(status)
                .json(json!({ "success": 0, "errors": self.to_string() })),
            _ if status.is_server_error() => {
                log::error!("{}", self);
                HttpResponse::build(status).json("Internal Server Error")
            }
            _ => HttpResponse::build(status)
                .json(json!({ "success": false, "errors": self.to_string() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn client_errors_keep_the_storefront_shape() {
        let response = AppError::DuplicateEmail.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["errors"], "existing user found with this email");
    }

    #[actix_web::test]
    async fn unauthenticated_is_401_with_errors_field() {
        let response = AppError::Unauthenticated.error_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["errors"], "Please authenticate using a valid token");
    }

    #[test]
    fn store_failures_are_internal() {
        let err = AppError::from(StoreError::Poisoned);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
