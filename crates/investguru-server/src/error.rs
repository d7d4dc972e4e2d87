use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use investguru_store::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Auth(err) => return err.into_response(),
            ApiError::Store(err) => match err {
                StoreError::UsernameTaken(_) => {
                    (StatusCode::BAD_REQUEST, String::from("Username already exists"))
                }
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, String::from("Not found")),
                StoreError::InvalidData(reason) => (StatusCode::BAD_REQUEST, reason),
                other => {
                    tracing::error!(error = %other, "store failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        String::from("Internal server error"),
                    )
                }
            },
            ApiError::NotFound(reason) => (StatusCode::NOT_FOUND, reason),
            ApiError::Validation(reason) => (StatusCode::UNPROCESSABLE_ENTITY, reason),
            ApiError::ServiceUnavailable(reason) => (StatusCode::SERVICE_UNAVAILABLE, reason),
            ApiError::Internal(reason) => {
                tracing::error!(%reason, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, reason)
            }
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: msg,
        });
        (status, body).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Background task failed: {err}"))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
