//! Connect-style error envelope.
//!
//! Every error response carries a stable code and a human-readable message:
//! `{"code": "failed_precondition", "message": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::Error;

#[derive(Debug)]
pub struct ApiError(pub Error);

#[derive(Serialize)]
struct ConnectError {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ConnectError {
            code: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError(error)
    }
}

/// Handler result: a JSON body or the Connect error envelope.
pub type ApiResult<T> = Result<Json<T>, ApiError>;
