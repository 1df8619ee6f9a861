//! Response envelope and the mapping from `StorefrontError` to HTTP

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use crate::StorefrontError;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self { Self { success: true, data } }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response { Json(self).into_response() }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
}

pub type ApiResult<T> = Result<T, StorefrontError>;

impl StorefrontError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorBody { success: false, message: &message })).into_response()
    }
}

impl From<JsonRejection> for StorefrontError {
    fn from(rejection: JsonRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<PathRejection> for StorefrontError {
    fn from(rejection: PathRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<QueryRejection> for StorefrontError {
    fn from(rejection: QueryRejection) -> Self { Self::Validation(rejection.body_text()) }
}

/// `Json` whose rejections use the error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(StorefrontError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejections use the error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(StorefrontError))]
pub struct ApiPath<T>(pub T);

/// `Query` whose rejections use the error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(StorefrontError))]
pub struct ApiQuery<T>(pub T);
