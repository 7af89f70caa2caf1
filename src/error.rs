//! Unified application error model shared by the auth and catalog services.
//! Every variant carries a stable machine `code` and a human `message`; the HTTP
//! mapping lives here so handlers can simply return `AppResult<T>`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Validation { code: String, message: String },
    Unauthorized { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Upstream { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Unauthorized { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Unauthorized { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Upstream { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn unauthorized<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unauthorized { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn upstream<S: Into<String>>(code: S, msg: S) -> Self { AppError::Upstream { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    ///
    /// Duplicate username/email is reported as 400 rather than 409: the
    /// registration API has always answered conflicts with Bad Request.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 400,
            AppError::Unauthorized { .. } => 401,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 400,
            AppError::Upstream { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({ "message": self.message(), "code": self.code_str() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::validation("missing_field", "name is required").http_status(), 400);
        assert_eq!(AppError::unauthorized("token_expired", "expired").http_status(), 401);
        assert_eq!(AppError::not_found("product_not_found", "missing").http_status(), 404);
        assert_eq!(AppError::conflict("username_taken", "dup").http_status(), 400);
        assert_eq!(AppError::upstream("auth_unreachable", "conn refused").http_status(), 500);
        assert_eq!(AppError::internal("hash_failed", "panic").http_status(), 500);
    }

    #[test]
    fn display_joins_code_and_message() {
        let e = AppError::not_found("user_not_found", "no such user");
        assert_eq!(e.to_string(), "user_not_found: no such user");
    }

    #[tokio::test]
    async fn into_response_carries_status_and_message() {
        let resp = AppError::upstream("store_io", "disk gone").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["message"], "disk gone");
        assert_eq!(v["code"], "store_io");
    }
}
