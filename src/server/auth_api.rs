//! Routes of the auth service.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use super::parse_body;
use crate::error::AppResult;
use crate::identity::{bearer_token, AuthService, LoginRequest, RegisterRequest};
use crate::storage::blocking;

pub fn auth_routes(service: AuthService) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify))
        .route("/health", get(health))
        .with_state(service)
}

async fn register(State(service): State<AuthService>, body: Bytes) -> AppResult<impl IntoResponse> {
    let req: RegisterRequest = parse_body(&body)?;
    blocking(move || service.register(&req)).await?;
    Ok((StatusCode::CREATED, Json(json!({"message": "user registered successfully"}))))
}

async fn login(State(service): State<AuthService>, body: Bytes) -> AppResult<impl IntoResponse> {
    let req: LoginRequest = parse_body(&body)?;
    let resp = blocking(move || service.login(&req)).await?;
    Ok(Json(resp))
}

async fn verify(State(service): State<AuthService>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let principal = service.verify(bearer_token(&headers).unwrap_or_default())?;
    Ok(Json(json!({"message": "token valid", "username": principal.username})))
}

async fn health(State(service): State<AuthService>) -> impl IntoResponse {
    let users = blocking(move || Ok(service.users().list()?.len())).await;
    Json(json!({
        "status": if users.is_ok() { "healthy" } else { "degraded" },
        "service": "auth-server",
        "version": env!("CARGO_PKG_VERSION"),
        "database_connected": users.is_ok(),
        "users": users.ok(),
    }))
}
