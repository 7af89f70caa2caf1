//! Routes of the catalog service. Each handler checks the bearer token before
//! looking at the body, so an unauthenticated caller gets 401 even when the
//! body is also malformed.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::catalog::CatalogService;
use crate::error::{AppError, AppResult};
use crate::identity::bearer_token;
use crate::shard::UpdateOutcome;
use crate::storage::Product;

pub fn catalog_routes(service: CatalogService) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", get(get_product).put(update_product).delete(delete_product))
        .route("/users", get(list_users))
        .route("/users/register", post(register_user))
        .route("/users/{username}", axum::routing::delete(delete_user))
        .route("/health", get(health))
        .with_state(service)
}

/// Invalid JSON becomes `Null` and is rejected later by field validation.
fn lenient_json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Product document tagged with the store it lives in.
fn tagged(product: &Product, database: &str) -> AppResult<Value> {
    let mut value = serde_json::to_value(product)
        .map_err(|e| AppError::internal("encode_failed".to_string(), e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.insert("database".to_string(), Value::String(database.to_string()));
    }
    Ok(value)
}

async fn list_products(State(svc): State<CatalogService>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let rows = svc.list_products(bearer_token(&headers)).await?;
    let products = rows.iter().map(|(p, shard)| tagged(p, shard.as_str())).collect::<AppResult<Vec<_>>>()?;
    Ok(Json(json!({"count": products.len(), "products": products})))
}

async fn create_product(State(svc): State<CatalogService>, headers: HeaderMap, body: Bytes) -> AppResult<impl IntoResponse> {
    let (product, route) = svc.create_product(bearer_token(&headers), &lenient_json(&body)).await?;
    info!(target: "shard", id = %product.id, route = %route, "created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("product created in {}", route.label()),
            "product": tagged(&product, route.label())?,
        })),
    ))
}

async fn get_product(State(svc): State<CatalogService>, headers: HeaderMap, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    let (product, shard) = svc.get_product(bearer_token(&headers), &id).await?;
    Ok(Json(tagged(&product, shard.as_str())?))
}

async fn update_product(
    State(svc): State<CatalogService>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let body = match svc.update_product(bearer_token(&headers), &id, &lenient_json(&body)).await? {
        UpdateOutcome::Updated(product, shard) => json!({
            "message": "product updated successfully",
            "product": tagged(&product, shard.as_str())?,
        }),
        UpdateOutcome::Unchanged(_) => json!({"message": "no changes applied"}),
    };
    Ok(Json(body))
}

async fn delete_product(State(svc): State<CatalogService>, headers: HeaderMap, Path(id): Path<String>) -> AppResult<impl IntoResponse> {
    let shard = svc.delete_product(bearer_token(&headers), &id).await?;
    Ok(Json(json!({"message": "product deleted successfully", "deleted_from": shard.as_str()})))
}

async fn list_users(State(svc): State<CatalogService>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let users = svc.list_users(bearer_token(&headers)).await?;
    Ok(Json(json!({"count": users.len(), "users": users})))
}

async fn register_user(State(svc): State<CatalogService>, headers: HeaderMap, body: Bytes) -> AppResult<impl IntoResponse> {
    let forwarded = svc.register_user(bearer_token(&headers), &lenient_json(&body)).await?;
    let status = StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(forwarded.body)))
}

async fn delete_user(State(svc): State<CatalogService>, headers: HeaderMap, Path(username): Path<String>) -> AppResult<impl IntoResponse> {
    svc.delete_user(bearer_token(&headers), &username).await?;
    Ok(Json(json!({"message": "user deleted successfully"})))
}

async fn health(State(svc): State<CatalogService>) -> impl IntoResponse {
    match svc.shard_counts().await {
        Ok(counts) => {
            let shards: Map<String, Value> = counts.into_iter().map(|(s, n)| (s.as_str().to_string(), json!(n))).collect();
            Json(json!({
                "status": "healthy",
                "service": "catalog-server",
                "version": env!("CARGO_PKG_VERSION"),
                "shards": shards,
            }))
        }
        Err(e) => Json(json!({
            "status": "degraded",
            "service": "catalog-server",
            "version": env!("CARGO_PKG_VERSION"),
            "error": e.message(),
        })),
    }
}
