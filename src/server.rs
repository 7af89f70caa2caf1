//!
//! shardcat HTTP servers
//! ---------------------
//! Axum wiring for the two services:
//! - the auth service (`/auth/register`, `/auth/login`, `/auth/verify`), which owns
//!   the user store and signs tokens;
//! - the catalog service (`/products`, `/users`), which verifies every request
//!   against the auth service and routes product records across two shards.
//!
//! Both expose an unauthenticated `/health` and allow any CORS origin.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::Router;
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::catalog::CatalogService;
use crate::config::{AuthServerConfig, CatalogServerConfig};
use crate::error::{AppError, AppResult};
use crate::identity::{AuthService, HttpAuthClient, TokenService};
use crate::shard::ShardRouter;
use crate::storage::{FileBackend, FileUserStore, MemoryBackend, MemoryUserStore, StorageBackend, UserStore};

pub mod auth_api;
pub mod catalog_api;

pub use auth_api::auth_routes;
pub use catalog_api::catalog_routes;

/// Install the fmt subscriber; `RUST_LOG` wins, otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// Decode a JSON body leniently: an empty body reads as `{}`-equivalent default.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(bytes: &Bytes) -> AppResult<T> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::validation("invalid_body".to_string(), format!("malformed JSON body: {}", e)))
}

fn open_users(path: Option<&std::path::Path>) -> Arc<dyn UserStore> {
    match path {
        Some(p) => Arc::new(FileUserStore::open(p)),
        None => Arc::new(MemoryUserStore::new()),
    }
}

fn open_shard(name: &str, path: Option<&std::path::Path>) -> Arc<dyn StorageBackend> {
    match path {
        Some(p) => Arc::new(FileBackend::open(name, p)),
        None => Arc::new(MemoryBackend::new(name)),
    }
}

fn describe(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_else(|| "<memory>".to_string())
}

async fn serve(port: u16, app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding {}", addr))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_auth_app(config: &AuthServerConfig) -> anyhow::Result<Router> {
    let tokens = TokenService::with_ttl(&config.secret, config.token_ttl).context("While configuring token signing")?;
    let users = open_users(config.users_file.as_deref());
    Ok(auth_routes(AuthService::new(users, tokens)).layer(CorsLayer::permissive()))
}

pub async fn run_auth(config: AuthServerConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "auth server starting: port={}, users={}, token_ttl_secs={}",
        config.port, describe(config.users_file.as_deref()), config.token_ttl.as_secs()
    );
    let app = build_auth_app(&config)?;
    serve(config.port, app).await
}

pub fn build_catalog_app(config: &CatalogServerConfig) -> Router {
    let router = ShardRouter::new(
        open_shard("shard1", config.shard1_file.as_deref()),
        open_shard("shard2", config.shard2_file.as_deref()),
    );
    let auth = Arc::new(HttpAuthClient::new(config.auth_url.clone()));
    let users: Arc<dyn UserStore> = Arc::new(FileUserStore::open(&config.users_file));
    let service = CatalogService::new(router, users, auth.clone(), auth);
    catalog_routes(service).layer(CorsLayer::permissive())
}

pub async fn run_catalog(config: CatalogServerConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "catalog server starting: port={}, auth_url={}, shard1={}, shard2={}, users={}",
        config.port,
        config.auth_url,
        describe(config.shard1_file.as_deref()),
        describe(config.shard2_file.as_deref()),
        config.users_file.display()
    );
    serve(config.port, build_catalog_app(&config)).await
}
