//! Catalog service: every operation authenticates through the injected
//! [`TokenVerifier`] and then hands shard decisions to the [`ShardRouter`].
//! Store calls run on the blocking pool since file-backed stores do disk I/O.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{ForwardedResponse, Principal, RegistrationForwarder, TokenVerifier};
use crate::shard::{Route, Shard, ShardRouter, UpdateOutcome};
use crate::storage::{blocking, Product, UserStore, UserSummary};

pub mod input;

pub use input::{parse_new_product, parse_patch};

#[derive(Clone)]
pub struct CatalogService {
    router: ShardRouter,
    users: Arc<dyn UserStore>,
    verifier: Arc<dyn TokenVerifier>,
    registrar: Arc<dyn RegistrationForwarder>,
}

impl CatalogService {
    pub fn new(
        router: ShardRouter,
        users: Arc<dyn UserStore>,
        verifier: Arc<dyn TokenVerifier>,
        registrar: Arc<dyn RegistrationForwarder>,
    ) -> Self {
        Self { router, users, verifier, registrar }
    }

    pub fn router(&self) -> &ShardRouter { &self.router }

    /// Resolve the caller. A verifier that cannot be reached denies access.
    pub async fn authorize(&self, token: Option<&str>) -> AppResult<Principal> {
        let Some(token) = token else {
            return Err(AppError::unauthorized("token_missing", "authentication token required"));
        };
        match self.verifier.verify_token(token).await {
            Ok(p) => Ok(p),
            Err(e @ AppError::Unauthorized { .. }) => {
                warn!(target: "audit", reason = %e, "token rejected");
                Err(e)
            }
            Err(e) => {
                error!(target: "audit", error = %e, "token verification failed");
                Err(AppError::unauthorized("token_unverifiable".to_string(), format!("could not verify token: {}", e.message())))
            }
        }
    }

    pub async fn list_products(&self, token: Option<&str>) -> AppResult<Vec<(Product, Shard)>> {
        self.authorize(token).await?;
        let router = self.router.clone();
        blocking(move || router.list_all()).await
    }

    pub async fn get_product(&self, token: Option<&str>, id: &str) -> AppResult<(Product, Shard)> {
        self.authorize(token).await?;
        let (router, id) = (self.router.clone(), id.to_string());
        blocking(move || router.locate(&id)).await
    }

    pub async fn create_product(&self, token: Option<&str>, body: &Value) -> AppResult<(Product, Route)> {
        self.authorize(token).await?;
        let product = parse_new_product(body)?;
        let router = self.router.clone();
        blocking(move || router.create(product)).await
    }

    pub async fn update_product(&self, token: Option<&str>, id: &str, body: &Value) -> AppResult<UpdateOutcome> {
        self.authorize(token).await?;
        let patch = parse_patch(body)?;
        let (router, id) = (self.router.clone(), id.to_string());
        blocking(move || router.update(&id, &patch)).await
    }

    pub async fn delete_product(&self, token: Option<&str>, id: &str) -> AppResult<Shard> {
        self.authorize(token).await?;
        let (router, id) = (self.router.clone(), id.to_string());
        blocking(move || router.delete(&id)).await
    }

    /// Unauthenticated; backs the health endpoint.
    pub async fn shard_counts(&self) -> AppResult<Vec<(Shard, usize)>> {
        let router = self.router.clone();
        blocking(move || router.shard_counts()).await
    }

    pub async fn list_users(&self, token: Option<&str>) -> AppResult<Vec<UserSummary>> {
        self.authorize(token).await?;
        let users = self.users.clone();
        blocking(move || Ok(users.list()?)).await
    }

    pub async fn delete_user(&self, token: Option<&str>, username: &str) -> AppResult<()> {
        self.authorize(token).await?;
        let (users, name) = (self.users.clone(), username.to_string());
        if blocking(move || Ok(users.delete(&name)?)).await? {
            Ok(())
        } else {
            Err(AppError::not_found("user_not_found", "user not found"))
        }
    }

    /// Relay a registration to the auth service; its status and body come back untouched.
    pub async fn register_user(&self, token: Option<&str>, body: &Value) -> AppResult<ForwardedResponse> {
        self.authorize(token).await?;
        let has = |k: &str| body.as_object().is_some_and(|o| o.contains_key(k));
        if !has("username") || !has("password") {
            return Err(AppError::validation("missing_field", "username and password are required"));
        }
        self.registrar.forward_register(body).await
    }
}
