use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::principal::Principal;
use super::token::{IssuedToken, TokenService};
use crate::error::{AppError, AppResult};
use crate::security;
use crate::storage::{InsertOutcome, StoredUser, UserStore};

/// Registration body. Fields are optional so a missing one becomes a 400, not a parse failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

impl From<IssuedToken> for LoginResponse {
    fn from(t: IssuedToken) -> Self {
        Self { token: t.token, username: t.principal.username }
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation("missing_field".to_string(), format!("{} is required", field))),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, login and token verification over a [`UserStore`].
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    pub fn users(&self) -> &Arc<dyn UserStore> { &self.users }

    pub fn tokens(&self) -> &TokenService { &self.tokens }

    pub fn register(&self, req: &RegisterRequest) -> AppResult<()> {
        let username = required(&req.username, "username")?;
        let email = required(&req.email, "email")?;
        let password = required(&req.password, "password")?;
        let email = normalize_email(email);

        // Cheap pre-check so a duplicate doesn't pay for hashing; the store re-checks atomically.
        if self.users.find(username)?.is_some() {
            return Err(AppError::conflict("username_taken", "username already exists"));
        }
        let user = StoredUser {
            username: username.to_string(),
            email,
            password_hash: security::hash_password(password)?,
            created_at: Utc::now(),
        };
        match self.users.insert_if_absent(user)? {
            InsertOutcome::Inserted => {
                info!(target: "audit", username, "user registered");
                Ok(())
            }
            InsertOutcome::UsernameTaken => Err(AppError::conflict("username_taken", "username already exists")),
            InsertOutcome::EmailTaken => Err(AppError::conflict("email_taken", "email already registered")),
        }
    }

    pub fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        let username = required(&req.username, "username")?;
        let password = required(&req.password, "password")?;
        let Some(user) = self.users.find(username)? else {
            warn!(target: "audit", username, "login for unknown user");
            return Err(AppError::not_found("user_not_found", "user not found"));
        };
        if !security::verify_password(&user.password_hash, password) {
            warn!(target: "audit", username, "login with wrong password");
            return Err(AppError::unauthorized("bad_password", "incorrect password"));
        }
        Ok(self.tokens.issue(Principal::new(user.username))?.into())
    }

    pub fn verify(&self, token: &str) -> AppResult<Principal> {
        self.tokens.verify(token)
    }
}
