//! Signed bearer tokens (HS256 JWT) carrying the username and an expiry.
//! The service is stateless: anything holding the same secret can verify.

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::principal::Principal;
use crate::error::{AppError, AppResult};

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    username: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub principal: Principal,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self> {
        Self::with_ttl(secret, DEFAULT_TOKEN_TTL)
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("token signing secret must not be empty"));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    pub fn issue(&self, principal: Principal) -> AppResult<IssuedToken> {
        self.issue_at(principal, Utc::now())
    }

    /// Issue as if the current time were `issued_at`.
    pub fn issue_at(&self, principal: Principal, issued_at: DateTime<Utc>) -> AppResult<IssuedToken> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AppError::internal("token_ttl".to_string(), e.to_string()))?;
        let expires_at = issued_at + ttl;
        let claims = Claims { username: principal.username.clone(), iat: issued_at.timestamp(), exp: expires_at.timestamp() };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal("token_sign_failed".to_string(), e.to_string()))?;
        Ok(IssuedToken { token, principal, expires_at })
    }

    pub fn verify(&self, token: &str) -> AppResult<Principal> {
        if token.is_empty() {
            return Err(AppError::unauthorized("token_missing", "token not provided"));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(Principal::new(data.claims.username)),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AppError::unauthorized("token_expired", "token expired")),
                _ => Err(AppError::unauthorized("token_invalid", "token invalid")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify() {
        let svc = TokenService::new("s3cret").unwrap();
        let t = svc.issue(Principal::new("johndoe")).unwrap();
        assert_eq!(svc.verify(&t.token).unwrap(), Principal::new("johndoe"));
        let remaining = t.expires_at - Utc::now();
        assert!(remaining <= chrono::Duration::hours(1));
        assert!(remaining > chrono::Duration::minutes(59));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new("s3cret").unwrap();
        let t = svc.issue_at(Principal::new("johndoe"), Utc::now() - chrono::Duration::hours(2)).unwrap();
        let err = svc.verify(&t.token).unwrap_err();
        assert_eq!(err.code_str(), "token_expired");
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn foreign_secret_and_garbage_are_rejected() {
        let ours = TokenService::new("ours").unwrap();
        let theirs = TokenService::new("theirs").unwrap();
        let t = theirs.issue(Principal::new("mallory")).unwrap();
        assert_eq!(ours.verify(&t.token).unwrap_err().code_str(), "token_invalid");
        assert_eq!(ours.verify("not.a.jwt").unwrap_err().code_str(), "token_invalid");
        assert_eq!(ours.verify("").unwrap_err().code_str(), "token_missing");
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(TokenService::new("").is_err());
    }
}
