//! Capabilities the catalog needs from the auth service, and the HTTP client
//! that provides them in deployment.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::principal::Principal;
use super::token::TokenService;
use crate::error::{AppError, AppResult};

/// Checks a bearer token. `Unauthorized` for a rejected token, `Upstream` when
/// the verifier itself cannot be reached.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> AppResult<Principal>;
}

/// A response relayed unchanged from the auth service.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardedResponse {
    pub status: u16,
    pub body: Value,
}

/// Forwards a registration body verbatim to the auth service.
#[async_trait]
pub trait RegistrationForwarder: Send + Sync {
    async fn forward_register(&self, body: &Value) -> AppResult<ForwardedResponse>;
}

/// In-process verification with the shared secret.
#[async_trait]
impl TokenVerifier for TokenService {
    async fn verify_token(&self, token: &str) -> AppResult<Principal> {
        self.verify(token)
    }
}

/// Talks to the auth service's `/auth/verify` and `/auth/register` endpoints.
#[derive(Clone, Debug)]
pub struct HttpAuthClient {
    base_url: String,
    http: reqwest::Client,
}

fn unreachable(err: reqwest::Error) -> AppError {
    AppError::upstream("auth_unreachable".to_string(), format!("auth service unreachable: {}", err))
}

impl HttpAuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }
}

#[async_trait]
impl TokenVerifier for HttpAuthClient {
    async fn verify_token(&self, token: &str) -> AppResult<Principal> {
        let resp = self
            .http
            .post(self.url("/auth/verify"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(unreachable)?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if status != StatusCode::OK {
            let msg = body.get("message").and_then(Value::as_str).unwrap_or("invalid or expired token");
            return Err(AppError::unauthorized("token_rejected".to_string(), msg.to_string()));
        }
        match body.get("username").and_then(Value::as_str) {
            Some(u) => Ok(Principal::new(u)),
            None => Err(AppError::upstream("auth_bad_response", "verify response carried no username")),
        }
    }
}

#[async_trait]
impl RegistrationForwarder for HttpAuthClient {
    async fn forward_register(&self, body: &Value) -> AppResult<ForwardedResponse> {
        let resp = self.http.post(self.url("/auth/register")).json(body).send().await.map_err(unreachable)?;
        let status = resp.status().as_u16();
        let body = resp
            .json::<Value>()
            .await
            .map_err(|e| AppError::upstream("auth_bad_response".to_string(), format!("auth service sent a non-JSON reply: {}", e)))?;
        Ok(ForwardedResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_service_is_a_verifier() {
        let svc = TokenService::new("k").unwrap();
        let t = svc.issue(Principal::new("ana")).unwrap();
        let v: &dyn TokenVerifier = &svc;
        assert_eq!(v.verify_token(&t.token).await.unwrap().username, "ana");
        assert_eq!(v.verify_token("junk").await.unwrap_err().http_status(), 401);
    }

    #[tokio::test]
    async fn unreachable_service_is_upstream_error() {
        // Port 9 (discard) on loopback is essentially never listening.
        let c = HttpAuthClient::new("http://127.0.0.1:9/");
        assert_eq!(c.base_url(), "http://127.0.0.1:9");
        let err = c.verify_token("t").await.unwrap_err();
        assert_eq!(err.code_str(), "auth_unreachable");
        let err = c.forward_register(&serde_json::json!({"username": "a"})).await.unwrap_err();
        assert_eq!(err.http_status(), 500);
    }
}
