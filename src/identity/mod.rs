//! Identity: principals, signed tokens, the user-facing auth service, and the
//! verification capability the catalog consumes.

mod principal;
mod provider;
mod token;
mod verifier;

pub use principal::Principal;
pub use provider::{normalize_email, AuthService, LoginRequest, LoginResponse, RegisterRequest};
pub use token::{IssuedToken, TokenService, DEFAULT_TOKEN_TTL};
pub use verifier::{ForwardedResponse, HttpAuthClient, RegistrationForwarder, TokenVerifier};

use axum::http::{header, HeaderMap};

/// Token from `Authorization: Bearer <token>`; `None` when absent or empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_parsing() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), None);
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&h), Some("abc.def"));
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&h), None);
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("raw-token"));
        assert_eq!(bearer_token(&h), Some("raw-token"));
    }
}
