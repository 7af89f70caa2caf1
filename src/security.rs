use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Argon2id PHC string with a fresh 16-byte salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

/// False for a wrong password and for an unparseable hash alike.
pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let h = hash_password("mipassword123").unwrap();
        assert!(h.starts_with("$argon2"));
        assert!(!h.contains("mipassword123"));
        assert!(verify_password(&h, "mipassword123"));
        assert!(!verify_password(&h, "wrong"));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
        assert!(!verify_password("", ""));
    }
}
