use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Argon2id PHC string for a new credential.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
            false
        }
    }
}

/// Hash of a throwaway credential, checked when no account matches so a
/// missing email costs the same argon2 work as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("no-such-account").unwrap_or_default())
        .as_str()
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(plain: &str) -> Result<String> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| Error::Internal(format!("password hashing task failed: {}", e)))?
}

/// Verifies on the blocking pool. `None` (unknown account) still runs a
/// full verification and always answers `false`.
pub async fn verify_password_blocking(plain: &str, hashed: Option<&str>) -> Result<bool> {
    let plain = plain.to_string();
    let hashed = hashed.map(str::to_string);
    tokio::task::spawn_blocking(move || match hashed {
        Some(hashed) => verify_password(&plain, &hashed),
        None => {
            let _ = verify_password(&plain, dummy_hash());
            false
        }
    })
    .await
    .map_err(|e| Error::Internal(format!("password verification task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_and_never_echo_the_credential() {
        let hash = hash_password("travertino-42").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("travertino-42"));
        assert!(verify_password("travertino-42", &hash));
        assert!(!verify_password("travertino-43", &hash));
    }

    #[test]
    fn plaintext_in_the_hash_column_never_matches() {
        assert!(!verify_password("secret", "secret"));
    }

    #[tokio::test]
    async fn blocking_variants_match_the_sync_ones() {
        let hash = hash_password_blocking("onice-miele").await.unwrap();
        assert!(verify_password_blocking("onice-miele", Some(&hash)).await.unwrap());
        assert!(!verify_password_blocking("onice-mielE", Some(&hash)).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_account_pays_for_a_verification_and_fails() {
        assert!(dummy_hash().starts_with("$argon2"));
        assert!(!verify_password_blocking("no-such-account", None).await.unwrap());
    }
}
