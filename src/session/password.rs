/// Password hashing and verification
///
/// bcrypt comparisons are CPU-bound, so both directions run on the blocking
/// thread pool instead of stalling a request worker.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// A well-formed bcrypt hash no account carries. The credential verifier
/// compares against it when a login does not exist, keeping that path as
/// slow as a genuine password mismatch.
pub const DUMMY_PASSWORD_HASH: &str =
    "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();

    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|error| AppError::Internal(format!("Password hashing task failed: {}", error)))?
        .map_err(|error| AppError::Internal(format!("Password hashing failed: {}", error)))
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();

    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|error| {
            AppError::Internal(format!("Password verification task failed: {}", error))
        })?
        .map_err(|error| AppError::Internal(format!("Password verification failed: {}", error)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_roundtrip() {
        let password_hash = hash_password("correct horse battery staple")
            .await
            .expect("Failed to hash password");

        assert_ne!(password_hash, "correct horse battery staple");
        assert!(password_hash.starts_with("$2"));

        let matches = verify_password("correct horse battery staple", &password_hash)
            .await
            .expect("Failed to verify password");
        assert!(matches);
    }

    #[tokio::test]
    async fn wrong_password_does_not_verify() {
        let password_hash = hash_password("correct horse battery staple")
            .await
            .expect("Failed to hash password");

        let matches = verify_password("incorrect horse", &password_hash)
            .await
            .expect("Failed to verify password");
        assert!(!matches);
    }

    #[tokio::test]
    async fn dummy_hash_is_well_formed() {
        // Must compare cleanly (and negatively) so the miss path never errors.
        let matches = verify_password("definitely-not-the-preimage", DUMMY_PASSWORD_HASH)
            .await
            .expect("Dummy hash failed to parse");
        assert!(!matches);
    }
}
