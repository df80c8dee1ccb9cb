/// User lookup
///
/// The narrow contract the session flows consult: find a user by login or
/// id, and verify a presented password against the stored hash. User
/// administration lives elsewhere.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::password;

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub async fn verify_password(&self, password: &str) -> Result<bool, AppError> {
        password::verify_password(password, &self.password_hash).await
    }
}

pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<UserRecord>, AppError> {
    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT id, login, password_hash, created_at, updated_at FROM users WHERE login = $1",
    )
    .bind(login)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>, AppError> {
    let user = sqlx::query_as::<_, UserRecord>(
        "SELECT id, login, password_hash, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Lookup that treats absence as an error.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<UserRecord, AppError> {
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::UserNotFound { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_never_serializes() {
        let user = UserRecord {
            id: Uuid::new_v4(),
            login: "alice".to_string(),
            password_hash: "$2a$10$secret".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).expect("Failed to serialize user");

        assert!(json.contains("alice"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$2a$10$secret"));
    }
}
