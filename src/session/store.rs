/// Refresh-token store
///
/// Persistent record of at most one active refresh session per user. The
/// session service never caches these rows — every check is a fresh read,
/// and all serialization of concurrent logins for one user is delegated to
/// the transactional delete-then-insert here (backed by a UNIQUE(user_id)
/// constraint in the schema).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Atomically replaces the user's refresh session: any existing record is
/// deleted and a fresh one inserted inside one transaction. Of two
/// concurrent calls for the same user, one serializes behind the other (or
/// fails cleanly on the unique constraint and may be retried) — they can
/// never both leave a live record.
pub async fn replace(pool: &PgPool, user_id: Uuid) -> Result<RefreshTokenRecord, AppError> {
    let mut transaction = pool.begin().await?;

    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut transaction)
        .await?;

    let record = sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        INSERT INTO refresh_tokens (id, user_id, created_at, updated_at)
        VALUES ($1, $2, $3, $3)
        RETURNING id, user_id, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(&mut transaction)
    .await?;

    transaction.commit().await?;

    tracing::debug!(user_id = %user_id, token_id = %record.id, "Refresh session replaced");

    Ok(record)
}

pub async fn find_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<RefreshTokenRecord>, AppError> {
    let record = sqlx::query_as::<_, RefreshTokenRecord>(
        "SELECT id, user_id, created_at, updated_at FROM refresh_tokens WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Deletes every refresh record for the user and returns the count. Zero is
/// normal (no active session). More than one is a data-integrity anomaly —
/// logged, but the deletion itself already is the repair.
pub async fn invalidate(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
    let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted > 0 {
        tracing::info!(user_id = %user_id, "Invalidated refresh session");
    }

    if deleted > 1 {
        tracing::warn!(
            user_id = %user_id,
            count = deleted,
            "User unexpectedly had more than one refresh token"
        );
    }

    Ok(deleted)
}
