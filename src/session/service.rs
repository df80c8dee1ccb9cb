/// Session service
///
/// Orchestrates the login / logout / renew / identity-resolution flows over
/// the token codec, the refresh-token store and the credential verifier.
/// Owns the single-active-session invariant: logging in replaces the user's
/// stored refresh record, so at most one refresh token per user ever
/// verifies against the store.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::configuration::JwtSettings;
use crate::error::{log_error, AppError, AuthError};
use crate::session::claims::{self, RefreshTokenData, TokenType};
use crate::session::credentials::{self, AuthScheme};
use crate::session::store;
use crate::session::token::{self, IssuedToken};
use crate::users::{self, UserRecord};

/// Result of a successful login.
#[derive(Debug, serde::Serialize)]
pub struct IssuedTokenPair {
    pub access_token: IssuedToken,
    pub refresh_token: IssuedToken,
}

/// Result of a successful renewal — access token only, the refresh token
/// stays as issued at login.
#[derive(Debug, serde::Serialize)]
pub struct RenewedAccess {
    pub access_token: IssuedToken,
}

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    jwt: JwtSettings,
}

impl SessionService {
    pub fn new(pool: PgPool, jwt: JwtSettings) -> Self {
        Self { pool, jwt }
    }

    /// Verifies Basic credentials, rotates the user's refresh session and
    /// issues a fresh token pair. Any session the user had before this call
    /// is invalid once it returns.
    ///
    /// `data` is embedded verbatim as the access token's payload.
    pub async fn login(
        &self,
        auth: Option<&str>,
        data: Option<Value>,
    ) -> Result<IssuedTokenPair, AppError> {
        let user = credentials::verify_basic(&self.pool, auth).await?;

        tracing::debug!(user_id = %user.id, "Credentials verified, rotating refresh session");

        // A signing failure past this point leaves the user logged out
        // except via a token the client never received — accepted, since
        // nothing half-issued is ever visible.
        let refresh_token = self.issue_refresh_token(user.id).await?;
        let access_token = token::issue(TokenType::Access, data, &self.jwt)?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verifies Basic credentials and drops the user's refresh session.
    /// Logging out without an active session succeeds silently.
    pub async fn logout(&self, auth: Option<&str>) -> Result<(), AppError> {
        let user = credentials::verify_basic(&self.pool, auth).await?;

        store::invalidate(&self.pool, user.id).await?;

        tracing::info!(user_id = %user.id, "User logged out");

        Ok(())
    }

    /// Exchanges a valid refresh credential for a fresh access token. The
    /// refresh token and its stored record are left untouched — only login
    /// and logout mutate the store.
    pub async fn renew(
        &self,
        auth: Option<&str>,
        data: Option<Value>,
    ) -> Result<RenewedAccess, AppError> {
        let refresh = self.refresh_token_data(auth).await?;

        tracing::debug!(user_id = %refresh.user_id, "Refresh token accepted, issuing access token");

        Ok(RenewedAccess {
            access_token: token::issue(TokenType::Access, data, &self.jwt)?,
        })
    }

    /// Recovers the user behind a still-valid refresh credential without
    /// issuing anything.
    ///
    /// Failures that merely mean "not logged in" (missing header, unknown
    /// or rotated-out refresh token, vanished user) are logged and resolve
    /// to `None`. Every other failure — a malformed or forged token
    /// included — propagates untouched; that asymmetry is what lets an
    /// "am I logged in" probe degrade gracefully while tampering still
    /// surfaces as an error.
    pub async fn resolve_identity(
        &self,
        auth: Option<&str>,
    ) -> Result<Option<UserRecord>, AppError> {
        match self.identity_from_refresh_auth(auth).await {
            Ok(user) => Ok(Some(user)),
            Err(error) if error.tolerated_during_identity_resolution() => {
                log_error(&error);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Validates a Bearer access token and returns its embedded payload.
    /// This is the inbound gate for protected routes.
    pub fn verify_access(&self, auth: Option<&str>) -> Result<Option<Value>, AppError> {
        self.parse_token(TokenType::Access, auth)
    }

    fn parse_token(
        &self,
        expected: TokenType,
        auth: Option<&str>,
    ) -> Result<Option<Value>, AppError> {
        let raw = credentials::parse_auth_value(AuthScheme::Bearer, auth)?;
        let claims = token::verify(raw, &self.jwt)?;

        if claims.token_type != expected {
            return Err(AuthError::TokenTypeUnexpected {
                expected,
                actual: claims.token_type,
            }
            .into());
        }

        Ok(claims.data)
    }

    async fn issue_refresh_token(&self, user_id: Uuid) -> Result<IssuedToken, AppError> {
        let record = store::replace(&self.pool, user_id).await?;

        let data = RefreshTokenData {
            user_id,
            token_id: record.id,
        };
        let data = serde_json::to_value(data).map_err(|error| {
            AppError::Internal(format!("Refresh payload serialization failed: {}", error))
        })?;

        token::issue(TokenType::Refresh, Some(data), &self.jwt)
    }

    /// Full refresh-credential check: scheme, signature, payload shape, and
    /// the store lookup that enforces one active session per user. A token
    /// from a session that was since replaced or logged out fails here.
    async fn refresh_token_data(&self, auth: Option<&str>) -> Result<RefreshTokenData, AppError> {
        let payload = self.parse_token(TokenType::Refresh, auth)?;
        let data = claims::refresh_data_from_payload(payload)?;

        match store::find_by_user(&self.pool, data.user_id).await? {
            None => Err(AuthError::RefreshTokenUnknown {
                hint: format!(
                    "user \"{}\" does not have an active refresh token",
                    data.user_id
                ),
            }
            .into()),
            Some(record) if record.id != data.token_id => Err(AuthError::RefreshTokenUnknown {
                hint: format!(
                    "refresh token \"{}\" is not associated with user \"{}\"",
                    data.token_id, data.user_id
                ),
            }
            .into()),
            Some(_) => Ok(data),
        }
    }

    async fn identity_from_refresh_auth(&self, auth: Option<&str>) -> Result<UserRecord, AppError> {
        let data = self.refresh_token_data(auth).await?;

        users::get(&self.pool, data.user_id).await
    }
}
