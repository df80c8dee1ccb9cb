/// Token signing and verification
///
/// Compact HS256-signed tokens carrying a typed payload and expiry. The
/// signing secret is process-wide, read-only configuration; rotating it
/// invalidates every outstanding token at once, which is the accepted
/// trade-off of a shared-secret scheme (no per-token revocation here —
/// that's what the refresh-token store is for).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde_json::Value;

use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::session::claims::{Claims, TokenType};

/// Tolerated clock skew between the signing and the verifying host.
const CLOCK_SKEW_LEEWAY_SECS: u64 = 1;

/// A freshly signed token together with its lifecycle timestamps.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssuedToken {
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs a token of the given type. The lifetime comes from configuration:
/// short for access tokens, longer for refresh tokens.
pub fn issue(
    token_type: TokenType,
    data: Option<Value>,
    config: &JwtSettings,
) -> Result<IssuedToken, AppError> {
    let lifetime = match token_type {
        TokenType::Access => config.access_token_expiry,
        TokenType::Refresh => config.refresh_token_expiry,
    };

    let issued_at = Utc::now();
    let expires_at = issued_at + Duration::seconds(lifetime);

    let claims = Claims {
        token_type,
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
        data,
    };

    let value = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|error| AppError::Internal(format!("Token signing failed: {}", error)))?;

    Ok(IssuedToken {
        token_type,
        value,
        issued_at,
        expires_at,
    })
}

/// Verifies a token's signature and expiry and returns its claims.
///
/// Expiry failures carry a human-readable elapsed duration; any other
/// verification failure (bad signature, unparsable structure) surfaces as
/// the generic token-library kind. The embedded `token_type` is returned
/// as-is — matching it against the expected type is the caller's job.
pub fn verify(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY_SECS;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(error) => match error.kind() {
            ErrorKind::ExpiredSignature => Err(expired(token, config)),
            _ => Err(AuthError::Jwt {
                message: error.to_string(),
            }
            .into()),
        },
    }
}

/// The signature already checked out; decode once more without the expiry
/// check to recover the claims for the error message.
fn expired(token: &str, config: &JwtSettings) -> AppError {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => {
            let claims = data.claims;
            let expired_at =
                DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

            AuthError::TokenExpired {
                token_type: claims.token_type,
                expired_for: humanize_duration(Utc::now() - expired_at),
            }
            .into()
        }
        Err(error) => AuthError::Jwt {
            message: error.to_string(),
        }
        .into(),
    }
}

fn humanize_duration(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);

    let (count, unit) = if seconds < 60 {
        (seconds, "second")
    } else if seconds < 3_600 {
        (seconds / 60, "minute")
    } else if seconds < 86_400 {
        (seconds / 3_600, "hour")
    } else {
        (seconds / 86_400, "day")
    };

    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 600,
            refresh_token_expiry: 3600,
        }
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let config = test_config();
        let data = json!({ "scope": "admin" });

        let issued =
            issue(TokenType::Access, Some(data.clone()), &config).expect("Failed to issue token");
        let claims = verify(&issued.value, &config).expect("Failed to verify token");

        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.data, Some(data));
        assert_eq!(claims.exp - claims.iat, config.access_token_expiry);
    }

    #[test]
    fn refresh_tokens_embed_their_type() {
        let config = test_config();

        let issued = issue(TokenType::Refresh, None, &config).expect("Failed to issue token");
        let claims = verify(&issued.value, &config).expect("Failed to verify token");

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.exp - claims.iat, config.refresh_token_expiry);
    }

    #[test]
    fn tampered_token_is_a_jwt_error() {
        let config = test_config();
        let issued = issue(TokenType::Access, None, &config).expect("Failed to issue token");

        let tampered = format!("{}X", issued.value);

        match verify(&tampered, &config) {
            Err(AppError::Auth(AuthError::Jwt { .. })) => (),
            other => panic!("Expected jwt error, got {:?}", other),
        }
    }

    #[test]
    fn token_signed_with_another_secret_is_a_jwt_error() {
        let config = test_config();
        let mut other = test_config();
        other.secret = "a-completely-different-32-char-secret!!".to_string();

        let issued = issue(TokenType::Access, None, &other).expect("Failed to issue token");

        match verify(&issued.value, &config) {
            Err(AppError::Auth(AuthError::Jwt { .. })) => (),
            other => panic!("Expected jwt error, got {:?}", other),
        }
    }

    #[test]
    fn expired_token_reports_elapsed_time() {
        let mut config = test_config();
        config.access_token_expiry = -120;

        let issued = issue(TokenType::Access, None, &config).expect("Failed to issue token");

        match verify(&issued.value, &config) {
            Err(AppError::Auth(AuthError::TokenExpired {
                token_type,
                expired_for,
            })) => {
                assert_eq!(token_type, TokenType::Access);
                assert_eq!(expired_for, "2 minutes");
            }
            other => panic!("Expected expired error, got {:?}", other),
        }
    }

    #[test]
    fn humanize_duration_picks_the_largest_fitting_unit() {
        assert_eq!(humanize_duration(Duration::seconds(1)), "1 second");
        assert_eq!(humanize_duration(Duration::seconds(45)), "45 seconds");
        assert_eq!(humanize_duration(Duration::seconds(60)), "1 minute");
        assert_eq!(humanize_duration(Duration::seconds(150)), "2 minutes");
        assert_eq!(humanize_duration(Duration::hours(5)), "5 hours");
        assert_eq!(humanize_duration(Duration::days(3)), "3 days");
    }

    #[test]
    fn humanize_duration_clamps_negative_values() {
        assert_eq!(humanize_duration(Duration::seconds(-5)), "0 seconds");
    }
}
