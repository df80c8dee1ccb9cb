/// Credential verification
///
/// Parses Authorization header values and validates Basic credential pairs
/// against the user collaborator.

use base64ct::{Base64, Encoding};
use sqlx::PgPool;
use std::fmt;

use crate::error::{AppError, AuthError};
use crate::session::password;
use crate::users::{self, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Bearer,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "Basic",
            AuthScheme::Bearer => "Bearer",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts the value part of an Authorization header, enforcing the
/// expected scheme word.
pub fn parse_auth_value(expected: AuthScheme, auth: Option<&str>) -> Result<&str, AppError> {
    let auth = auth.unwrap_or_default();

    if auth.is_empty() {
        return Err(AuthError::HeaderMissing.into());
    }

    let (scheme, value) = match auth.split_once(' ') {
        Some((scheme, value)) => (scheme, value),
        None => (auth, ""),
    };

    if scheme != expected.as_str() {
        return Err(AuthError::TypeUnexpected {
            expected,
            actual: scheme.to_string(),
        }
        .into());
    }

    if value.is_empty() {
        return Err(AuthError::HeaderMissing.into());
    }

    Ok(value)
}

/// Everything after the first colon belongs to the password.
fn split_credentials(decoded: &str) -> (String, String) {
    match decoded.split_once(':') {
        Some((login, password)) => (login.to_string(), password.to_string()),
        None => (decoded.to_string(), String::new()),
    }
}

/// Verifies a `Basic <base64(login:password)>` header value.
///
/// Unknown login and wrong password collapse into the same error kind and
/// message template, and the unknown-login path still runs a bcrypt
/// comparison against a dummy hash — neither the response shape nor its
/// timing reveals which side failed.
pub async fn verify_basic(pool: &PgPool, auth: Option<&str>) -> Result<UserRecord, AppError> {
    let encoded = parse_auth_value(AuthScheme::Basic, auth)?;

    // Undecodable credentials fall through to the unknown-login path.
    let decoded = Base64::decode_vec(encoded).unwrap_or_default();
    let decoded = String::from_utf8_lossy(&decoded).into_owned();
    let (login, supplied_password) = split_credentials(&decoded);

    match users::find_by_login(pool, &login).await? {
        Some(user) => {
            if user.verify_password(&supplied_password).await? {
                Ok(user)
            } else {
                Err(AuthError::CredsInvalid { login }.into())
            }
        }
        None => {
            let _ = password::verify_password(&supplied_password, password::DUMMY_PASSWORD_HASH)
                .await;

            Err(AuthError::CredsInvalid { login }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_empty_header_is_rejected() {
        for auth in [None, Some("")] {
            match parse_auth_value(AuthScheme::Basic, auth) {
                Err(AppError::Auth(AuthError::HeaderMissing)) => (),
                other => panic!("Expected header-missing error, got {:?}", other),
            }
        }
    }

    #[test]
    fn wrong_scheme_word_is_rejected() {
        match parse_auth_value(AuthScheme::Basic, Some("Bearer abc.def.ghi")) {
            Err(AppError::Auth(AuthError::TypeUnexpected { expected, actual })) => {
                assert_eq!(expected, AuthScheme::Basic);
                assert_eq!(actual, "Bearer");
            }
            other => panic!("Expected type-unexpected error, got {:?}", other),
        }
    }

    #[test]
    fn scheme_without_a_value_is_rejected() {
        for auth in ["Basic", "Basic "] {
            match parse_auth_value(AuthScheme::Basic, Some(auth)) {
                Err(AppError::Auth(AuthError::HeaderMissing)) => (),
                other => panic!("Expected header-missing error for {:?}, got {:?}", auth, other),
            }
        }
    }

    #[test]
    fn well_formed_header_yields_the_value() {
        let value = parse_auth_value(AuthScheme::Bearer, Some("Bearer abc.def.ghi"))
            .expect("Failed to parse header");
        assert_eq!(value, "abc.def.ghi");
    }

    #[test]
    fn credentials_split_on_the_first_colon_only() {
        assert_eq!(
            split_credentials("alice:pa:ss:word"),
            ("alice".to_string(), "pa:ss:word".to_string())
        );
        assert_eq!(
            split_credentials("alice"),
            ("alice".to_string(), String::new())
        );
    }
}
