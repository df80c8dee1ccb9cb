/// Error taxonomy and HTTP response mapping
///
/// Client-facing failures form a closed set of kinds, each with a fixed
/// status code; everything outside the set is "unclassified" and maps to a
/// generic 500 so internals never leak into response bodies. Every error
/// response ends with a `request_id` detail for correlation with the logs.

use actix_web::{error::ResponseError, http::StatusCode, HttpMessage, HttpRequest, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::middleware::RequestId;
use crate::session::claims::TokenType;
use crate::session::credentials::AuthScheme;

/// Identity, credential and token failures.
///
/// These are expected outcomes of the session flows doing their job and are
/// safe to show to clients verbatim.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Authorization header absent or empty.
    HeaderMissing,
    /// Authorization scheme word is not the expected one.
    TypeUnexpected {
        expected: AuthScheme,
        actual: String,
    },
    /// Unknown login or wrong password. The two causes intentionally share
    /// one kind and one message template so responses cannot be used to
    /// enumerate logins.
    CredsInvalid { login: String },
    /// The token's embedded type differs from what the operation expects.
    TokenTypeUnexpected {
        expected: TokenType,
        actual: TokenType,
    },
    /// The token verified but its payload is missing required data.
    TokenPayloadUnknown { hint: String },
    /// The token is past its expiry (beyond the clock-skew tolerance).
    TokenExpired {
        token_type: TokenType,
        expired_for: String,
    },
    /// The store has no record for the presented refresh token, or the
    /// stored record belongs to a newer session.
    RefreshTokenUnknown { hint: String },
    /// Any other token-library-level verification failure.
    Jwt { message: String },
}

impl AuthError {
    pub fn name(&self) -> &'static str {
        match self {
            AuthError::HeaderMissing => "AuthHeaderMissingError",
            AuthError::TypeUnexpected { .. } => "AuthTypeUnexpectedError",
            AuthError::CredsInvalid { .. } => "AuthCredsInvalidError",
            AuthError::TokenTypeUnexpected { .. } => "AuthTokenTypeUnexpectedError",
            AuthError::TokenPayloadUnknown { .. } => "AuthTokenPayloadUnknownError",
            AuthError::TokenExpired { .. } => "AuthTokenExpiredError",
            AuthError::RefreshTokenUnknown { .. } => "AuthRefreshTokenUnknownError",
            AuthError::Jwt { .. } => "AuthJwtError",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::HeaderMissing
            | AuthError::TypeUnexpected { .. }
            | AuthError::CredsInvalid { .. }
            | AuthError::Jwt { .. } => StatusCode::UNAUTHORIZED,
            AuthError::TokenTypeUnexpected { .. }
            | AuthError::TokenPayloadUnknown { .. }
            | AuthError::TokenExpired { .. }
            | AuthError::RefreshTokenUnknown { .. } => StatusCode::FORBIDDEN,
        }
    }

    fn hint(&self) -> Option<&str> {
        match self {
            AuthError::TokenPayloadUnknown { hint } => Some(hint),
            AuthError::RefreshTokenUnknown { hint } => Some(hint),
            _ => None,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::HeaderMissing => write!(
                f,
                "The \"Authorization\" header is missing in the request, or its value is empty"
            ),
            AuthError::TypeUnexpected { expected, actual } => write!(
                f,
                "Unexpected type of authorization: expected \"{}\", got \"{}\" instead",
                expected, actual
            ),
            AuthError::CredsInvalid { login } => write!(
                f,
                "Invalid credentials: the user \"{}\" does not exist, or the password is incorrect",
                login
            ),
            AuthError::TokenTypeUnexpected { expected, actual } => write!(
                f,
                "Unexpected token type: expected {} token, got {} token instead",
                expected, actual
            ),
            AuthError::TokenPayloadUnknown { .. } => {
                write!(f, "Refusing to verify token with unexpected payload")
            }
            AuthError::TokenExpired {
                token_type,
                expired_for,
            } => write!(
                f,
                "The supplied {} token has expired {} ago",
                token_type, expired_for
            ),
            AuthError::RefreshTokenUnknown { .. } => {
                write!(f, "Refusing to validate unknown refresh token")
            }
            AuthError::Jwt { message } => write!(f, "Authorization error: {}", message),
        }
    }
}

impl StdError for AuthError {}

/// Central error type all fallible operations in this crate return.
#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    /// Request body/query/param shape invalid (raised by the HTTP layer).
    Validation(String),
    /// The user-lookup collaborator found no matching user.
    UserNotFound { id: String },
    Database(sqlx::Error),
    Internal(String),
}

impl AppError {
    /// The classified-kind name, or `None` for unclassified failures.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            AppError::Auth(error) => Some(error.name()),
            AppError::Validation(_) => Some("ValidationError"),
            AppError::UserNotFound { .. } => Some("UserNotFoundError"),
            AppError::Database(_) | AppError::Internal(_) => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(error) => error.status_code(),
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn hint(&self) -> Option<&str> {
        match self {
            AppError::Auth(error) => error.hint(),
            _ => None,
        }
    }

    /// Whether `resolve_identity` treats this failure as a plain
    /// "not logged in" outcome instead of propagating it.
    pub fn tolerated_during_identity_resolution(&self) -> bool {
        self.name()
            .map_or(false, |name| IDENTITY_RESOLUTION_TOLERATED.contains(&name))
    }
}

/// Kinds that merely mean the caller holds no valid session. A malformed or
/// forged token is deliberately NOT in this set and keeps propagating.
const IDENTITY_RESOLUTION_TOLERATED: [&str; 3] = [
    "AuthHeaderMissingError",
    "AuthRefreshTokenUnknownError",
    "UserNotFoundError",
];

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Auth(error) => write!(f, "{}", error),
            AppError::Validation(message) => write!(f, "{}", message),
            AppError::UserNotFound { id } => write!(f, "User \"{}\" was not found", id),
            AppError::Database(error) => write!(f, "Database error: {}", error),
            AppError::Internal(message) => write!(f, "Internal error: {}", message),
        }
    }
}

impl StdError for AppError {}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        AppError::Auth(error)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        AppError::Database(error)
    }
}

// ============================================================================
// RESPONSE MAPPING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    Message,
    RequestId,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Detail {
    pub kind: DetailKind,
    pub value: String,
}

impl Detail {
    fn message(value: impl Into<String>) -> Self {
        Self {
            kind: DetailKind::Message,
            value: value.into(),
        }
    }
}

/// Structured error body sent to clients.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub status_code: u16,
    pub details: Vec<Detail>,
}

/// The slice of the inbound request the mapper needs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: String,
    pub method: String,
    pub path: String,
}

impl RequestContext {
    pub fn from_request(req: &HttpRequest) -> Self {
        let id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            id,
            method: req.method().to_string(),
            path: req.path().to_string(),
        }
    }
}

/// Renders an error into the response body shape. Classified kinds expose
/// their message (and hint, when carried); unclassified failures collapse to
/// a generic line. The `request_id` detail always comes last.
pub fn create_error_response(error: &AppError, req: &RequestContext) -> ErrorResponse {
    let mut details = match error {
        AppError::Validation(message) => vec![Detail::message(format!("(in body) {}", message))],
        AppError::Database(_) | AppError::Internal(_) => {
            vec![Detail::message("Unknown error occurred")]
        }
        classified => {
            let mut details = vec![Detail::message(classified.to_string())];

            if let Some(hint) = classified.hint() {
                details.push(Detail::message(hint));
            }

            details
        }
    };

    details.push(Detail {
        kind: DetailKind::RequestId,
        value: req.id.clone(),
    });

    ErrorResponse {
        message: format!("Request \"{} {}\" failed", req.method, req.path),
        status_code: error.status_code().as_u16(),
        details,
    }
}

/// Single log line for a classified error, `None` for unclassified ones
/// (those are logged as-is, with their full debug representation).
fn create_log_message(error: &AppError) -> Option<String> {
    let name = error.name()?;

    if let AppError::Validation(message) = error {
        return Some(format!("(in body) {}", message));
    }

    let mut chunks = vec![
        format!("{} (status {})", name, error.status_code().as_u16()),
        error.to_string(),
    ];

    if let Some(hint) = error.hint() {
        chunks.push(hint.to_string());
    }

    Some(chunks.join(": "))
}

pub fn log_error(error: &AppError) {
    match create_log_message(error) {
        Some(message) => tracing::error!("{}", message),
        None => tracing::error!(error = ?error, "Unclassified error"),
    }
}

/// An already-mapped error, ready to be rendered by actix.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    body: ErrorResponse,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body.message)
    }
}

impl ResponseError for HttpError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(&self.body)
    }
}

impl AppError {
    /// Logs the failure and maps it into a response for the given request.
    pub fn into_http(self, req: &HttpRequest) -> HttpError {
        let context = RequestContext::from_request(req);

        log_error(&self);

        HttpError {
            status: self.status_code(),
            body: create_error_response(&self, &context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        RequestContext {
            id: "req-123".to_string(),
            method: "POST".to_string(),
            path: "/auth/renew".to_string(),
        }
    }

    #[test]
    fn creds_invalid_shares_one_message_template() {
        let absent = AuthError::CredsInvalid {
            login: "mallory".to_string(),
        };
        let wrong_password = AuthError::CredsInvalid {
            login: "mallory".to_string(),
        };

        assert_eq!(absent.to_string(), wrong_password.to_string());
        assert_eq!(
            absent.to_string(),
            "Invalid credentials: the user \"mallory\" does not exist, or the password is incorrect"
        );
    }

    #[test]
    fn hinted_error_maps_to_message_hint_then_request_id() {
        let error = AppError::Auth(AuthError::RefreshTokenUnknown {
            hint: "user \"42\" does not have an active refresh token".to_string(),
        });

        let response = create_error_response(&error, &context());

        assert_eq!(response.status_code, 403);
        assert_eq!(response.message, "Request \"POST /auth/renew\" failed");
        assert_eq!(response.details.len(), 3);
        assert_eq!(response.details[0].kind, DetailKind::Message);
        assert_eq!(
            response.details[0].value,
            "Refusing to validate unknown refresh token"
        );
        assert_eq!(
            response.details[1].value,
            "user \"42\" does not have an active refresh token"
        );
        assert_eq!(response.details[2].kind, DetailKind::RequestId);
        assert_eq!(response.details[2].value, "req-123");
    }

    #[test]
    fn unclassified_error_does_not_leak_its_message() {
        let error = AppError::Internal("connection pool exhausted at 10.0.0.3".to_string());

        let response = create_error_response(&error, &context());

        assert_eq!(response.status_code, 500);
        assert_eq!(response.details[0].value, "Unknown error occurred");
        assert_eq!(response.details.last().map(|d| d.kind), Some(DetailKind::RequestId));
    }

    #[test]
    fn validation_error_maps_to_400_with_body_scope() {
        let error = AppError::Validation("missing field `refresh_token`".to_string());

        let response = create_error_response(&error, &context());

        assert_eq!(response.status_code, 400);
        assert_eq!(
            response.details[0].value,
            "(in body) missing field `refresh_token`"
        );
    }

    #[test]
    fn log_message_follows_kind_status_message_hint_format() {
        let error = AppError::Auth(AuthError::RefreshTokenUnknown {
            hint: "stale session".to_string(),
        });

        assert_eq!(
            create_log_message(&error).as_deref(),
            Some(
                "AuthRefreshTokenUnknownError (status 403): \
                 Refusing to validate unknown refresh token: stale session"
            )
        );
    }

    #[test]
    fn unclassified_errors_have_no_log_string() {
        assert!(create_log_message(&AppError::Internal("boom".to_string())).is_none());
    }

    #[test]
    fn identity_resolution_tolerates_exactly_the_documented_kinds() {
        let tolerated = [
            AppError::Auth(AuthError::HeaderMissing),
            AppError::Auth(AuthError::RefreshTokenUnknown {
                hint: String::new(),
            }),
            AppError::UserNotFound {
                id: "42".to_string(),
            },
        ];
        for error in &tolerated {
            assert!(error.tolerated_during_identity_resolution(), "{:?}", error);
        }

        let propagated = [
            AppError::Auth(AuthError::Jwt {
                message: "invalid signature".to_string(),
            }),
            AppError::Auth(AuthError::TokenExpired {
                token_type: TokenType::Refresh,
                expired_for: "2 minutes".to_string(),
            }),
            AppError::Internal("boom".to_string()),
        ];
        for error in &propagated {
            assert!(!error.tolerated_during_identity_resolution(), "{:?}", error);
        }
    }
}
