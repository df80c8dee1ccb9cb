/// Token claims and payload shapes
///
/// The claims embed the token's own type so an access token can never be
/// replayed where a refresh token is expected (and vice versa).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed token payload.
///
/// `data` is opaque caller-supplied content for access tokens; refresh
/// tokens carry a [`RefreshTokenData`] in it. Its shape is deliberately NOT
/// validated at decode time — each consumer asserts the shape it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What a refresh token's `data` must contain: the owning user and the id
/// of the stored record backing this session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefreshTokenData {
    pub user_id: Uuid,
    pub token_id: Uuid,
}

/// Asserts that a verified refresh token's payload has the expected shape.
/// Failures name the offending field in the error hint.
pub fn refresh_data_from_payload(payload: Option<Value>) -> Result<RefreshTokenData, AppError> {
    let data = payload.ok_or_else(|| payload_unknown("refresh token payload carries no data"))?;

    let object = data
        .as_object()
        .ok_or_else(|| payload_unknown("refresh token payload data is not an object"))?;

    for field in ["user_id", "token_id"] {
        if !object.contains_key(field) {
            return Err(payload_unknown(format!(
                "the \"{}\" property is missing in refresh token payload data",
                field
            )));
        }
    }

    serde_json::from_value(data).map_err(|error| {
        payload_unknown(format!("refresh token payload data is malformed: {}", error))
    })
}

fn payload_unknown(hint: impl Into<String>) -> AppError {
    AuthError::TokenPayloadUnknown { hint: hint.into() }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hint_of(result: Result<RefreshTokenData, AppError>) -> String {
        match result {
            Err(AppError::Auth(AuthError::TokenPayloadUnknown { hint })) => hint,
            other => panic!("Expected payload-unknown error, got {:?}", other),
        }
    }

    #[test]
    fn well_formed_payload_parses() {
        let user_id = Uuid::new_v4();
        let token_id = Uuid::new_v4();
        let payload = json!({ "user_id": user_id, "token_id": token_id });

        let data = refresh_data_from_payload(Some(payload)).expect("Failed to parse payload");

        assert_eq!(data.user_id, user_id);
        assert_eq!(data.token_id, token_id);
    }

    #[test]
    fn absent_payload_is_rejected() {
        let hint = hint_of(refresh_data_from_payload(None));
        assert_eq!(hint, "refresh token payload carries no data");
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let hint = hint_of(refresh_data_from_payload(Some(json!("not-an-object"))));
        assert_eq!(hint, "refresh token payload data is not an object");
    }

    #[test]
    fn missing_fields_are_named_in_the_hint() {
        let missing_user = refresh_data_from_payload(Some(json!({ "token_id": Uuid::new_v4() })));
        assert_eq!(
            hint_of(missing_user),
            "the \"user_id\" property is missing in refresh token payload data"
        );

        let missing_token = refresh_data_from_payload(Some(json!({ "user_id": Uuid::new_v4() })));
        assert_eq!(
            hint_of(missing_token),
            "the \"token_id\" property is missing in refresh token payload data"
        );
    }

    #[test]
    fn malformed_field_values_are_rejected() {
        let payload = json!({ "user_id": "not-a-uuid", "token_id": Uuid::new_v4() });
        let hint = hint_of(refresh_data_from_payload(Some(payload)));
        assert!(hint.starts_with("refresh token payload data is malformed"));
    }

    #[test]
    fn token_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TokenType::Access).expect("Failed to serialize"),
            "\"access\""
        );
        assert_eq!(TokenType::Refresh.to_string(), "refresh");
    }
}
