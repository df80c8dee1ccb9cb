/// Session routes
///
/// Thin HTTP facade over the session service: credentials and tokens ride
/// in the Authorization header, optional JSON bodies become access-token
/// payloads, and every failure goes through the error response mapper with
/// the request's context.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde_json::Value;

use crate::error::{AppError, HttpError};
use crate::session::SessionService;

fn auth_header(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// The request body is optional, but when present it must be JSON; a
/// malformed body maps to the 400 validation kind.
fn parse_optional_body(req: &HttpRequest, body: &web::Bytes) -> Result<Option<Value>, HttpError> {
    if body.is_empty() {
        return Ok(None);
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|error| AppError::Validation(error.to_string()).into_http(req))
}

/// POST /auth/login
///
/// `Authorization: Basic <base64(login:password)>`; the optional JSON body
/// is embedded as the access token's payload. Returns the issued pair and,
/// as a side effect, invalidates any previous session of this user.
///
/// # Errors
/// - 400: malformed JSON body
/// - 401: missing header, wrong scheme, or invalid credentials
/// - 500: storage or signing failure
pub async fn login(
    req: HttpRequest,
    body: web::Bytes,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, HttpError> {
    let auth = auth_header(&req);
    let data = parse_optional_body(&req, &body)?;

    let tokens = session
        .login(auth.as_deref(), data)
        .await
        .map_err(|error| error.into_http(&req))?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/logout
///
/// `Authorization: Basic …`. Responds 204 with no body; logging out twice
/// is not an error.
pub async fn logout(
    req: HttpRequest,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, HttpError> {
    let auth = auth_header(&req);

    session
        .logout(auth.as_deref())
        .await
        .map_err(|error| error.into_http(&req))?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /auth/renew
///
/// `Authorization: Bearer <refresh token>`; the optional JSON body becomes
/// the new access token's payload. The refresh token itself is not rotated.
///
/// # Errors
/// - 400: malformed JSON body
/// - 401: missing header, wrong scheme, malformed token
/// - 403: wrong token type, expired token, unknown/rotated-out session
pub async fn renew(
    req: HttpRequest,
    body: web::Bytes,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, HttpError> {
    let auth = auth_header(&req);
    let data = parse_optional_body(&req, &body)?;

    let renewed = session
        .renew(auth.as_deref(), data)
        .await
        .map_err(|error| error.into_http(&req))?;

    Ok(HttpResponse::Ok().json(renewed))
}

/// GET /auth/user
///
/// `Authorization: Bearer <refresh token>`. Resolves the user behind the
/// credential, or responds with JSON `null` when the caller simply is not
/// logged in. Malformed tokens still fail with their usual status.
pub async fn resolve_user(
    req: HttpRequest,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, HttpError> {
    let auth = auth_header(&req);

    let user = session
        .resolve_identity(auth.as_deref())
        .await
        .map_err(|error| error.into_http(&req))?;

    Ok(HttpResponse::Ok().json(user))
}
