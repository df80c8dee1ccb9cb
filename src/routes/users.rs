/// User lookup route, gated by the access-token middleware.

use actix_web::{web, HttpRequest, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::HttpError;
use crate::users;

/// GET /users/{id}
///
/// # Errors
/// - 401/403: handled by the access-token gate before this runs
/// - 404: no user with that id
pub async fn get_user(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, HttpError> {
    let user = users::get(pool.get_ref(), id.into_inner())
        .await
        .map_err(|error| error.into_http(&req))?;

    Ok(HttpResponse::Ok().json(user))
}
