/// Middleware module
///
/// Request correlation, request logging and the access-token gate.

mod access;
mod logging;
mod request_id;

pub use access::{AccessTokenMiddleware, TokenPayload};
pub use logging::LoggerMiddleware;
pub use request_id::{RequestId, RequestIdMiddleware, REQUEST_ID_HEADER};
