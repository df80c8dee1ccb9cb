mod auth;
mod health_check;
mod users;

pub use auth::{login, logout, renew, resolve_user};
pub use health_check::health_check;
pub use users::get_user;
