use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::JwtSettings;
use crate::middleware::{AccessTokenMiddleware, LoggerMiddleware, RequestIdMiddleware};
use crate::routes::{get_user, health_check, login, logout, renew, resolve_user};
use crate::session::SessionService;

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    jwt_settings: JwtSettings,
) -> Result<Server, std::io::Error> {
    let session = SessionService::new(connection.clone(), jwt_settings);
    let connection = web::Data::new(connection);
    let session_data = web::Data::new(session.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Registered after the logger so it runs first and the request
            // id is available everywhere downstream.
            .wrap(LoggerMiddleware)
            .wrap(RequestIdMiddleware)
            // Shared state
            .app_data(connection.clone())
            .app_data(session_data.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/login", web::post().to(login))
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/renew", web::post().to(renew))
            .route("/auth/user", web::get().to(resolve_user))
            // Routes requiring a valid access token
            .service(
                web::scope("/users")
                    .wrap(AccessTokenMiddleware::new(session.clone()))
                    .route("/{id}", web::get().to(get_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
