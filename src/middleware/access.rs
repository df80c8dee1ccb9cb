/// Access-token gate
///
/// Protects routes behind a valid Bearer access token. On success the
/// token's payload lands in request extensions; on failure the request is
/// answered through the error response mapper without reaching the handler.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::rc::Rc;

use crate::session::SessionService;

/// The verified access token's payload, for handlers that want it.
#[derive(Debug, Clone)]
pub struct TokenPayload(pub Option<Value>);

pub struct AccessTokenMiddleware {
    session: SessionService,
}

impl AccessTokenMiddleware {
    pub fn new(session: SessionService) -> Self {
        Self { session }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessTokenMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AccessTokenMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AccessTokenMiddlewareService {
            service: Rc::new(service),
            session: self.session.clone(),
        }))
    }
}

pub struct AccessTokenMiddlewareService<S> {
    service: Rc<S>,
    session: SessionService,
}

impl<S, B> Service<ServiceRequest> for AccessTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        match self.session.verify_access(auth.as_deref()) {
            Ok(payload) => {
                req.extensions_mut().insert(TokenPayload(payload));

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(error) => {
                let http_error = error.into_http(req.request());
                Box::pin(async move { Err(http_error.into()) })
            }
        }
    }
}
