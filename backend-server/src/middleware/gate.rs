// backend-server/src/middleware/gate.rs
use std::rc::Rc;
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{header, Method},
    Error, HttpMessage, HttpResponse, ResponseError,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use common::BackendConfig;
use crate::error::GatewayError;
use crate::utils::cookies::parse_cookies;
use crate::utils::cors::CorsHeaders;

/// Session token taken from the configured cookie, stored in request extensions
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Front door of the gateway: answers preflights, enforces the origin
/// allow-list, requires the session cookie, and stamps CORS headers on every
/// response it lets through.
#[derive(Debug, Clone)]
pub struct Gate {
    config: Rc<BackendConfig>,
}

impl Gate {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config: Rc::new(config),
        }
    }
}

/// Check origin then cookie; on success the session token is returned
fn admit(req: &ServiceRequest, origin: &str, config: &BackendConfig) -> Result<SessionToken, GatewayError> {
    if !config.allows_any_origin() && origin != config.allowed_origin {
        return Err(GatewayError::UnauthorizedOrigin);
    }

    let cookie_header = req
        .headers()
        .get_all(header::COOKIE)
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    parse_cookies(&cookie_header)
        .remove(&config.cookie_name)
        .map(SessionToken)
        .ok_or(GatewayError::MissingCredential)
}

impl<S, B> Transform<S, ServiceRequest> for Gate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = GateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GateMiddleware {
            service,
            config: self.config.clone(),
        }))
    }
}

pub struct GateMiddleware<S> {
    service: S,
    config: Rc<BackendConfig>,
}

impl<S, B> Service<ServiceRequest> for GateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let origin = req
            .headers()
            .get(header::ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let cors = CorsHeaders::for_origin(&origin, &self.config);

        // Preflight never reaches the origin or cookie checks
        if req.method() == Method::OPTIONS {
            let mut response = HttpResponse::NoContent().finish();
            cors.apply(response.headers_mut());
            return Box::pin(async move {
                Ok(req.into_response(response).map_into_right_body())
            });
        }

        match admit(&req, &origin, &self.config) {
            Ok(token) => {
                req.extensions_mut().insert(token);
            },
            Err(e) => {
                tracing::warn!("Rejected {} {} from origin '{}': {}", req.method(), req.path(), origin, e);
                let mut response = e.error_response();
                cors.apply(response.headers_mut());
                return Box::pin(async move {
                    Ok(req.into_response(response).map_into_right_body())
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            cors.apply(res.headers_mut());
            Ok(res.map_into_left_body())
        })
    }
}
