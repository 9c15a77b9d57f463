// backend-server/src/utils/cors.rs
use actix_web::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use common::BackendConfig;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Value for `Access-Control-Allow-Origin`: the request origin when it is
/// allowed, otherwise empty. A wildcard allow-list reflects any origin.
pub fn reflected_origin<'a>(origin: &'a str, config: &BackendConfig) -> &'a str {
    if config.allows_any_origin() || origin == config.allowed_origin {
        origin
    } else {
        ""
    }
}

/// CORS header set for one request
#[derive(Debug, Clone)]
pub struct CorsHeaders(Vec<(HeaderName, HeaderValue)>);

impl CorsHeaders {
    pub fn for_origin(origin: &str, config: &BackendConfig) -> Self {
        let allow_origin = HeaderValue::from_str(reflected_origin(origin, config))
            .unwrap_or_else(|_| HeaderValue::from_static(""));

        Self(vec![
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin),
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS)),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS)),
            (header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true")),
        ])
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.0 {
            headers.insert(name.clone(), value.clone());
        }
    }
}
