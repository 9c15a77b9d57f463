// backend-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Everything the gateway answers with a non-2xx status
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized origin")]
    UnauthorizedOrigin,

    #[error("Authentication required")]
    MissingCredential,

    #[error("Invalid request body")]
    BadRequest,

    #[error("Not found")]
    NotFound,

    #[error("Failed to proxy request")]
    Upstream(#[from] reqwest::Error),
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnauthorizedOrigin => StatusCode::FORBIDDEN,
            GatewayError::MissingCredential => StatusCode::UNAUTHORIZED,
            GatewayError::BadRequest => StatusCode::BAD_REQUEST,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            GatewayError::Upstream(e) => json!({
                "error": self.to_string(),
                "message": e.to_string(),
            }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
