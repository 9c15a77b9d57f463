// backend-server/src/api/session.rs
use actix_web::{web, HttpResponse, Responder, ResponseError};
use serde_json::{json, Value};
use crate::error::GatewayError;
use crate::middleware::gate::SessionToken;
use crate::state::AppState;

/// `/decode`: identity from the session token, or 401 `null`.
/// The failure kind is only logged.
pub async fn decode(token: web::ReqData<SessionToken>, state: web::Data<AppState>) -> impl Responder {
    if !state.verifier.has_key() {
        tracing::warn!("No public key configured, cannot verify session tokens");
        return HttpResponse::Unauthorized().json(Value::Null);
    }

    match state.verifier.verify(&token.0) {
        Ok(identity) => {
            tracing::info!("Decoded session for account {}", identity.account_id);
            HttpResponse::Ok().json(identity)
        },
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            HttpResponse::Unauthorized().json(Value::Null)
        }
    }
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn not_found() -> impl Responder {
    GatewayError::NotFound.error_response()
}
