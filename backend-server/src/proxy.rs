// backend-server/src/proxy.rs
use std::collections::BTreeMap;
use actix_web::{web, HttpResponse};
use common::graphql::{GraphqlEnvelope, GraphqlRequest};
use reqwest::header::HeaderMap;
use crate::error::GatewayError;
use crate::middleware::gate::SessionToken;
use crate::state::AppState;

/// Forwards GraphQL calls to the upstream API with the session token as bearer
#[derive(Clone, Debug)]
pub struct GraphqlProxy {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphqlProxy {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One upstream call, no retries. Only transport failures are errors;
    /// any upstream status is reported in the envelope.
    pub async fn forward(&self, token: &str, request: &GraphqlRequest) -> Result<GraphqlEnvelope, reqwest::Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let headers = snapshot_headers(response.headers());
        let body = response.text().await?;

        tracing::debug!("Upstream answered {} ({} bytes)", status, body.len());

        Ok(GraphqlEnvelope {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            data: GraphqlEnvelope::body_to_data(&body),
            headers,
        })
    }
}

/// Repeated header names are joined with ", "
fn snapshot_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut snapshot: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        snapshot
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    snapshot
}

/// `POST /graphql`
pub async fn graphql_route(
    token: web::ReqData<SessionToken>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let request: GraphqlRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Rejected GraphQL body: {}", e);
        GatewayError::BadRequest
    })?;

    let envelope = state.proxy.forward(&token.0, &request).await.map_err(|e| {
        tracing::error!("Proxy request to {} failed: {}", state.proxy.endpoint(), e);
        GatewayError::Upstream(e)
    })?;

    Ok(HttpResponse::Ok().json(envelope))
}
