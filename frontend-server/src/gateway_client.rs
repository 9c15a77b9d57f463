// frontend-server/src/gateway_client.rs
use common::graphql::{GraphqlEnvelope, GraphqlRequest};
use reqwest::header::{CONTENT_TYPE, COOKIE, ORIGIN};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{endpoint} request failed: {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("request could not be completed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fetch side of the auth page: calls the gateway with the session cookie
/// and the page origin, the way the browser would.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    origin: Option<String>,
}

impl GatewayClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            origin: None,
        }
    }

    /// Origin presented to the gateway's allow-list
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// `GET /decode`
    pub async fn decode(&self, cookie: Option<&str>) -> Result<Value, ClientError> {
        let request = self
            .request(reqwest::Method::GET, "/decode", cookie)
            .header(CONTENT_TYPE, "application/json");
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                endpoint: "/decode",
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// `POST /graphql`
    pub async fn graphql(&self, cookie: Option<&str>, query: &GraphqlRequest) -> Result<GraphqlEnvelope, ClientError> {
        let response = self
            .request(reqwest::Method::POST, "/graphql", cookie)
            .json(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                endpoint: "/graphql",
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    fn request(&self, method: reqwest::Method, path: &str, cookie: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(origin) = &self.origin {
            builder = builder.header(ORIGIN, origin);
        }
        if let Some(cookie) = cookie.map(cookie_pair).filter(|c| !c.is_empty()) {
            builder = builder.header(COOKIE, cookie);
        }
        builder
    }
}

/// `name=value` part of a `document.cookie` assignment such as
/// `api_access_token=abc; path=/; secure`
pub fn cookie_pair(assignment: &str) -> &str {
    assignment.split(';').next().unwrap_or_default().trim()
}
