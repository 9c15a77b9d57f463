// backend-server/src/state.rs
use common::{BackendConfig, TokenVerifier};
use crate::proxy::GraphqlProxy;

/// Read-only state shared by every request
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: BackendConfig,
    pub verifier: TokenVerifier,
    pub proxy: GraphqlProxy,
}

impl AppState {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Use a preconfigured HTTP client for upstream calls
    pub fn with_client(config: BackendConfig, client: reqwest::Client) -> Self {
        let verifier = TokenVerifier::new(config.public_key.clone());
        let proxy = GraphqlProxy::new(client, config.graphql_endpoint());
        Self {
            config,
            verifier,
            proxy,
        }
    }
}
