// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use config::{Config as ConfigFile, File, Environment};

/// Wildcard value for `allowed_origin` settings
pub const ANY_ORIGIN: &str = "*";

/// Cookie carrying the session token when nothing else is configured
pub const DEFAULT_COOKIE_NAME: &str = "api_access_token";

/// Flat environment variables and the keys they set. Applied after every
/// file and `APP__*` source.
const FLAT_VARS: [(&str, &str); 10] = [
    ("FRONTEND_SERVER_ADDR", "frontend_server_addr"),
    ("BACKEND_SERVER_ADDR", "backend_server_addr"),
    ("TARGET_API_URL", "backend.target_api_url"),
    ("GRAPHQL_PATH", "backend.graphql_path"),
    ("ALLOWED_ORIGIN", "backend.allowed_origin"),
    ("COOKIE_NAME", "backend.cookie_name"),
    ("PUBLIC_KEY", "backend.public_key"),
    ("BACKEND_URL", "frontend.backend_url"),
    ("PROVIDER_ALLOWED_ORIGIN", "frontend.allowed_origin"),
    ("TARGET_IFRAME_URL", "frontend.target_iframe_url"),
];

/// Central configuration for both services
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frontend_server_addr: String,
    pub backend_server_addr: String,

    pub backend: BackendConfig,
    pub frontend: FrontendConfig,
}

/// Settings read by the auth gateway
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the upstream API the GraphQL proxy forwards to
    pub target_api_url: String,
    /// Path appended to `target_api_url` for GraphQL calls
    pub graphql_path: String,
    /// Exact origin allowed to call the gateway, or `*`
    pub allowed_origin: String,
    pub cookie_name: String,
    /// ECDSA P-256 public key in SPKI PEM form
    pub public_key: String,
}

/// Settings substituted into the auth page
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub backend_url: String,
    /// Origin the identity provider posts from, or `*`
    pub allowed_origin: String,
    /// URL opened in the provider popup or frame
    pub target_iframe_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frontend_server_addr: "127.0.0.1:3333".to_string(),
            backend_server_addr: "127.0.0.1:4444".to_string(),
            backend: BackendConfig::default(),
            frontend: FrontendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            target_api_url: "https://api.example.com".to_string(),
            graphql_path: "/graphql".to_string(),
            allowed_origin: ANY_ORIGIN.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            public_key: String::new(),
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:4444".to_string(),
            allowed_origin: ANY_ORIGIN.to_string(),
            target_iframe_url: "http://localhost:3000".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origin == ANY_ORIGIN
    }

    /// Full upstream GraphQL endpoint
    pub fn graphql_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.target_api_url.trim_end_matches('/'),
            self.graphql_path
        )
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        Self::load_from(&config_dir, &run_mode, |key| env::var(key).ok())
    }

    /// Layer the files in `config_dir`, then `APP__*` variables, then the
    /// flat variables found through `lookup`
    pub fn load_from<F>(config_dir: &Path, run_mode: &str, lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // APP__BACKEND__PUBLIC_KEY and friends
            .add_source(Environment::with_prefix("APP").separator("__"));

        for (var, key) in FLAT_VARS {
            if let Some(value) = lookup(var) {
                tracing::info!("Using {} from the environment", var);
                builder = builder.set_override(key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_vars(|key| env::var(key).ok())
            }
        }
    }

    /// Build a config from a flat variable lookup, using defaults for anything missing
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            frontend_server_addr: var("FRONTEND_SERVER_ADDR", defaults.frontend_server_addr),
            backend_server_addr: var("BACKEND_SERVER_ADDR", defaults.backend_server_addr),
            backend: BackendConfig {
                target_api_url: var("TARGET_API_URL", defaults.backend.target_api_url),
                graphql_path: var("GRAPHQL_PATH", defaults.backend.graphql_path),
                allowed_origin: var("ALLOWED_ORIGIN", defaults.backend.allowed_origin),
                cookie_name: var("COOKIE_NAME", defaults.backend.cookie_name),
                public_key: var("PUBLIC_KEY", defaults.backend.public_key),
            },
            frontend: FrontendConfig {
                backend_url: var("BACKEND_URL", defaults.frontend.backend_url),
                allowed_origin: var("PROVIDER_ALLOWED_ORIGIN", defaults.frontend.allowed_origin),
                target_iframe_url: var("TARGET_IFRAME_URL", defaults.frontend.target_iframe_url),
            },
        }
    }
}
