// frontend-server/src/controller/mod.rs
//! Auth page controller.
//!
//! Owns the page state (current step, provider window, persisted identity)
//! and is driven by four kinds of events: user actions, inbound handshake
//! messages, the provider-closed poller and gateway completions. Every entry
//! point takes `&mut self`; nothing is shared.

pub mod host;

use std::time::Duration;
use common::graphql::GraphqlEnvelope;
use common::{
    AuthSuccess, FrontendConfig, HandshakeMessage, IdentityAndKeyManager, InboundMessage, MessageError,
    ANY_ORIGIN, STORAGE_KEY,
};
use serde_json::Value;
use thiserror::Error;
use crate::gateway_client::ClientError;

pub use host::{BrowserHost, KeyStore, MessageSource, ProviderMode, ProviderWindow, StorageError, WindowId};

/// How often the host should call [`AuthPageController::poll_provider`]
pub const PROVIDER_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingProvider,
    Authenticated,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// The visible status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub kind: StatusKind,
}

impl Status {
    fn new(message: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("an authentication attempt is already in progress")]
    AuthInProgress,

    #[error("provider window could not be opened")]
    PopupBlocked,

    #[error("malformed handshake message: {0}")]
    MalformedMessage(#[from] MessageError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Why a message was dropped without effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownShape,
    UnauthorizedOrigin(String),
    UnexpectedSource,
    NotAwaitingProvider,
    Unsolicited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Ignored(IgnoreReason),
    RepliedWithOrigin,
    Authenticated,
    Failed,
}

/// Where the provider lives and who may speak for it
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub provider_url: String,
    pub allowed_origin: String,
    pub mode: ProviderMode,
}

impl From<&FrontendConfig> for ControllerConfig {
    fn from(config: &FrontendConfig) -> Self {
        Self {
            provider_url: config.target_iframe_url.clone(),
            allowed_origin: config.allowed_origin.clone(),
            mode: ProviderMode::Popup,
        }
    }
}

/// Binds a gateway call to the session it was started in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
}

/// Message delivered to the page
pub struct MessageEvent<'a> {
    pub data: &'a Value,
    pub origin: &'a str,
    pub source: Option<&'a dyn MessageSource>,
}

pub struct AuthPageController<H: BrowserHost, S: KeyStore> {
    config: ControllerConfig,
    host: H,
    store: S,
    state: AuthState,
    trigger_enabled: bool,
    provider: Option<H::Window>,
    identity: Option<IdentityAndKeyManager>,
    status: Status,
    // Bumped whenever the session changes; stale gateway results are dropped
    generation: u64,
    last_response: Option<Value>,
}

impl<H: BrowserHost, S: KeyStore> AuthPageController<H, S> {
    pub fn new(config: ControllerConfig, host: H, store: S) -> Self {
        Self {
            config,
            host,
            store,
            state: AuthState::Idle,
            trigger_enabled: true,
            provider: None,
            identity: None,
            status: Status::new("Click the button below to start authentication", StatusKind::Info),
            generation: 0,
            last_response: None,
        }
    }

    /// Page load: resume from persisted key material when it is well formed
    pub fn load(config: ControllerConfig, host: H, store: S) -> Self {
        let mut controller = Self::new(config, host, store);

        match controller.store.get(STORAGE_KEY) {
            Ok(Some(raw)) => {
                let stored = serde_json::from_str::<Value>(&raw)
                    .ok()
                    .and_then(|value| IdentityAndKeyManager::from_value(&value).ok());
                match stored {
                    Some(identity) => {
                        tracing::info!("Loaded existing identity key manager");
                        controller.identity = Some(identity);
                        controller.state = AuthState::Authenticated;
                        controller.status = Status::new("Loaded existing authentication data", StatusKind::Success);
                    },
                    None => tracing::warn!("Ignoring malformed identity key manager in storage"),
                }
            },
            Ok(None) => {},
            Err(e) => tracing::error!("Failed to load identity key manager: {}", e),
        }

        controller
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn trigger_enabled(&self) -> bool {
        self.trigger_enabled
    }

    pub fn identity(&self) -> Option<&IdentityAndKeyManager> {
        self.identity.as_ref()
    }

    pub fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) {
        self.status = Status::new(message, kind);
    }

    fn close_provider(&mut self) {
        if let Some(mut window) = self.provider.take() {
            if !window.is_closed() {
                window.close();
            }
        }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.config.allowed_origin == ANY_ORIGIN || origin == self.config.allowed_origin
    }

    /// User pressed the start button
    pub fn start_auth(&mut self) -> Result<(), ControllerError> {
        if !self.trigger_enabled {
            return Err(ControllerError::AuthInProgress);
        }

        self.trigger_enabled = false;
        self.set_status("Opening authentication popup...", StatusKind::Info);
        self.close_provider();

        let opened = self
            .host
            .open_provider(&self.config.provider_url, self.config.mode)
            .filter(|window| !window.is_closed());

        match opened {
            Some(window) => {
                self.provider = Some(window);
                self.state = AuthState::AwaitingProvider;
                self.set_status("Please complete authentication in the popup window...", StatusKind::Info);
                Ok(())
            },
            None => {
                tracing::warn!("Provider window was blocked");
                self.trigger_enabled = true;
                if self.state == AuthState::AwaitingProvider {
                    self.state = AuthState::Idle;
                }
                self.set_status("Popup blocked. Please allow popups and try again.", StatusKind::Error);
                Err(ControllerError::PopupBlocked)
            }
        }
    }

    /// Inbound `postMessage`
    pub fn on_message(&mut self, event: MessageEvent<'_>) -> Result<MessageOutcome, ControllerError> {
        let Some(message) = InboundMessage::classify(event.data) else {
            return Ok(MessageOutcome::Ignored(IgnoreReason::UnknownShape));
        };
        tracing::debug!("Received {} from {}", message.kind(), event.origin);

        let message = match message {
            InboundMessage::RequestParentOrigin => return Ok(self.reply_with_origin(&event)),
            InboundMessage::ProvideParentOrigin { .. } => {
                return Ok(MessageOutcome::Ignored(IgnoreReason::Unsolicited));
            },
            other => other,
        };

        if !self.origin_allowed(event.origin) {
            tracing::warn!("Ignoring message from unauthorized origin: {}", event.origin);
            return Ok(MessageOutcome::Ignored(IgnoreReason::UnauthorizedOrigin(event.origin.to_string())));
        }

        if self.config.mode == ProviderMode::Popup {
            if let Some(window) = self.provider.as_ref().filter(|w| !w.is_closed()) {
                if event.source.and_then(|s| s.id()) != Some(window.id()) {
                    tracing::warn!("Message received from unexpected source");
                    return Ok(MessageOutcome::Ignored(IgnoreReason::UnexpectedSource));
                }
            }
        }

        if self.state != AuthState::AwaitingProvider {
            return Ok(MessageOutcome::Ignored(IgnoreReason::NotAwaitingProvider));
        }

        match message {
            InboundMessage::AuthSuccess(pending) => {
                let success = match pending.validate() {
                    Ok(success) => success,
                    Err(e) => {
                        tracing::error!("Invalid IdentityAndKeyManager data received: {}", e);
                        self.set_status("Authentication failed: Invalid data format", StatusKind::Error);
                        self.trigger_enabled = true;
                        return Err(ControllerError::MalformedMessage(e));
                    }
                };
                self.complete(success)
            },
            InboundMessage::AuthFailure { error } => {
                tracing::warn!("Provider reported failure: {:?}", error);
                self.state = AuthState::Failed;
                self.trigger_enabled = true;
                let message = match error {
                    Some(error) => format!("Authentication failed: {}", error),
                    None => "Authentication failed".to_string(),
                };
                self.set_status(message, StatusKind::Error);
                self.close_provider();
                Ok(MessageOutcome::Failed)
            },
            InboundMessage::RequestParentOrigin | InboundMessage::ProvideParentOrigin { .. } => {
                Ok(MessageOutcome::Ignored(IgnoreReason::Unsolicited))
            },
        }
    }

    fn reply_with_origin(&self, event: &MessageEvent<'_>) -> MessageOutcome {
        let Some(source) = event.source else {
            tracing::debug!("REQUEST_PARENT_ORIGIN without a source, nothing to reply to");
            return MessageOutcome::Ignored(IgnoreReason::UnexpectedSource);
        };
        let reply = HandshakeMessage::provide_parent_origin(self.host.origin());
        source.post_message(&reply, event.origin);
        MessageOutcome::RepliedWithOrigin
    }

    fn complete(&mut self, success: AuthSuccess) -> Result<MessageOutcome, ControllerError> {
        let AuthSuccess { identity, record, cookie } = success;

        // Persisted as received, explicit nulls included
        let saved = self.store.set(STORAGE_KEY, &record.to_string());

        if let Err(e) = saved {
            tracing::error!("Failed to save identity key manager: {}", e);
            self.state = AuthState::Failed;
            self.trigger_enabled = true;
            self.set_status("Authentication failed: Could not save data", StatusKind::Error);
            return Err(ControllerError::Storage(e));
        }

        tracing::info!("Identity key manager saved");
        self.identity = Some(identity);
        self.state = AuthState::Authenticated;
        self.generation += 1;
        self.last_response = None;
        self.set_status("Authentication successful!", StatusKind::Success);
        self.close_provider();

        if let Some(cookie) = cookie {
            self.host.set_document_cookie(&cookie);
        }

        Ok(MessageOutcome::Authenticated)
    }

    /// Timer tick; returns true when a pending attempt was cancelled because
    /// the provider window went away
    pub fn poll_provider(&mut self) -> bool {
        let closed = self.provider.as_ref().is_some_and(|w| w.is_closed());
        if !closed {
            return false;
        }
        self.provider = None;

        if self.state != AuthState::AwaitingProvider {
            return false;
        }
        self.state = AuthState::Idle;
        if !self.trigger_enabled {
            self.trigger_enabled = true;
            self.set_status("Authentication cancelled", StatusKind::Info);
        }
        true
    }

    /// Forget everything persisted and return to the start
    pub fn clear(&mut self) -> Result<(), ControllerError> {
        if let Err(e) = self.store.remove(STORAGE_KEY) {
            tracing::error!("Failed to clear stored data: {}", e);
            self.set_status("Failed to clear data", StatusKind::Error);
            return Err(ControllerError::Storage(e));
        }

        self.identity = None;
        self.last_response = None;
        self.generation += 1;
        self.state = AuthState::Idle;
        self.trigger_enabled = true;
        self.close_provider();
        self.set_status("Cleared stored authentication data", StatusKind::Info);
        Ok(())
    }

    pub fn begin_decode(&mut self) -> RequestTicket {
        self.set_status("Decoding JWT...", StatusKind::Info);
        RequestTicket { generation: self.generation }
    }

    /// Returns false when the result arrived for an outdated session
    pub fn finish_decode(&mut self, ticket: RequestTicket, result: Result<Value, ClientError>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!("Discarding stale /decode result");
            return false;
        }
        match result {
            Ok(data) => {
                self.set_status("JWT decoded successfully!", StatusKind::Success);
                self.last_response = Some(data);
            },
            Err(e) => {
                tracing::error!("JWT decode failed: {}", e);
                self.set_status(format!("JWT decode failed: {}", e), StatusKind::Error);
            }
        }
        true
    }

    pub fn begin_query(&mut self) -> RequestTicket {
        self.set_status("Running GraphQL query...", StatusKind::Info);
        RequestTicket { generation: self.generation }
    }

    pub fn finish_query(&mut self, ticket: RequestTicket, result: Result<GraphqlEnvelope, ClientError>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!("Discarding stale /graphql result");
            return false;
        }
        match result {
            Ok(envelope) => {
                self.set_status("GraphQL query completed", StatusKind::Success);
                self.last_response = serde_json::to_value(envelope).ok();
            },
            Err(e) => {
                tracing::error!("GraphQL query failed: {}", e);
                self.set_status(format!("GraphQL query failed: {}", e), StatusKind::Error);
            }
        }
        true
    }
}
