// common/src/messages.rs
//! Cross-window handshake between the auth page and the identity provider.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::IdentityAndKeyManager;

/// Handshake message as it travels over `postMessage`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandshakeMessage {
    AuthSuccess {
        data: AuthSuccessData,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cookie: Option<String>,
    },
    AuthFailure {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    RequestParentOrigin,
    ProvideParentOrigin {
        origin: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSuccessData {
    pub identity_and_key_manager: IdentityAndKeyManager,
}

impl HandshakeMessage {
    pub fn auth_success(identity: IdentityAndKeyManager, cookie: Option<String>) -> Self {
        HandshakeMessage::AuthSuccess {
            data: AuthSuccessData {
                identity_and_key_manager: identity,
            },
            cookie,
        }
    }

    pub fn provide_parent_origin(origin: impl Into<String>) -> Self {
        HandshakeMessage::ProvideParentOrigin { origin: origin.into() }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid IdentityAndKeyManager data: {0}")]
    InvalidIdentity(#[from] serde_json::Error),
}

/// First decode stage: recognizes the tag and outer shape only.
///
/// An `AUTH_SUCCESS` is recognized as soon as it carries
/// `data.identityAndKeyManager`; the nested record is validated separately,
/// after the sender has been checked.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    AuthSuccess(UnverifiedSuccess),
    AuthFailure { error: Option<String> },
    RequestParentOrigin,
    ProvideParentOrigin { origin: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedSuccess {
    identity: Value,
    cookie: Option<String>,
}

/// A validated `AUTH_SUCCESS`
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSuccess {
    pub identity: IdentityAndKeyManager,
    /// The record exactly as received, for persisting
    pub record: Value,
    pub cookie: Option<String>,
}

impl InboundMessage {
    /// Returns `None` for anything that is not one of the handshake shapes
    pub fn classify(data: &Value) -> Option<Self> {
        let object = data.as_object()?;
        let tag = object.get("type")?.as_str()?;

        match tag {
            "AUTH_SUCCESS" => {
                let identity = object
                    .get("data")?
                    .as_object()?
                    .get("identityAndKeyManager")?
                    .clone();
                let cookie = object
                    .get("cookie")
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);
                Some(InboundMessage::AuthSuccess(UnverifiedSuccess { identity, cookie }))
            },
            "AUTH_FAILURE" => Some(InboundMessage::AuthFailure {
                error: object.get("error").and_then(Value::as_str).map(str::to_string),
            }),
            "REQUEST_PARENT_ORIGIN" => Some(InboundMessage::RequestParentOrigin),
            "PROVIDE_PARENT_ORIGIN" => Some(InboundMessage::ProvideParentOrigin {
                origin: object.get("origin")?.as_str()?.to_string(),
            }),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::AuthSuccess(_) => "AUTH_SUCCESS",
            InboundMessage::AuthFailure { .. } => "AUTH_FAILURE",
            InboundMessage::RequestParentOrigin => "REQUEST_PARENT_ORIGIN",
            InboundMessage::ProvideParentOrigin { .. } => "PROVIDE_PARENT_ORIGIN",
        }
    }
}

impl UnverifiedSuccess {
    /// Second decode stage
    pub fn validate(self) -> Result<AuthSuccess, MessageError> {
        let identity = IdentityAndKeyManager::from_value(&self.identity)?;
        Ok(AuthSuccess {
            identity,
            record: self.identity,
            cookie: self.cookie,
        })
    }
}
