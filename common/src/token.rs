// common/src/token.rs
//! Session token verification.
//!
//! Session tokens are compact ES256 JWTs (`header.payload.signature`) issued by
//! the identity provider. Only the signature and `exp` are checked here; the
//! header is never consulted, the algorithm is pinned to ECDSA P-256/SHA-256.

use std::fmt;
use jsonwebtoken::{crypto, Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::unix_now;

/// Claims carried in a session token payload.
///
/// Timestamps are JWT NumericDates and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,
}

/// The part of the payload the verifier reads
#[derive(Deserialize)]
struct CheckedClaims {
    id: String,
    #[serde(default)]
    exp: Option<f64>,
}

/// Identity extracted from a verified token, as returned by `/decode`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    #[serde(rename = "accountId")]
    pub account_id: String,
}

/// Why a token was rejected. Callers outside the gateway only ever see
/// "unauthorized"; the kind is for logs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    #[error("invalid token format: expected 3 segments, found {0}")]
    Format(usize),
    #[error("public key could not be loaded: {0}")]
    Key(String),
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token payload could not be decoded: {0}")]
    Payload(String),
    #[error("token expired at {exp}")]
    Expired { exp: f64 },
}

/// Verifies session tokens against a configured SPKI public key.
///
/// The key is parsed once; a key that fails to parse is reported on each
/// verification of a well-formed token.
#[derive(Clone)]
pub struct TokenVerifier {
    key: Result<DecodingKey, String>,
    configured: bool,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("configured", &self.configured)
            .field("key_loaded", &self.key.is_ok())
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(public_key_pem: impl Into<String>) -> Self {
        let pem = public_key_pem.into();
        let configured = !pem.trim().is_empty();
        let key = DecodingKey::from_ec_pem(pem.as_bytes()).map_err(|e| e.to_string());
        if configured {
            if let Err(e) = &key {
                tracing::warn!("Configured public key could not be parsed: {}", e);
            }
        }
        Self { key, configured }
    }

    /// Whether a key has been configured at all
    pub fn has_key(&self) -> bool {
        self.configured
    }

    /// Verify against the system clock
    pub fn verify(&self, token: &str) -> Result<AccountIdentity, VerifyError> {
        self.verify_at(token, unix_now())
    }

    /// Verify with `now` given in seconds since the epoch
    pub fn verify_at(&self, token: &str, now: u64) -> Result<AccountIdentity, VerifyError> {
        let result = self.check(token, now);
        if let Err(e) = &result {
            tracing::debug!("JWT verification failed: {}", e);
        }
        result
    }

    fn check(&self, token: &str, now: u64) -> Result<AccountIdentity, VerifyError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(VerifyError::Format(parts.len()));
        }

        let key = self.key.as_ref().map_err(|e| VerifyError::Key(e.clone()))?;

        // Signature covers the encoded header and payload exactly as received
        let signing_input = format!("{}.{}", parts[0], parts[1]);
        let valid = crypto::verify(parts[2], signing_input.as_bytes(), key, Algorithm::ES256)
            .map_err(|e| {
                tracing::debug!("Signature could not be checked: {}", e);
                VerifyError::InvalidSignature
            })?;
        if !valid {
            return Err(VerifyError::InvalidSignature);
        }

        let claims = decode_claims(parts[1])?;

        if let Some(exp) = claims.exp {
            // exp == 0 is treated as absent
            if exp != 0.0 && exp < now as f64 {
                return Err(VerifyError::Expired { exp });
            }
        }

        Ok(AccountIdentity { account_id: claims.id })
    }
}

fn decode_claims(segment: &str) -> Result<CheckedClaims, VerifyError> {
    let bytes = base64::decode_config(segment, base64::URL_SAFE_NO_PAD)
        .map_err(|e| VerifyError::Payload(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| VerifyError::Payload(e.to_string()))
}
