// common/src/models/identity.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client storage key holding the persisted record
pub const STORAGE_KEY: &str = "identity_key_manager";

/// Identity and derived key material handed over by the identity provider.
///
/// Only `hashedIdentity` and `hashedSeedUpdatedAt` are required. Unknown
/// fields are kept so the record is persisted as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAndKeyManager {
    pub hashed_identity: String,
    pub hashed_seed_updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase_enhancement_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_enhancement_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityAndKeyManager {
    pub fn new(hashed_identity: impl Into<String>, hashed_seed_updated_at: impl Into<String>) -> Self {
        Self {
            hashed_identity: hashed_identity.into(),
            hashed_seed_updated_at: hashed_seed_updated_at.into(),
            passphrase_enhancement_key: None,
            backup_enhancement_key: None,
            extra: Map::new(),
        }
    }

    /// Typed view of an untrusted JSON value
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn to_value(&self) -> Value {
        // Struct of strings and JSON values; serialization cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
