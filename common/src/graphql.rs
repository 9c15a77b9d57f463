// common/src/graphql.rs
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Single GraphQL call as posted by the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub variables: Map<String, Value>,
}

/// `"variables": null` means no variables
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

/// Normalized view of whatever the upstream API answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlEnvelope {
    pub status: u16,
    #[serde(rename = "statusText")]
    pub status_text: String,
    /// Parsed JSON body, or the raw text when the body is not JSON
    pub data: Value,
    pub headers: BTreeMap<String, String>,
}

impl GraphqlEnvelope {
    /// Parse `body` as JSON, keeping it as a string when it is not
    pub fn body_to_data(body: &str) -> Value {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    }
}
