// backend-server/src/utils/cookies.rs
use std::collections::HashMap;

/// Parse a `Cookie` header into name/value pairs.
///
/// Pairs with an empty name or value are dropped. Values are percent-decoded
/// when possible. When a name repeats, the first occurrence wins.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for pair in header.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            continue;
        }

        let value = urlencoding::decode(value)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| value.to_string());

        cookies.entry(name.to_string()).or_insert(value);
    }

    cookies
}
