//! Session token extraction from login responses

use serde_json::Value;

/// Places a login response may carry the token, tried in order
const TOKEN_PATHS: &[&[&str]] = &[
    &["token"],
    &["accessToken"],
    &["user", "token"],
    &["data", "token"],
];

/// First non-empty string token found in a login response body
pub fn extract_token(body: &Value) -> Option<String> {
    TOKEN_PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(body, |value, key| value.get(key))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}
