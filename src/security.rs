use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Header carrying the API key on mutating requests.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Whether a request may mutate state.
///
/// With no key configured every request is allowed.
pub fn is_authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|provided| constant_time_compare(provided, expected))
}
