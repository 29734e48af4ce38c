//! Credential extraction from request headers.
//!
//! Pure parsing: `Authorization: Bearer <token>` and `Authorization: ApiKey <key>`.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use super::error::ExtractError;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Extract a bearer token.
///
/// A value without the `Bearer` marker is returned as-is (trimmed).
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, ExtractError> {
    extract_with_scheme(headers, BEARER_SCHEME)
}

/// Extract a static API key.
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, ExtractError> {
    extract_with_scheme(headers, API_KEY_SCHEME)
}

/// Raw `Authorization` value. Absent, empty and non-UTF-8 values count as missing.
pub fn authorization_value(headers: &HeaderMap) -> Result<&str, ExtractError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ExtractError::MissingHeader)
}

fn extract_with_scheme(headers: &HeaderMap, scheme: &str) -> Result<String, ExtractError> {
    let value = authorization_value(headers)?.trim();
    // Strict prefix: the marker is only removed when it leads the value.
    let rest = value.strip_prefix(scheme).unwrap_or(value);
    Ok(rest.trim().to_string())
}
