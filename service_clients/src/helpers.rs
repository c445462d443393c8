use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::ServiceClientError;

/// Joins a base url and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// An `Authorization: Bearer` header for the caller's token.
pub fn bearer_headers(token: &str) -> Result<HeaderMap, ServiceClientError> {
    let mut headers = HeaderMap::with_capacity(1);
    let val = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ServiceClientError::RequestError(format!("Invalid bearer token. {e}")))?;
    headers.insert(AUTHORIZATION, val);
    Ok(headers)
}
