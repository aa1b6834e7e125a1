//! Request plumbing shared by the HTTP backends.
//!
//! Every failure mode of a call (transport error, timeout, non-2xx status,
//! undecodable body) becomes a [`TranscribeError::ProviderApi`] tagged with
//! the backend's display name.

use crate::error::TranscribeError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Longest error body echoed back in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Build a client whose every request is bounded by `timeout_secs`.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, TranscribeError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TranscribeError::Internal(format!("HTTP client: {e}")))
}

fn transport_error(provider: &str, e: reqwest::Error) -> TranscribeError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request failed: {e}")
    };
    TranscribeError::api(provider, message)
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Send `request` and decode a JSON body of type `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, TranscribeError> {
    let resp = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;

    let status = resp.status();
    let raw_text = resp
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    if !status.is_success() {
        return Err(TranscribeError::api(
            provider,
            format!("HTTP {status}: {}", truncate(raw_text.trim())),
        ));
    }

    debug!(
        "{provider}: raw response ({} bytes): {}",
        raw_text.len(),
        truncate(&raw_text)
    );
    serde_json::from_str(&raw_text)
        .map_err(|e| TranscribeError::api(provider, format!("unexpected response body: {e}")))
}
