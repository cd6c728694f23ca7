//! HTTP exchange and response field extraction
//!
//! The remote key service speaks JSON over HTTP POST. This module owns the
//! two capabilities the rest of the crate consumes: "send a request, receive
//! a body or a failure" and "given a raw body, extract a named field". Core
//! logic never touches `reqwest` or `serde_json` directly, so it can be
//! tested with injected fixtures.

use crate::{Error, Result};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Build the HTTP client used for all service round-trips.
///
/// Connection pooling and keepalive follow the service's expected usage:
/// a handful of sequential POSTs per session on a single host.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = ClientBuilder::new()
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .use_rustls_tls()
        .user_agent(format!("qkd-entropy-engine/{}", crate::VERSION))
        .build()?;
    Ok(client)
}

/// POST a JSON payload and return the raw response body.
///
/// A non-success HTTP status at any step is a protocol failure; the body is
/// carried in the error for diagnosis.
pub async fn post_json(client: &Client, url: Url, payload: &Value) -> Result<String> {
    debug!("POST {}", url);

    let response = client.post(url.clone()).json(payload).send().await.map_err(|e| {
        warn!("Request to {} failed: {}", url, e);
        Error::Transport(e)
    })?;

    let status = response.status();
    let body = response.text().await.map_err(Error::Transport)?;

    if !status.is_success() {
        warn!("HTTP {} from {}: {}", status, url, body);
        return Err(Error::Protocol(format!("HTTP {}: {}", status, body)));
    }

    Ok(body)
}

/// Extract a named string field from a JSON response body.
pub fn string_field(body: &str, name: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("Malformed JSON response: {}", e)))?;

    match value.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(Error::Protocol(format!(
            "Field '{}' is not a string: {}",
            name, other
        ))),
        None => Err(Error::Protocol(format!(
            "Field '{}' missing from response",
            name
        ))),
    }
}

/// Extract a named Base64 field from a JSON response body and decode it.
pub fn base64_field(body: &str, name: &str) -> Result<Vec<u8>> {
    use base64::Engine as _;

    let encoded = string_field(body, name)?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| Error::Protocol(format!("Field '{}' is not valid Base64: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_field() {
        let body = r#"{"key_handle": "a1b2c3", "status": 0}"#;
        assert_eq!(string_field(body, "key_handle").unwrap(), "a1b2c3");
    }

    #[test]
    fn test_string_field_missing() {
        let body = r#"{"status": 0}"#;
        let err = string_field(body, "key_handle").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_string_field_wrong_type() {
        let body = r#"{"key_handle": 42}"#;
        assert!(matches!(
            string_field(body, "key_handle"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_string_field_malformed_json() {
        assert!(matches!(
            string_field("not json at all", "key_handle"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_base64_field() {
        let body = r#"{"key_buffer": "3q2+7w==", "status": 0}"#;
        let decoded = base64_field(body, "key_buffer").unwrap();
        assert_eq!(decoded, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_base64_field_invalid() {
        let body = r#"{"key_buffer": "!!not-base64!!"}"#;
        assert!(matches!(
            base64_field(body, "key_buffer"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_base64_field_empty_decodes_to_empty() {
        let body = r#"{"key_buffer": ""}"#;
        assert_eq!(base64_field(body, "key_buffer").unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn test_post_json_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/qkd_open")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/qkd_open", server.url())).unwrap();
        let err = post_json(&client, url, &serde_json::json!({})).await.unwrap_err();
        match err {
            Error::Protocol(msg) => assert!(msg.contains("500")),
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_post_json_connection_refused() {
        let client = build_client(Duration::from_secs(1)).unwrap();
        // Port 9 (discard) is not listening in the test environment
        let url = Url::parse("http://127.0.0.1:9/qkd_open").unwrap();
        let err = post_json(&client, url, &serde_json::json!({})).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
