//! Session operations against the remote key service
//!
//! The service exposes four POST endpoints: open a session, confirm peer
//! readiness, fetch a key block, close the session. `KeyGateway` is the
//! trait the provisioning loop is written against; `HttpKeyGateway` is the
//! production implementation over JSON/HTTP.

use crate::{transport, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Obtain a session handle
pub const OPEN_PATH: &str = "/qkd_open";
/// Block until the peer side of the session is ready
pub const CONFIRM_PATH: &str = "/qkd_connect_blocking";
/// Fetch the next key block
pub const KEY_PATH: &str = "/qkd_get_key";
/// Release the session
pub const CLOSE_PATH: &str = "/qkd_close";

/// The four session operations the byte provider needs from the service.
///
/// Kept as a trait so the session and provider logic can be exercised with
/// scripted fixtures instead of live network calls.
#[async_trait]
pub trait KeyGateway: Send + Sync {
    /// Open a session and return the opaque handle assigned by the service.
    async fn open(&self) -> Result<String>;

    /// Confirm session readiness. Blocks (server-side) until the remote
    /// peer is connected.
    async fn confirm(&self, handle: &str) -> Result<()>;

    /// Fetch the next key block. Never returns an empty block.
    async fn fetch_key(&self, handle: &str) -> Result<Vec<u8>>;

    /// Release the session. Best-effort: failures are logged, never raised,
    /// because close runs during cleanup paths including error recovery.
    async fn close(&self, handle: &str);
}

/// Production gateway over JSON/HTTP POST
pub struct HttpKeyGateway {
    client: Client,
    base_url: Url,
}

impl HttpKeyGateway {
    /// Create a gateway for the given service base URL.
    ///
    /// The URL is snapshotted here; later configuration changes do not
    /// affect an existing gateway.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = transport::build_client(timeout)?;
        Ok(Self { client, base_url })
    }

    /// Resolve an endpoint-relative path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid endpoint '{}': {}", raw, e)))
    }

    async fn post(&self, path: &str, payload: serde_json::Value) -> Result<String> {
        let url = self.endpoint(path)?;
        transport::post_json(&self.client, url, &payload).await
    }

    /// The service base URL this gateway was built with
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl KeyGateway for HttpKeyGateway {
    async fn open(&self) -> Result<String> {
        let body = self.post(OPEN_PATH, json!({})).await?;
        let handle = transport::string_field(&body, "key_handle")?;
        debug!("Opened session, handle {}", handle);
        Ok(handle)
    }

    async fn confirm(&self, handle: &str) -> Result<()> {
        // Only the HTTP status matters here; the body carries no fields
        // the engine consumes.
        self.post(CONFIRM_PATH, json!({ "key_handle": handle })).await?;
        debug!("Session {} confirmed ready", handle);
        Ok(())
    }

    async fn fetch_key(&self, handle: &str) -> Result<Vec<u8>> {
        let body = self.post(KEY_PATH, json!({ "key_handle": handle })).await?;
        let key = transport::base64_field(&body, "key_buffer")?;
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        debug!("Fetched key block of {} bytes", key.len());
        Ok(key)
    }

    async fn close(&self, handle: &str) {
        match self.post(CLOSE_PATH, json!({ "key_handle": handle })).await {
            Ok(_) => debug!("Closed session {}", handle),
            Err(e) => warn!("Close of session {} failed (ignored): {}", handle, e),
        }
    }
}

/// Scripted gateway for exercising session/provider logic without a server.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays queued responses in order and records close calls.
    ///
    /// Unscripted opens and fetches fail with a protocol error; unscripted
    /// confirms succeed, since most scenarios don't care about them.
    #[derive(Default)]
    pub(crate) struct ScriptedGateway {
        opens: Mutex<VecDeque<Result<String>>>,
        confirms: Mutex<VecDeque<Result<()>>>,
        fetches: Mutex<VecDeque<Result<Vec<u8>>>>,
        fetch_calls: AtomicUsize,
        closed: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_open(self, result: Result<String>) -> Self {
            self.opens.lock().push_back(result);
            self
        }

        pub fn with_confirm(self, result: Result<()>) -> Self {
            self.confirms.lock().push_back(result);
            self
        }

        pub fn with_fetch(self, result: Result<Vec<u8>>) -> Self {
            self.fetches.lock().push_back(result);
            self
        }

        pub fn fetch_calls(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }

        pub fn closed_handles(&self) -> Vec<String> {
            self.closed.lock().clone()
        }
    }

    // Provider tests hold the script behind an Arc so they can assert on
    // call counts after handing the gateway over.
    #[async_trait]
    impl KeyGateway for std::sync::Arc<ScriptedGateway> {
        async fn open(&self) -> Result<String> {
            self.as_ref().open().await
        }

        async fn confirm(&self, handle: &str) -> Result<()> {
            self.as_ref().confirm(handle).await
        }

        async fn fetch_key(&self, handle: &str) -> Result<Vec<u8>> {
            self.as_ref().fetch_key(handle).await
        }

        async fn close(&self, handle: &str) {
            self.as_ref().close(handle).await
        }
    }

    #[async_trait]
    impl KeyGateway for ScriptedGateway {
        async fn open(&self) -> Result<String> {
            self.opens
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Protocol("unscripted open".to_string())))
        }

        async fn confirm(&self, _handle: &str) -> Result<()> {
            self.confirms.lock().pop_front().unwrap_or(Ok(()))
        }

        async fn fetch_key(&self, _handle: &str) -> Result<Vec<u8>> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.fetches
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Protocol("unscripted fetch".to_string())))
        }

        async fn close(&self, handle: &str) {
            self.closed.lock().push(handle.to_string());
        }
    }
}
