// SPDX-License-Identifier: MIT
//
// QKD Entropy Engine
// Quantum key material as a random-byte source

//! Host-facing engine surface
//!
//! `QkdEngine` is what an RNG host (an OpenSSL-engine-style shim, a CLI, an
//! application) talks to: configure the service URL, ask for random bytes,
//! query status, clean up. The engine owns one provider and serializes byte
//! requests behind an async mutex, so a shared engine is safe; independent
//! consumers should simply hold independent engines.

use crate::provider::{KeyProvider, Outcome};
use crate::metrics::MetricsSnapshot;
use crate::{Error, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use url::Url;
use zeroize::Zeroize;

/// Configure option: the key service base URL
pub const OPT_SERVICE_URL: &str = "SERVICE_URL";
/// Configure option: per-request HTTP timeout in milliseconds
pub const OPT_REQUEST_TIMEOUT_MS: &str = "REQUEST_TIMEOUT_MS";

struct EngineState {
    service_url: Option<Url>,
    request_timeout: Duration,
    provider: Option<KeyProvider>,
}

/// Entropy engine backed by a remote QKD key service.
///
/// Connects lazily: the session is opened on the first byte request, not at
/// configuration time. The service URL is snapshotted into the provider's
/// gateway when the session is first needed, so reconfiguring the URL
/// affects the next session, never an already-open one.
pub struct QkdEngine {
    state: Mutex<EngineState>,
}

impl Default for QkdEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QkdEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState {
                service_url: None,
                request_timeout: Duration::from_millis(crate::DEFAULT_REQUEST_TIMEOUT_MS),
                provider: None,
            }),
        }
    }

    /// Set a named engine option.
    pub async fn configure(&self, option: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        match option {
            OPT_SERVICE_URL => {
                let url = Url::parse(value)
                    .map_err(|e| Error::Config(format!("Invalid service URL '{}': {}", value, e)))?;
                info!("Service URL set to {}", url);
                state.service_url = Some(url);
                Ok(())
            }
            OPT_REQUEST_TIMEOUT_MS => {
                let ms: u64 = value.parse().map_err(|_| {
                    Error::Config(format!("Invalid timeout '{}': expected milliseconds", value))
                })?;
                if ms == 0 {
                    return Err(Error::Config("Timeout must be > 0".to_string()));
                }
                state.request_timeout = Duration::from_millis(ms);
                Ok(())
            }
            other => Err(Error::Config(format!("Unknown option '{}'", other))),
        }
    }

    /// Fill `buf` entirely with key-service bytes.
    ///
    /// Strict all-or-nothing: on any failure nothing is written to `buf`,
    /// internally produced partial material is zeroized and discarded, and
    /// the underlying cause is returned. The caller's buffer can be trusted
    /// exactly when this returns `Ok`.
    pub async fn random_bytes(&self, buf: &mut [u8]) -> Result<()> {
        let mut state = self.state.lock().await;

        if state.provider.is_none() {
            let url = state
                .service_url
                .clone()
                .ok_or_else(|| Error::Config("SERVICE_URL is not set".to_string()))?;
            let timeout = state.request_timeout;
            state.provider = Some(KeyProvider::from_url(url, timeout)?);
        }
        let Some(provider) = state.provider.as_mut() else {
            return Err(Error::NotConnected);
        };

        let mut provided = provider.provide(buf.len()).await?;
        match provided.outcome {
            Outcome::Complete => {
                buf.copy_from_slice(&provided.bytes);
                provided.bytes.zeroize();
                Ok(())
            }
            Outcome::Partial(cause) => {
                provided.bytes.zeroize();
                Err(cause)
            }
        }
    }

    /// Whether the engine is ready to serve requests (endpoint configured).
    ///
    /// Deliberately does not require an open session: the engine connects
    /// lazily, so a freshly configured engine is operational before its
    /// first request.
    pub async fn status(&self) -> bool {
        self.state.lock().await.service_url.is_some()
    }

    /// Accepted and ignored: this engine is an entropy source, not a sink.
    pub fn seed(&self, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    /// Accepted and ignored: this engine is an entropy source, not a sink.
    pub fn add_entropy(&self, _data: &[u8], _entropy_estimate: f64) -> Result<()> {
        Ok(())
    }

    /// Close the session and release buffered key material. Idempotent; the
    /// configured URL survives, so the engine can reconnect later.
    pub async fn cleanup(&self) {
        let mut state = self.state.lock().await;
        if let Some(mut provider) = state.provider.take() {
            info!("Engine cleanup: closing session");
            provider.shutdown().await;
        }
    }

    /// Counters from the current provider; `None` before the first request.
    pub async fn metrics(&self) -> Option<MetricsSnapshot> {
        self.state
            .lock()
            .await
            .provider
            .as_ref()
            .map(|p| p.metrics())
    }

    #[cfg(test)]
    pub(crate) async fn inject_provider(&self, provider: KeyProvider) {
        self.state.lock().await.provider = Some(provider);
    }
}
