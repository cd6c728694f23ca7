// SPDX-License-Identifier: MIT
//
// QKD Entropy Engine
// Quantum key material as a random-byte source

//! Byte provider: the pull/refill loop over buffered key blocks
//!
//! A byte request connects on demand, then drains the key buffer, refilling
//! it through the gateway whenever exhausted, until the request is satisfied
//! or a fetch fails. There is no upper bound on the number of fetch
//! round-trips per request other than the ratio of requested bytes to the
//! service's block size, and no internal retry: a failed fetch terminates
//! the request immediately.

use crate::buffer::KeyBuffer;
use crate::gateway::{HttpKeyGateway, KeyGateway};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::session::Session;
use crate::{Error, Result};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// How a byte request ended
#[derive(Debug)]
pub enum Outcome {
    /// The full requested length was produced
    Complete,
    /// Some bytes were produced before a fetch failed; the cause is carried
    Partial(Error),
}

/// Result of a byte request: the produced bytes and how the request ended.
///
/// `bytes.len()` never exceeds the requested length, and equals it exactly
/// when the outcome is `Complete`.
#[derive(Debug)]
pub struct Provided {
    pub bytes: Vec<u8>,
    pub outcome: Outcome,
}

impl Provided {
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, Outcome::Complete)
    }
}

/// Serves arbitrary-length byte requests out of fetched key blocks.
///
/// Owns its session and buffer outright; give each logical consumer its own
/// instance. The gateway snapshots the service endpoint at construction, so
/// configuration changes elsewhere never affect a live provider.
pub struct KeyProvider {
    gateway: Box<dyn KeyGateway>,
    session: Session,
    buffer: KeyBuffer,
    metrics: Metrics,
}

impl KeyProvider {
    pub fn new(gateway: Box<dyn KeyGateway>) -> Self {
        Self {
            gateway,
            session: Session::new(),
            buffer: KeyBuffer::new(),
            metrics: Metrics::new(),
        }
    }

    /// Convenience constructor over the production HTTP gateway.
    pub fn from_url(service_url: Url, timeout: Duration) -> Result<Self> {
        let gateway = HttpKeyGateway::new(service_url, timeout)?;
        Ok(Self::new(Box::new(gateway)))
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Produce up to `n` bytes of key material.
    ///
    /// Opens the session on demand (including the readiness confirmation).
    /// A failure before any byte is produced is an `Err`; a failure after
    /// some bytes were produced returns them with `Outcome::Partial` and it
    /// is the caller's decision whether that satisfies the request. A fetch
    /// failure leaves the session open; the handle stays valid for a later
    /// attempt.
    pub async fn provide(&mut self, n: usize) -> Result<Provided> {
        let started = Instant::now();

        if !self.session.is_open() {
            debug!("No open session, connecting before serving {} bytes", n);
            if let Err(e) = self.session.open(self.gateway.as_ref()).await {
                self.metrics.record_request_failure();
                return Err(e);
            }
            self.metrics.record_session_open();
        }

        let mut out = Vec::with_capacity(n);

        while out.len() < n {
            if self.buffer.is_exhausted() {
                if let Err(e) = self.refill().await {
                    if out.is_empty() {
                        self.metrics.record_request_failure();
                        return Err(e);
                    }
                    warn!(
                        "Fetch failed after {} of {} bytes were produced: {}",
                        out.len(),
                        n,
                        e
                    );
                    self.metrics.record_request_failure();
                    return Ok(Provided {
                        bytes: out,
                        outcome: Outcome::Partial(e),
                    });
                }
            }

            let chunk = self.buffer.take(n - out.len());
            out.extend_from_slice(chunk);
        }

        self.metrics
            .record_request(n, started.elapsed().as_micros() as u64);
        Ok(Provided {
            bytes: out,
            outcome: Outcome::Complete,
        })
    }

    /// Fetch one key block and load it into the buffer.
    async fn refill(&mut self) -> Result<()> {
        let handle = self.session.handle()?.to_owned();
        match self.gateway.fetch_key(&handle).await {
            Ok(block) => {
                self.metrics.record_fetch(block.len());
                self.buffer.refill(block)
            }
            Err(e) => {
                self.metrics.record_fetch_failure();
                Err(e)
            }
        }
    }

    /// Close the session (best-effort) and discard buffered key material.
    /// Idempotent.
    pub async fn shutdown(&mut self) {
        self.session.close(self.gateway.as_ref()).await;
        self.buffer.clear();
    }
}
