// SPDX-License-Identifier: MIT
//
// QKD Entropy Engine
// Quantum key material as a random-byte source

//! QKD Entropy Engine Core Library
//!
//! This crate turns a remote QKD key-management service into a stream of
//! unpredictable bytes suitable for use as an RNG backend. It implements the
//! classical-side session lifecycle against the service (open, blocking
//! readiness confirmation, key-block fetch, best-effort close) and serves
//! arbitrary-length byte requests out of buffered key blocks.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `transport`: HTTP POST exchange and response field extraction
//! - `gateway`: the four session operations against the remote service
//! - `session`: session state machine (disconnected / open / closed)
//! - `buffer`: key-block buffer with partial-consumption cursor
//! - `provider`: the pull/refill loop satisfying byte requests
//! - `engine`: the host-facing surface (configure / random_bytes / status)
//! - `config`: configuration with validation and env loading
//! - `retry`: opt-in bounded retry for callers
//! - `metrics`: counters for fetches and served requests
//! - `error`: unified error types
//!
//! # Design Principles
//!
//! 1. **Owned state**: no process-wide globals; every engine instance carries
//!    its own session and buffer
//! 2. **Testability**: the gateway is a trait, so the provisioning loop is
//!    exercised with injected fixtures instead of live network calls
//! 3. **Explicit failure**: partial byte production is reported, never
//!    silently passed off as success
//! 4. **Hygiene**: discarded key material is zeroized

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod provider;
pub mod retry;
pub mod session;
pub mod transport;

pub use buffer::KeyBuffer;
pub use config::EngineConfig;
pub use engine::QkdEngine;
pub use error::{Error, Result};
pub use gateway::{HttpKeyGateway, KeyGateway};
pub use metrics::{Metrics, MetricsSnapshot};
pub use provider::{KeyProvider, Outcome, Provided};
pub use retry::RetryPolicy;
pub use session::{Session, SessionState};

/// Library version, reported in the HTTP user agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-request HTTP timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
