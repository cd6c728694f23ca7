// SPDX-License-Identifier: MIT
//
// QKD Entropy Engine
// Quantum key material as a random-byte source

//! QKD CLI - fetch random bytes from a QKD key service
//!
//! Small diagnostic tool over the engine: configures the endpoint, requests
//! N bytes (with bounded retries on transport failures), prints them encoded
//! to stdout, and tears the session down.

use anyhow::{bail, Context, Result};
use clap::Parser;
use qkd_core::{engine, EngineConfig, QkdEngine};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "qkd-cli")]
#[command(about = "Fetch random bytes backed by QKD key material", long_about = None)]
struct Args {
    /// Base URL of the QKD key service (falls back to QKD_SERVICE_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Number of bytes to request
    #[arg(short = 'n', long, default_value_t = 32)]
    bytes: usize,

    /// Output encoding (hex, base64)
    #[arg(short, long, default_value = "hex")]
    encoding: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

/// Output encoding for fetched bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputEncoding {
    Hex,
    Base64,
}

impl OutputEncoding {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hex" | "hexadecimal" => Some(Self::Hex),
            "base64" | "b64" => Some(Self::Base64),
            _ => None,
        }
    }

    fn encode(&self, data: &[u8]) -> String {
        use base64::Engine as _;
        match self {
            Self::Hex => hex::encode(data),
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(data),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let Some(encoding) = OutputEncoding::parse(&args.encoding) else {
        bail!("Unknown encoding '{}', expected hex or base64", args.encoding);
    };

    // Explicit --url wins; otherwise the QKD_-prefixed environment supplies
    // the endpoint along with timeout and retry tuning.
    let config = match args.url {
        Some(url) => EngineConfig::new(url),
        None => EngineConfig::from_env()
            .context("No --url given and QKD_SERVICE_URL is not set")?,
    };
    config.validate().context("Invalid configuration")?;

    info!("QKD CLI v{}", env!("CARGO_PKG_VERSION"));
    info!("Key service: {}", config.service_url);

    let qkd = QkdEngine::new();
    qkd.configure(engine::OPT_SERVICE_URL, &config.service_url)
        .await
        .context("Failed to configure service URL")?;
    qkd.configure(
        engine::OPT_REQUEST_TIMEOUT_MS,
        &config.request_timeout_ms.to_string(),
    )
    .await
    .context("Failed to configure request timeout")?;

    // The engine never retries internally; transient transport failures are
    // retried here, at the caller level.
    let policy = config.retry_policy();
    let n = args.bytes;
    let engine_ref = &qkd;
    let bytes = policy
        .execute(move || async move {
            let mut buf = vec![0u8; n];
            engine_ref.random_bytes(&mut buf).await?;
            Ok(buf)
        })
        .await
        .context("Failed to fetch random bytes")?;

    println!("{}", encoding.encode(&bytes));

    if let Some(snap) = qkd.metrics().await {
        info!(
            "Served {} bytes over {} fetch round-trip(s), {} session(s) opened",
            snap.bytes_served, snap.fetches_total, snap.sessions_opened
        );
    }

    qkd.cleanup().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_parse() {
        assert_eq!(OutputEncoding::parse("hex"), Some(OutputEncoding::Hex));
        assert_eq!(OutputEncoding::parse("HEX"), Some(OutputEncoding::Hex));
        assert_eq!(OutputEncoding::parse("b64"), Some(OutputEncoding::Base64));
        assert_eq!(OutputEncoding::parse("binary"), None);
    }

    #[test]
    fn test_encoding_output() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(OutputEncoding::Hex.encode(&data), "deadbeef");
        assert_eq!(OutputEncoding::Base64.encode(&data), "3q2+7w==");
    }
}
