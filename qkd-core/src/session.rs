//! Session state machine for the remote key service
//!
//! A session is the logical connection to the service, identified by an
//! opaque handle. Opening is a two-step protocol: obtain a handle, then a
//! second blocking round-trip confirms the peer side is ready. Only a
//! confirmed session is `Open`.

use crate::gateway::KeyGateway;
use crate::{Error, Result};
use tracing::{info, warn};

/// Lifecycle states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never opened
    Disconnected,
    /// Handle assigned and readiness confirmed
    Open,
    /// Explicitly closed; may be reopened with a fresh handle
    Closed,
}

/// Finite-state session tracker.
///
/// Invariant: a handle is held if and only if the state is `Open`.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    handle: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            handle: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// The current handle, available only while `Open`.
    pub fn handle(&self) -> Result<&str> {
        self.handle.as_deref().ok_or(Error::NotConnected)
    }

    /// Run the open protocol: obtain a handle, then confirm readiness.
    ///
    /// If confirmation fails, the just-received handle is released with a
    /// best-effort close and the confirmation failure is reported; a close
    /// failure never masks it. On any failure the state is unchanged and no
    /// partial handle is retained.
    pub async fn open(&mut self, gateway: &dyn KeyGateway) -> Result<()> {
        if self.is_open() {
            warn!("Session already open, ignoring redundant open");
            return Ok(());
        }

        let handle = gateway.open().await?;

        if let Err(e) = gateway.confirm(&handle).await {
            warn!("Session confirmation failed, releasing handle {}", handle);
            gateway.close(&handle).await;
            return Err(e);
        }

        info!("Session open, handle {}", handle);
        self.handle = Some(handle);
        self.state = SessionState::Open;
        Ok(())
    }

    /// Close the session (best-effort). No-op unless `Open`.
    pub async fn close(&mut self, gateway: &dyn KeyGateway) {
        if let Some(handle) = self.handle.take() {
            info!("Closing session {}", handle);
            gateway.close(&handle).await;
            self.state = SessionState::Closed;
        }
    }
}
