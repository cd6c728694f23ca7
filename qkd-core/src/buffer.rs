//! Key-block buffer with a partial-consumption cursor
//!
//! Holds the most recently fetched key block. Bytes before the cursor are
//! spent; bytes after it are available. The buffer is replaced wholesale on
//! each refill and never grows; the unit of refill is one fetched block.
//! Replaced or cleared key material is zeroized before release.

use crate::{Error, Result};
use zeroize::Zeroize;

/// Single-block key buffer, exclusively owned by the byte provider.
#[derive(Debug, Default)]
pub struct KeyBuffer {
    bytes: Vec<u8>,
    position: usize,
}

impl KeyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconsumed bytes left in the current block
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume up to `n` bytes from the current block.
    ///
    /// Returns `min(n, remaining())` bytes and advances the cursor. Pure
    /// in-memory slice; never blocks, never fetches.
    pub fn take(&mut self, n: usize) -> &[u8] {
        let count = n.min(self.remaining());
        let start = self.position;
        self.position += count;
        &self.bytes[start..start + count]
    }

    /// Replace the buffer contents with a freshly fetched block.
    ///
    /// Rejects an empty block and leaves the previous contents untouched in
    /// that case (all-or-nothing). On success the cursor resets to 0 and the
    /// replaced material is zeroized.
    pub fn refill(&mut self, block: Vec<u8>) -> Result<()> {
        if block.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.bytes.zeroize();
        self.bytes = block;
        self.position = 0;
        Ok(())
    }

    /// Zeroize and discard the current block.
    pub fn clear(&mut self) {
        self.bytes.zeroize();
        self.bytes = Vec::new();
        self.position = 0;
    }
}

impl Drop for KeyBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
