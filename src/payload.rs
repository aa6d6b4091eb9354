//! Process-wide random payload served by the streaming endpoint.
//!
//! # Responsibilities
//! - Generate `MAX_CHUNK_SIZE` bytes of random data once at startup
//! - Hand out zero-copy prefixes for every streamed chunk
//!
//! # Design Decisions
//! - Backed by `Bytes`: cloning shares the buffer, nothing can mutate it
//! - Random source failure is fatal; there is no degraded mode

use axum::body::Bytes;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Largest chunk a single `/stream1` request may ask for (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 << 20;

/// Chunk size used when the request does not name one (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Number of chunks used when the request does not name one.
pub const DEFAULT_COUNT: usize = 10;

/// Errors raised while building the payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The operating system random source could not be read.
    #[error("secure random source unavailable: {0}")]
    Entropy(#[from] rand::Error),
}

/// Immutable random buffer shared by all requests.
#[derive(Clone)]
pub struct StaticPayload {
    data: Bytes,
}

impl StaticPayload {
    /// Fill a `MAX_CHUNK_SIZE` buffer from the OS random source.
    pub fn generate() -> Result<Self, PayloadError> {
        let mut buf = vec![0u8; MAX_CHUNK_SIZE];
        OsRng.try_fill_bytes(&mut buf)?;

        tracing::debug!(bytes = buf.len(), "Static payload generated");

        Ok(Self {
            data: Bytes::from(buf),
        })
    }

    /// Return the first `len` bytes of the payload.
    ///
    /// `len` is capped at the buffer length, so callers that clamp to
    /// `MAX_CHUNK_SIZE` always get exactly `len` bytes.
    pub fn prefix(&self, len: usize) -> Bytes {
        self.data.slice(..len.min(self.data.len()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for StaticPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticPayload")
            .field("len", &self.data.len())
            .finish()
    }
}
