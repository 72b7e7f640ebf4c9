//! Error types for the connection session.

use chrono::NaiveDateTime;
use procwatch_core::{DecodeError, TableError};
use thiserror::Error;

/// Failure reported by the transport implementation (send or close).
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced by [`MonitorSession`](crate::MonitorSession) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An inbound frame failed decoding or validation. The frame is dropped
    /// and accumulated state is untouched.
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] DecodeError),

    /// An inbound frame's capture time precedes the latest snapshot's.
    /// History buffers stay strictly time-ordered, so the frame is dropped.
    #[error("frame captured at {frame} precedes latest snapshot at {latest}")]
    OutOfOrder {
        frame: NaiveDateTime,
        latest: NaiveDateTime,
    },

    /// A table command was rejected by the reducer.
    #[error(transparent)]
    Table(#[from] TableError),

    /// The transport failed; the session has transitioned to disconnected
    /// with last-known state retained.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame ingestion was attempted while the session is not connected.
    #[error("session is not connected")]
    NotConnected,
}
