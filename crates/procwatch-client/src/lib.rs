//! Connection session for the procwatch streaming state engine.
//!
//! Pairs the pure core (`procwatch-core`) with a lifecycle-managed session:
//! inbound frames flow through the snapshot codec into the history buffers
//! and the latest-snapshot slot, user commands flow through the table
//! reducer, and the optional bidirectional variant pushes table
//! configuration frames back to the peer.

mod error;
mod session;
mod wire;

pub use error::{SessionError, TransportError};
pub use session::{ConnectionState, MonitorSession, SessionConfig, Transport};
pub use wire::TableConfig;
