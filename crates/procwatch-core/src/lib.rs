//! Core types for the procwatch streaming state engine.
//!
//! This crate holds the pure half of the client: everything here is
//! deterministic and side-effect free, so the connection layer can apply it
//! under a single lock and tests can drive it without a transport.
//!
//! - Snapshot codec: [`decode_snapshot`] and the validated domain types
//! - Circular history buffers: [`RingBuffer`], [`HistorySample`]
//! - Table state machine: [`TableState`], [`reduce`]
//! - Process view projection: [`project`], [`Projection`]
//! - Display formatting: [`get_percentage`], [`get_storage_units`]

mod format;
mod history;
mod project;
mod snapshot;
mod table;

pub use format::{get_percentage, get_storage_units};
pub use history::{HistorySample, InvalidCapacity, RingBuffer};
pub use project::{project, Projection, PAGE_SIZE};
pub use snapshot::{
    decode_snapshot, DecodeError, DeviceInfo, ProcessInfo, SystemSnapshot, TotalsInfo,
    WIRE_TIME_FORMAT,
};
pub use table::{reduce, SortDirection, SortKey, TableCommand, TableError, TableState};
