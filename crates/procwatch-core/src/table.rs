//! Declarative table state for the live process list.
//!
//! State transitions follow the `state + command -> state` pattern: the
//! reducer is the only code that computes the next `TableState`, and it is a
//! pure function so identical inputs always give identical outputs. The
//! ingestion path never touches table state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Process-list column a table can be sorted by.
///
/// Wire spelling is `snake_case`, matching the producer's field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Pid,
    ProcessPath,
    CpuUsage,
    Memory,
    DiskUsage,
}

impl SortKey {
    /// Wire name of this key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pid => "pid",
            Self::ProcessPath => "process_path",
            Self::CpuUsage => "cpu_usage",
            Self::Memory => "memory",
            Self::DiskUsage => "disk_usage",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = TableError;

    /// Decode a wire spelling. This is the one place an unknown sort key can
    /// surface; past this boundary the enum makes it unrepresentable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pid" => Ok(Self::Pid),
            "process_path" => Ok(Self::ProcessPath),
            "cpu_usage" => Ok(Self::CpuUsage),
            "memory" => Ok(Self::Memory),
            "disk_usage" => Ok(Self::DiskUsage),
            other => Err(TableError::UnknownSortKey(other.to_string())),
        }
    }
}

/// Sort direction, wire spelling `"asc"` / `"desc"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Sort/search/pagination configuration applied to the process list view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableState {
    pub sort_key: SortKey,
    pub direction: SortDirection,
    /// Free-text filter over process paths; empty matches everything.
    pub search: String,
    /// Zero-based page index.
    pub page: usize,
}

/// A discrete user command against the table state.
#[derive(Debug, Clone, PartialEq)]
pub enum TableCommand {
    /// Sort by a column; repeated on the current column it flips direction.
    SortBy(SortKey),
    /// Replace the search text (trimmed).
    SetSearch(String),
    /// Jump to a page. Signed because untyped boundaries can carry negative
    /// values; the reducer rejects them rather than clamping.
    SetPage(i64),
}

/// Command construction errors. Surfaced to the caller, never silently
/// clamped: both indicate a programming error upstream, not user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("page index {0} is negative")]
    InvalidPage(i64),
    #[error("unknown sort key {0:?}")]
    UnknownSortKey(String),
}

/// Compute the next table state for a command.
///
/// Pure: no clock, no randomness, no mutation of the input. On error the
/// caller's state is untouched (the input is borrowed, nothing is written).
///
/// # Errors
///
/// [`TableError::InvalidPage`] for `SetPage` with a negative index.
pub fn reduce(state: &TableState, command: &TableCommand) -> Result<TableState, TableError> {
    match command {
        TableCommand::SortBy(key) => Ok(if *key == state.sort_key {
            TableState {
                direction: state.direction.flipped(),
                ..state.clone()
            }
        } else {
            // Changing the sort dimension invalidates the user's positional
            // context, so the page resets; flipping direction does not.
            TableState {
                sort_key: *key,
                direction: SortDirection::Ascending,
                page: 0,
                ..state.clone()
            }
        }),
        TableCommand::SetSearch(text) => Ok(TableState {
            search: text.trim().to_string(),
            ..state.clone()
        }),
        TableCommand::SetPage(n) => {
            if *n < 0 {
                Err(TableError::InvalidPage(*n))
            } else {
                Ok(TableState {
                    page: *n as usize,
                    ..state.clone()
                })
            }
        }
    }
}
