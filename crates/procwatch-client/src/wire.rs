//! Outbound wire messages for the bidirectional protocol variant.

use procwatch_core::{SortDirection, SortKey, TableState};
use serde::{Deserialize, Serialize};

/// Table configuration as sent to the peer: one JSON text frame whenever the
/// reducer produces a new state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub order_by: SortKey,
    pub order: SortDirection,
    pub page: usize,
    /// Search text; omitted entirely when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TableConfig {
    /// Encode as a single text frame.
    #[must_use]
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).expect("table config serializes")
    }
}

impl From<&TableState> for TableConfig {
    fn from(state: &TableState) -> Self {
        Self {
            order_by: state.sort_key,
            order: state.direction,
            page: state.page,
            search: if state.search.is_empty() {
                None
            } else {
                Some(state.search.clone())
            },
        }
    }
}
