//! Process view projection: the pure derivation of a display-ready row set
//! from the latest process list plus the current table state.
//!
//! Filter, then sort, then paginate. The projection never mutates its
//! inputs, so repeated calls on unchanged data return identical rows in
//! identical order.

use crate::snapshot::ProcessInfo;
use crate::table::{SortDirection, SortKey, TableState};
use std::cmp::Ordering;

/// Fixed number of rows per table page.
pub const PAGE_SIZE: usize = 15;

/// The exact slice to display plus the count pagination controls need.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Rows for the current page, in display order.
    pub rows: Vec<ProcessInfo>,
    /// Number of processes matching the filter, across all pages.
    pub total_matched: usize,
}

impl Projection {
    /// Number of pages the filtered set spans.
    #[must_use]
    pub const fn page_count(&self) -> usize {
        (self.total_matched + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

/// Project the latest process list through the current table state.
///
/// The search filter is a case-insensitive substring match on the process
/// path. Sorting is deterministic: equal keys tie-break by `pid` ascending
/// regardless of direction, so repeated renders never jitter row order. An
/// out-of-range page yields an empty row set rather than an error; callers
/// clamp using [`Projection::total_matched`].
#[must_use]
pub fn project(processes: &[ProcessInfo], state: &TableState) -> Projection {
    let needle = state.search.to_lowercase();
    let mut matched: Vec<&ProcessInfo> = processes
        .iter()
        .filter(|p| needle.is_empty() || p.path.to_lowercase().contains(&needle))
        .collect();

    matched.sort_by(|a, b| compare(a, b, state.sort_key, state.direction));

    let total_matched = matched.len();
    let start = state.page.saturating_mul(PAGE_SIZE);
    let rows = if start >= total_matched {
        Vec::new()
    } else {
        let end = (start + PAGE_SIZE).min(total_matched);
        matched[start..end].iter().map(|p| (*p).clone()).collect()
    };

    Projection {
        rows,
        total_matched,
    }
}

fn compare(a: &ProcessInfo, b: &ProcessInfo, key: SortKey, direction: SortDirection) -> Ordering {
    let by_key = match key {
        SortKey::Pid => a.pid.cmp(&b.pid),
        SortKey::ProcessPath => a.path.cmp(&b.path),
        SortKey::CpuUsage => a.cpu_percent.total_cmp(&b.cpu_percent),
        SortKey::Memory => a.memory_bytes.cmp(&b.memory_bytes),
        SortKey::DiskUsage => a.disk_bytes.cmp(&b.disk_bytes),
    };
    let directed = match direction {
        SortDirection::Ascending => by_key,
        SortDirection::Descending => by_key.reverse(),
    };
    // The tie-break stays ascending in both directions so flipping the sort
    // never reorders rows with equal keys.
    directed.then_with(|| a.pid.cmp(&b.pid))
}
