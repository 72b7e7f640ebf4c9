//! Snapshot codec: decoding and validation of inbound telemetry frames.
//!
//! The telemetry producer sends one JSON object per frame. [`decode_snapshot`]
//! turns a raw text frame into a validated [`SystemSnapshot`] or fails with a
//! [`DecodeError`]; callers drop the frame on failure and keep prior state.
//! Decoding is pure: no side effects, no partial results.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Timestamp format used by the telemetry producer for `date_time` fields.
pub const WIRE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One complete, point-in-time telemetry payload.
///
/// Immutable after construction; each inbound frame supersedes the previous
/// snapshot wholesale (no field-level merge).
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    /// When the producer captured this snapshot.
    pub captured_at: NaiveDateTime,
    /// Static host identification.
    pub device: DeviceInfo,
    /// Aggregate CPU/memory figures.
    pub totals: TotalsInfo,
    /// Per-process metrics, in producer order.
    pub processes: Vec<ProcessInfo>,
}

/// Host identification. Static per session, but may arrive on every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub architecture: String,
    pub name: String,
    pub distro: String,
    pub platform: String,
}

/// Aggregate system figures for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsInfo {
    /// Logical core count as reported by the producer (may be 0 when unknown).
    pub cores: usize,
    pub total_memory_bytes: u64,
    /// Always `<= total_memory_bytes`; enforced at decode time.
    pub used_memory_bytes: u64,
    /// Aggregate CPU percentage; may exceed 100 up to `100 * cores`.
    pub global_cpu_percent: f64,
}

impl TotalsInfo {
    /// Memory usage as a percentage of total, rounded to two decimals.
    ///
    /// Returns 0.0 when the producer reports zero total memory.
    #[must_use]
    pub fn memory_percent(&self) -> f64 {
        if self.total_memory_bytes == 0 {
            return 0.0;
        }
        let pct = self.used_memory_bytes as f64 / self.total_memory_bytes as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }
}

/// Metrics for a single process within one snapshot.
///
/// `pid` is the row-identity key across renders. It is unique within a
/// snapshot but not necessarily stable across OS process restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub path: String,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

/// A frame that failed decoding or domain validation.
///
/// Non-fatal: the caller discards the frame and keeps accumulated state.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not well-formed JSON, or a required field is missing or mistyped.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    /// `date_time` did not match [`WIRE_TIME_FORMAT`].
    #[error("unparseable date_time {value:?}")]
    BadTimestamp {
        /// The offending timestamp text.
        value: String,
    },
    /// `used_memory` exceeded `total_memory`.
    #[error("used_memory {used} exceeds total_memory {total}")]
    MemoryExceedsTotal { used: u64, total: u64 },
    /// `global_cpu_usage` outside `0..=100 * cores`.
    #[error("global_cpu_usage {value} out of range for {cores} cores")]
    CpuOutOfRange { value: f64, cores: usize },
    /// A process reported negative CPU usage.
    #[error("negative cpu_usage {value} for pid {pid}")]
    NegativeProcessCpu { pid: u32, value: f64 },
    /// The same pid appeared twice in one frame.
    #[error("duplicate pid {pid} in frame")]
    DuplicatePid { pid: u32 },
}

// Wire layout, field names exactly as the producer serializes them.
// Later protocol revisions add optional fields (cpu_usage_buffer,
// memory_usage_buffer, table_config, total_processes); this client derives
// history locally, so serde's default unknown-field handling drops them.

#[derive(Deserialize)]
struct WireMessage {
    date_time: String,
    device_details: WireDevice,
    total_system_data: WireTotals,
    processes_data: Vec<WireProcess>,
}

#[derive(Deserialize)]
struct WireDevice {
    architecture: String,
    name: String,
    distro: String,
    platform: String,
}

#[derive(Deserialize)]
struct WireTotals {
    cores: usize,
    total_memory: u64,
    used_memory: u64,
    global_cpu_usage: f64,
}

#[derive(Deserialize)]
struct WireProcess {
    pid: u32,
    process_path: String,
    cpu_usage: f64,
    memory: u64,
    disk_usage: u64,
}

/// Decode and validate one raw inbound frame.
///
/// # Errors
///
/// Returns [`DecodeError`] when the payload is not well-formed JSON, a
/// required field is missing, or a field fails its domain constraint.
pub fn decode_snapshot(raw: &str) -> Result<SystemSnapshot, DecodeError> {
    let wire: WireMessage = serde_json::from_str(raw)?;

    let captured_at = NaiveDateTime::parse_from_str(&wire.date_time, WIRE_TIME_FORMAT)
        .map_err(|_| DecodeError::BadTimestamp {
            value: wire.date_time.clone(),
        })?;

    let totals = validate_totals(&wire.total_system_data)?;
    let processes = validate_processes(wire.processes_data)?;

    Ok(SystemSnapshot {
        captured_at,
        device: DeviceInfo {
            architecture: wire.device_details.architecture,
            name: wire.device_details.name,
            distro: wire.device_details.distro,
            platform: wire.device_details.platform,
        },
        totals,
        processes,
    })
}

fn validate_totals(wire: &WireTotals) -> Result<TotalsInfo, DecodeError> {
    if wire.used_memory > wire.total_memory {
        return Err(DecodeError::MemoryExceedsTotal {
            used: wire.used_memory,
            total: wire.total_memory,
        });
    }

    // Aggregate CPU may exceed 100% on multi-core hosts, bounded by
    // 100 * cores. When cores is reported as 0 only the lower bound holds.
    let out_of_range = if wire.cores == 0 {
        wire.global_cpu_usage < 0.0
    } else {
        wire.global_cpu_usage < 0.0 || wire.global_cpu_usage > 100.0 * wire.cores as f64
    };
    if out_of_range || wire.global_cpu_usage.is_nan() {
        return Err(DecodeError::CpuOutOfRange {
            value: wire.global_cpu_usage,
            cores: wire.cores,
        });
    }

    Ok(TotalsInfo {
        cores: wire.cores,
        total_memory_bytes: wire.total_memory,
        used_memory_bytes: wire.used_memory,
        global_cpu_percent: wire.global_cpu_usage,
    })
}

fn validate_processes(wire: Vec<WireProcess>) -> Result<Vec<ProcessInfo>, DecodeError> {
    let mut seen = HashSet::with_capacity(wire.len());
    let mut processes = Vec::with_capacity(wire.len());

    for p in wire {
        if !seen.insert(p.pid) {
            return Err(DecodeError::DuplicatePid { pid: p.pid });
        }
        if p.cpu_usage < 0.0 || p.cpu_usage.is_nan() {
            return Err(DecodeError::NegativeProcessCpu {
                pid: p.pid,
                value: p.cpu_usage,
            });
        }
        processes.push(ProcessInfo {
            pid: p.pid,
            path: p.process_path,
            cpu_percent: p.cpu_usage,
            memory_bytes: p.memory,
            disk_bytes: p.disk_usage,
        });
    }

    Ok(processes)
}
