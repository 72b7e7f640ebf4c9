//! Display formatting helpers for derived values.

/// Format `stat` as a percentage of `total` with exactly two decimals.
///
/// `get_percentage(33.0, 200.0)` is `"16.50%"`.
#[must_use]
pub fn get_percentage(stat: f64, total: f64) -> String {
    format!("{:.2}%", 100.0 * stat / total)
}

/// Render a byte quantity in the largest power-of-1000 unit that keeps the
/// value at or above 1, with exactly three decimals.
///
/// `get_storage_units(1_500_000_000.0)` is `"1.500 GB"`.
#[must_use]
pub fn get_storage_units(storage_in_bytes: f64) -> String {
    const UNITS: [(f64, &str); 4] = [
        (1e12, "TB"),
        (1e9, "GB"),
        (1e6, "MB"),
        (1e3, "KB"),
    ];
    for (threshold, unit) in UNITS {
        if storage_in_bytes >= threshold {
            return format!("{:.3} {unit}", storage_in_bytes / threshold);
        }
    }
    format!("{storage_in_bytes:.3} B")
}
