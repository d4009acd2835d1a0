//! Fairness arithmetic shared by the vtime-based policies.

use chrono::Utc;

/// `a - b`, clamped to 0 when `b > a`.
pub fn saturating_sub(a: u64, b: u64) -> u64 {
    a.saturating_sub(b)
}

/// Zero is reserved for "uninitialized"; keys and clocks use 1 instead.
pub fn non_zero(v: u64) -> u64 {
    if v == 0 { 1 } else { v }
}

/// Exponentially weighted moving average with a 1/4 weight for the new sample.
pub fn calc_avg(old: u64, new: u64) -> u64 {
    (old - (old >> 2)) + (new >> 2)
}

/// Wall-clock time in nanoseconds since the unix epoch.
pub fn now_ns() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map(|ns| ns.max(0) as u64)
        .unwrap_or(0)
}
