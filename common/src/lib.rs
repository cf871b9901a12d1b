pub mod chart;
pub mod config;
pub mod error;
pub mod plot;
pub mod util;

/// Nanoseconds per millisecond, for latencies stored in ns.
pub const NS_PER_MS: f64 = 1_000_000.0;
