//! Call metrics
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! application installs a recorder; call [`register_metrics`] once after
//! installing one to attach descriptions.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `karman_calls_total` | counter | `endpoint` |
//! | `karman_call_failures_total` | counter | `endpoint`, `kind` |
//! | `karman_dispatch_duration_seconds` | histogram | `strategy` |

use metrics::{describe_counter, describe_histogram, Unit};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Calls started, per endpoint
pub const CALLS_TOTAL: &str = "karman_calls_total";

/// Calls that settled with an error, per endpoint and error kind
pub const CALL_FAILURES_TOTAL: &str = "karman_call_failures_total";

/// Time spent in strategy dispatch, per strategy
pub const DISPATCH_DURATION_SECONDS: &str = "karman_dispatch_duration_seconds";

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(CALLS_TOTAL, Unit::Count, "Total number of endpoint calls started");
    describe_counter!(
        CALL_FAILURES_TOTAL,
        Unit::Count,
        "Total number of endpoint calls that settled with an error"
    );
    describe_histogram!(
        DISPATCH_DURATION_SECONDS,
        Unit::Seconds,
        "Time spent waiting on strategy dispatch"
    );

    tracing::debug!("Karman metrics registered");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_without_recorder_is_harmless() {
        register_metrics();
        register_metrics();
    }
}
