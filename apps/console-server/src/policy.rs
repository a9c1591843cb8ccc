// [[AGENTDECK]]/apps/console-server/src/policy.rs
// Purpose: Canonical thresholds and window sizes for dashboard health signals.
// Architecture: Domain Policy Layer
// Dependencies: none

/// Average or tail latency at or above this is flagged for attention.
pub const LATENCY_ATTENTION_SECS: f64 = 10.0;
/// Latency at or above this is critical.
pub const LATENCY_CRITICAL_SECS: f64 = 25.0;

pub const ERROR_RATE_WARNING_PCT: f64 = 10.0;
pub const ERROR_RATE_BAD_PCT: f64 = 20.0;

pub const SUCCESS_RATE_GOOD_PCT: f64 = 90.0;
pub const SUCCESS_RATE_WARNING_PCT: f64 = 80.0;

/// Samples per trend window; the previous window has the same size.
pub const TREND_WINDOW: usize = 10;

/// Durations plotted in the latency sparkline.
pub const SPARKLINE_POINTS: usize = 20;

pub const RECENT_ERRORS_LIMIT: usize = 3;

/// How many runs are requested from `/dashboard/last-runs`.
pub const LAST_RUNS_LIMIT: usize = 20;

/// Characters of an agent id kept when no display name is known.
pub const AGENT_ID_PREFIX_LEN: usize = 8;

pub const UNKNOWN_ERROR_CATEGORY: &str = "Unknown";
pub const MISSING_ERROR_DETAILS: &str = "No details available";
pub const UNKNOWN_MODEL: &str = "unknown";
