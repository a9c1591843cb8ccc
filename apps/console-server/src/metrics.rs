// [[AGENTDECK]]/apps/console-server/src/metrics.rs
// Purpose: Derives the dashboard view model from raw telemetry. Pure, no I/O.
// Architecture: Domain Logic Layer
// Dependencies: Models, Policy, Names, Chrono

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::format::time_ago;
use crate::models::*;
use crate::names::AgentNameLookup;
use crate::policy::*;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LatencyHealth {
    Healthy,
    Attention,
    Critical,
    Unclassified,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateTier {
    Good,
    Warning,
    Bad,
}

pub fn classify_latency(ms: Option<f64>) -> LatencyHealth {
    let Some(ms) = ms.filter(|v| v.is_finite()) else {
        return LatencyHealth::Unclassified;
    };
    let secs = ms / 1000.0;
    if secs < LATENCY_ATTENTION_SECS {
        LatencyHealth::Healthy
    } else if secs < LATENCY_CRITICAL_SECS {
        LatencyHealth::Attention
    } else {
        LatencyHealth::Critical
    }
}

/// Missing data is never reported healthy.
pub fn classify_error_rate(pct: Option<f64>) -> RateTier {
    match pct.filter(|v| v.is_finite()) {
        Some(v) if v < ERROR_RATE_WARNING_PCT => RateTier::Good,
        Some(v) if v < ERROR_RATE_BAD_PCT => RateTier::Warning,
        _ => RateTier::Bad,
    }
}

pub fn classify_success_rate(pct: Option<f64>) -> RateTier {
    match pct.filter(|v| v.is_finite()) {
        Some(v) if v >= SUCCESS_RATE_GOOD_PCT => RateTier::Good,
        Some(v) if v >= SUCCESS_RATE_WARNING_PCT => RateTier::Warning,
        _ => RateTier::Bad,
    }
}

/// `None` when there are no runs. Not clamped: errors above runs yield a negative rate.
pub fn success_rate(totals: &OverviewTotals) -> Option<f64> {
    let runs = totals.runs_total.unwrap_or(0);
    let errors = totals.errors_total.unwrap_or(0);
    if runs == 0 {
        return None;
    }
    Some((runs as f64 - errors as f64) / runs as f64 * 100.0)
}

/// Backend-reported rate when present, else derived from the counts.
pub fn error_rate(reported: Option<f64>, runs: u64, errors: u64) -> Option<f64> {
    reported.filter(|v| v.is_finite()).or_else(|| {
        if runs == 0 {
            None
        } else {
            Some(errors as f64 / runs as f64 * 100.0)
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// Sorts ascending by time and returns (previous, recent) windows of `window` samples each.
/// Both windows must be full.
fn split_windows(samples: &[Sample], window: usize) -> Option<(Vec<Sample>, Vec<Sample>)> {
    if window == 0 || samples.len() < window * 2 {
        return None;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by_key(|s| s.at);

    let n = sorted.len();
    let recent = sorted[n - window..].to_vec();
    let previous = sorted[n - 2 * window..n - window].to_vec();
    Some((previous, recent))
}

fn positive_mean(samples: &[Sample]) -> Option<f64> {
    let values: Vec<f64> = samples
        .iter()
        .map(|s| s.value)
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Signed percentage change of the recent window mean over the previous window mean.
pub fn compute_trend(samples: &[Sample], window: usize) -> Option<f64> {
    let (previous, recent) = split_windows(samples, window)?;
    let recent_mean = positive_mean(&recent)?;
    let previous_mean = positive_mean(&previous)?;
    if previous_mean == 0.0 {
        return None;
    }
    Some((recent_mean - previous_mean) / previous_mean * 100.0)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Trend {
    pub delta_pct: Option<f64>,
    pub higher_is_better: bool,
    /// `None` when the delta is undefined.
    pub favorable: Option<bool>,
}

impl Trend {
    pub fn new(delta_pct: Option<f64>, higher_is_better: bool) -> Self {
        let favorable = delta_pct.map(|d| if higher_is_better { d >= 0.0 } else { d <= 0.0 });
        Self {
            delta_pct,
            higher_is_better,
            favorable,
        }
    }
}

/// Run durations keyed by creation time. Runs whose timestamp does not parse are skipped.
pub fn latency_samples(runs: &[RunRecord]) -> Vec<Sample> {
    runs.iter()
        .filter_map(|r| {
            r.created_at_utc().map(|at| Sample {
                at,
                value: r.duration_ms.unwrap_or(0.0),
            })
        })
        .collect()
}

pub fn latency_trend(runs: &[RunRecord], window: usize) -> Trend {
    Trend::new(compute_trend(&latency_samples(runs), window), false)
}

/// Throughput change: each window's rate is its run count over the time it spans.
pub fn run_volume_trend(runs: &[RunRecord], window: usize) -> Trend {
    let samples: Vec<Sample> = runs
        .iter()
        .filter_map(|r| {
            r.created_at_utc().map(|at| Sample {
                at,
                value: at.timestamp_millis() as f64,
            })
        })
        .collect();

    let delta = split_windows(&samples, window).and_then(|(previous, recent)| {
        let span = |w: &[Sample]| Some(w.last()?.value - w.first()?.value);
        let (prev_span, recent_span) = (span(&previous)?, span(&recent)?);
        if prev_span <= 0.0 || recent_span <= 0.0 {
            return None;
        }
        Some((prev_span / recent_span - 1.0) * 100.0)
    });

    Trend::new(delta, true)
}

/// Durations of the last `points` runs in chronological order; missing durations plot as 0.
pub fn latency_sparkline(runs: &[RunRecord], points: usize) -> Vec<f64> {
    let mut samples = latency_samples(runs);
    samples.sort_by_key(|s| s.at);
    let start = samples.len().saturating_sub(points);
    samples[start..]
        .iter()
        .map(|s| s.value)
        .filter(|v| *v >= 0.0)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct TokenSplit {
    pub prompt: u64,
    pub completion: u64,
}

pub fn split_tokens(aggregates: &[AgentAggregate]) -> TokenSplit {
    aggregates.iter().fold(TokenSplit::default(), |acc, a| TokenSplit {
        prompt: acc.prompt + a.prompt_tokens_total.unwrap_or(0),
        completion: acc.completion + a.completion_tokens_total.unwrap_or(0),
    })
}

/// Highest run count; ties go to the earliest entry.
pub fn most_active_agent(aggregates: &[AgentAggregate]) -> Option<&AgentAggregate> {
    aggregates.iter().fold(None, |best: Option<&AgentAggregate>, a| match best {
        Some(b) if b.runs_total >= a.runs_total => Some(b),
        _ => Some(a),
    })
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TopModel {
    pub model: String,
    pub count: usize,
    /// Size of the sample the count was taken from.
    pub total: usize,
}

pub fn top_model(runs: &[RunRecord]) -> Option<TopModel> {
    // first-seen order is kept so ties resolve to the earliest model
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for run in runs {
        let model = run.model.as_deref().unwrap_or(UNKNOWN_MODEL);
        match counts.iter_mut().find(|(m, _)| *m == model) {
            Some((_, n)) => *n += 1,
            None => counts.push((model, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (model, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((model, count));
        }
    }

    best.map(|(model, count)| TopModel {
        model: model.to_string(),
        count,
        total: runs.len(),
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorSummary {
    pub id: String,
    pub agent_id: String,
    pub agent_label: String,
    pub category: String,
    pub message: String,
    pub age: String,
    pub status: RunStatus,
}

fn non_empty_or(value: Option<&str>, placeholder: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

/// Failed and timed-out runs in input order, at most `limit`.
pub fn select_recent_errors(
    runs: &[RunRecord],
    limit: usize,
    now: DateTime<Utc>,
    names: &AgentNameLookup,
) -> Vec<ErrorSummary> {
    runs.iter()
        .filter(|r| r.status.is_failure())
        .take(limit)
        .map(|r| ErrorSummary {
            id: r.id.clone(),
            agent_id: r.agent_id.clone(),
            agent_label: names.display_agent(r.agent_name.as_deref(), Some(r.agent_id.as_str())),
            category: non_empty_or(r.error_type.as_deref(), UNKNOWN_ERROR_CATEGORY),
            message: non_empty_or(r.error_message.as_deref(), MISSING_ERROR_DETAILS),
            age: time_ago(Some(r.created_at.as_str()), now),
            status: r.status.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    /// `errors_total > runs_total`; rates derived from these counts fall outside 0..=100.
    ErrorsExceedRuns {
        scope: String,
        runs: u64,
        errors: u64,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct AggregationOptions {
    pub trend_window: usize,
    pub sparkline_points: usize,
    pub recent_errors_limit: usize,
    pub tail_percentile: TailPercentile,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            trend_window: TREND_WINDOW,
            sparkline_points: SPARKLINE_POINTS,
            recent_errors_limit: RECENT_ERRORS_LIMIT,
            tail_percentile: TailPercentile::P75,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LatencyReading {
    pub ms: Option<f64>,
    pub health: LatencyHealth,
}

impl LatencyReading {
    fn of(ms: Option<f64>) -> Self {
        Self {
            ms,
            health: classify_latency(ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TailLatencyReading {
    pub percentile: TailPercentile,
    pub ms: f64,
    pub health: LatencyHealth,
}

impl From<TailLatency> for TailLatencyReading {
    fn from(tail: TailLatency) -> Self {
        Self {
            percentile: tail.percentile,
            ms: tail.ms,
            health: classify_latency(Some(tail.ms)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RunSplit {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MostActiveAgent {
    pub agent_id: String,
    pub label: String,
    pub runs_total: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastRunView {
    pub id: String,
    pub agent_label: String,
    pub status: RunStatus,
    pub latency: LatencyReading,
    pub age: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpensiveRunView {
    pub id: String,
    pub agent_label: String,
    pub cost_usd: f64,
    pub total_tokens: Option<u64>,
    pub duration_ms: Option<f64>,
    pub age: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentRow {
    pub agent_id: String,
    pub label: String,
    pub runs_total: u64,
    pub errors_total: u64,
    pub error_rate_pct: Option<f64>,
    pub error_tier: RateTier,
    pub avg_latency: LatencyReading,
    pub tail_latency: Option<TailLatencyReading>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: Option<u64>,
    pub cost_usd_total: f64,
}

pub fn agent_rows(
    aggregates: &[AgentAggregate],
    names: &AgentNameLookup,
    tail_percentile: TailPercentile,
) -> Vec<AgentRow> {
    aggregates
        .iter()
        .map(|a| {
            let rate = error_rate(a.error_rate_pct_total, a.runs_total, a.errors_total);
            AgentRow {
                agent_id: a.agent_id.clone(),
                label: names.display_agent(a.agent_name.as_deref(), Some(a.agent_id.as_str())),
                runs_total: a.runs_total,
                errors_total: a.errors_total,
                error_rate_pct: rate,
                error_tier: classify_error_rate(rate),
                avg_latency: LatencyReading::of(a.avg_latency_ms_total),
                tail_latency: a.tail_latency(tail_percentile).map(TailLatencyReading::from),
                prompt_tokens: a.prompt_tokens_total.unwrap_or(0),
                completion_tokens: a.completion_tokens_total.unwrap_or(0),
                total_tokens: a.total_tokens_total,
                cost_usd_total: a.cost_usd_total,
            }
        })
        .collect()
}

pub fn data_warnings(snapshot: &TelemetrySnapshot) -> Vec<DataWarning> {
    let totals = &snapshot.overview.totals;
    let overview_runs = totals.runs_total.unwrap_or(0);
    let overview_errors = totals.errors_total.unwrap_or(0);

    let overview = (overview_errors > overview_runs).then(|| DataWarning::ErrorsExceedRuns {
        scope: "overview".to_string(),
        runs: overview_runs,
        errors: overview_errors,
    });

    let agents = snapshot
        .agents
        .iter()
        .filter(|a| a.errors_total > a.runs_total)
        .map(|a| DataWarning::ErrorsExceedRuns {
            scope: a.agent_id.clone(),
            runs: a.runs_total,
            errors: a.errors_total,
        });

    overview.into_iter().chain(agents).collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub agent_id: Option<String>,
    pub totals: OverviewTotals,
    pub agent_count: usize,
    pub runs: RunSplit,
    pub success_rate_pct: Option<f64>,
    pub success_tier: RateTier,
    pub error_rate_pct: Option<f64>,
    pub error_tier: RateTier,
    pub avg_latency: LatencyReading,
    pub tail_latency: Option<TailLatencyReading>,
    pub tokens: TokenSplit,
    pub latency_trend: Trend,
    pub volume_trend: Trend,
    pub latency_sparkline: Vec<f64>,
    pub recent_errors: Vec<ErrorSummary>,
    pub most_active_agent: Option<MostActiveAgent>,
    pub top_model: Option<TopModel>,
    pub last_run: Option<LastRunView>,
    pub most_expensive: Option<ExpensiveRunView>,
    pub agents: Vec<AgentRow>,
    pub warnings: Vec<DataWarning>,
}

pub fn build_dashboard(
    snapshot: &TelemetrySnapshot,
    options: &AggregationOptions,
    now: DateTime<Utc>,
) -> DashboardView {
    let names = AgentNameLookup::from_aggregates(&snapshot.agents);
    let overview = &snapshot.overview;
    let totals = &overview.totals;
    let runs_total = totals.runs_total.unwrap_or(0);
    let errors_total = totals.errors_total.unwrap_or(0);

    let success = success_rate(totals);
    let errors = error_rate(totals.error_rate_pct_total, runs_total, errors_total);

    DashboardView {
        generated_at: now,
        agent_id: overview.agent_id.clone(),
        totals: totals.clone(),
        agent_count: snapshot.agents.len(),
        runs: RunSplit {
            succeeded: runs_total.saturating_sub(errors_total),
            failed: errors_total,
        },
        success_rate_pct: success,
        success_tier: classify_success_rate(success),
        error_rate_pct: errors,
        error_tier: classify_error_rate(errors),
        avg_latency: LatencyReading::of(totals.avg_latency_ms_total),
        tail_latency: totals
            .tail_latency(options.tail_percentile)
            .map(TailLatencyReading::from),
        tokens: split_tokens(&snapshot.agents),
        latency_trend: latency_trend(&snapshot.runs, options.trend_window),
        volume_trend: run_volume_trend(&snapshot.runs, options.trend_window),
        latency_sparkline: latency_sparkline(&snapshot.runs, options.sparkline_points),
        recent_errors: select_recent_errors(
            &snapshot.runs,
            options.recent_errors_limit,
            now,
            &names,
        ),
        most_active_agent: most_active_agent(&snapshot.agents).map(|a| MostActiveAgent {
            agent_id: a.agent_id.clone(),
            label: names.display_agent(a.agent_name.as_deref(), Some(a.agent_id.as_str())),
            runs_total: a.runs_total,
        }),
        top_model: top_model(&snapshot.runs),
        last_run: overview.last_run.as_ref().map(|r| LastRunView {
            id: r.id.clone(),
            agent_label: names.display_agent(r.agent_name.as_deref(), r.agent_id.as_deref()),
            status: r.status.clone(),
            latency: LatencyReading::of(r.duration_ms),
            age: time_ago(Some(r.created_at.as_str()), now),
        }),
        most_expensive: overview.most_expensive.as_ref().map(|r| ExpensiveRunView {
            id: r.id.clone(),
            agent_label: names.display_agent(r.agent_name.as_deref(), r.agent_id.as_deref()),
            cost_usd: r.cost_usd,
            total_tokens: r.total_tokens,
            duration_ms: r.duration_ms,
            age: time_ago(Some(r.created_at.as_str()), now),
        }),
        agents: agent_rows(&snapshot.agents, &names, options.tail_percentile),
        warnings: data_warnings(snapshot),
    }
}
