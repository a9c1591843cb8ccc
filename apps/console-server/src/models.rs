// [[AGENTDECK]]/apps/console-server/src/models.rs
// Purpose: Shapes of the telemetry payloads consumed from the agents backend.
// Architecture: Domain Model Layer
// Dependencies: Serde, Chrono

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Outcome of a single agent run. Unknown values are preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Success,
    Error,
    Timeout,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Error => "error",
            RunStatus::Timeout => "timeout",
            RunStatus::Other(s) => s.as_str(),
        }
    }

    /// Runs that count towards the recent-errors panel.
    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Error | RunStatus::Timeout)
    }
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "success" => RunStatus::Success,
            "error" => RunStatus::Error,
            "timeout" => RunStatus::Timeout,
            _ => RunStatus::Other(value),
        }
    }
}

impl From<RunStatus> for String {
    fn from(value: RunStatus) -> Self {
        match value {
            RunStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub id: String,
    pub created_at: String,
    #[serde(default)]
    pub finished_at: Option<String>,
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RunRecord {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// Parses the backend's RFC 3339 timestamps. Anything else is treated as unknown.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentAggregate {
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub runs_total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors_total: u64,
    #[serde(default)]
    pub error_rate_pct_total: Option<f64>,
    #[serde(default)]
    pub avg_latency_ms_total: Option<f64>,
    #[serde(default)]
    pub p75_latency_ms_total: Option<f64>,
    #[serde(default)]
    pub p95_latency_ms_total: Option<f64>,
    #[serde(default)]
    pub prompt_tokens_total: Option<u64>,
    #[serde(default)]
    pub completion_tokens_total: Option<u64>,
    #[serde(default)]
    pub total_tokens_total: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost_usd_total: f64,
}

impl AgentAggregate {
    pub fn tail_latency(&self, preferred: TailPercentile) -> Option<TailLatency> {
        TailLatency::pick(preferred, self.p75_latency_ms_total, self.p95_latency_ms_total)
    }
}

/// All-time totals, either global or scoped to one agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverviewTotals {
    #[serde(default)]
    pub runs_total: Option<u64>,
    #[serde(default)]
    pub errors_total: Option<u64>,
    #[serde(default)]
    pub error_rate_pct_total: Option<f64>,
    #[serde(default)]
    pub avg_latency_ms_total: Option<f64>,
    #[serde(default)]
    pub p75_latency_ms_total: Option<f64>,
    #[serde(default)]
    pub p95_latency_ms_total: Option<f64>,
    #[serde(default)]
    pub total_tokens_total: Option<u64>,
    #[serde(default)]
    pub cost_usd_total: Option<f64>,
}

impl OverviewTotals {
    pub fn tail_latency(&self, preferred: TailPercentile) -> Option<TailLatency> {
        TailLatency::pick(preferred, self.p75_latency_ms_total, self.p95_latency_ms_total)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastRunPointer {
    pub id: String,
    pub created_at: String,
    pub status: RunStatus,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Null once the agent has been deleted.
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MostExpensiveRun {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost_usd: f64,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    pub created_at: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NestedOverview {
    #[serde(default)]
    pub agent_id: Option<String>,
    pub totals: OverviewTotals,
    #[serde(default, deserialize_with = "lenient_pointer")]
    pub last_run: Option<LastRunPointer>,
    #[serde(default, deserialize_with = "lenient_pointer")]
    pub most_expensive: Option<MostExpensiveRun>,
}

/// `/dashboard/overview` answers either with a `totals` wrapper or with the
/// totals at the root. A non-null `totals` key selects the nested shape.
#[derive(Debug, Clone, PartialEq)]
pub enum OverviewPayload {
    Nested(NestedOverview),
    Flat(OverviewTotals),
}

impl<'de> Deserialize<'de> for OverviewPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let nested = value.get("totals").is_some_and(|totals| !totals.is_null());

        if nested {
            NestedOverview::deserialize(value)
                .map(OverviewPayload::Nested)
                .map_err(serde::de::Error::custom)
        } else {
            OverviewTotals::deserialize(value)
                .map(OverviewPayload::Flat)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Explicit `null` reads as the type's default, same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A malformed pointer is dropped rather than failing the whole overview.
fn lenient_pointer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }

    match T::deserialize(value) {
        Ok(pointer) => Ok(Some(pointer)),
        Err(e) => {
            tracing::warn!("Ignoring malformed overview pointer: {}", e);
            Ok(None)
        }
    }
}

impl OverviewPayload {
    pub fn normalize(self) -> Overview {
        match self {
            OverviewPayload::Nested(nested) => Overview {
                agent_id: nested.agent_id,
                totals: nested.totals,
                last_run: nested.last_run,
                most_expensive: nested.most_expensive,
            },
            OverviewPayload::Flat(totals) => Overview {
                agent_id: None,
                totals,
                last_run: None,
                most_expensive: None,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Overview {
    pub agent_id: Option<String>,
    pub totals: OverviewTotals,
    pub last_run: Option<LastRunPointer>,
    pub most_expensive: Option<MostExpensiveRun>,
}

/// List endpoints answer `{ "items": [...] }`; a bare array is accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Wrapped {
        #[serde(default = "Vec::new")]
        items: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> ListPayload<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListPayload::Wrapped { items } => items,
            ListPayload::Bare(items) => items,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TailPercentile {
    P75,
    P95,
}

impl TailPercentile {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "p75" | "75" => Some(TailPercentile::P75),
            "p95" | "95" => Some(TailPercentile::P95),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TailLatency {
    pub percentile: TailPercentile,
    pub ms: f64,
}

impl TailLatency {
    /// Prefers the configured percentile, falling back to whichever one the backend sent.
    fn pick(preferred: TailPercentile, p75: Option<f64>, p95: Option<f64>) -> Option<Self> {
        let (first, second) = match preferred {
            TailPercentile::P75 => ((TailPercentile::P75, p75), (TailPercentile::P95, p95)),
            TailPercentile::P95 => ((TailPercentile::P95, p95), (TailPercentile::P75, p75)),
        };

        [first, second]
            .into_iter()
            .find_map(|(percentile, ms)| ms.map(|ms| TailLatency { percentile, ms }))
    }
}

/// Everything the dashboard aggregation needs, fetched in one load cycle.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub overview: Overview,
    pub agents: Vec<AgentAggregate>,
    pub runs: Vec<RunRecord>,
}
