// [[AGENTDECK]]/apps/console-server/src/config.rs
// Purpose: Boot-time settings read from the environment.
// Architecture: Application Boot
// Dependencies: Models, Policy

use std::time::Duration;

use crate::error::ConfigError;
use crate::metrics::AggregationOptions;
use crate::models::TailPercentile;
use crate::policy::{LAST_RUNS_LIMIT, TREND_WINDOW};

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    pub port: u16,
    pub backend_base_url: String,
    pub backend_timeout: Duration,
    pub last_runs_limit: usize,
    pub trend_window: usize,
    pub tail_percentile: TailPercentile,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_base_url = lookup("BACKEND_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("BACKEND_BASE_URL"))?;

        let tail_percentile = match lookup("TAIL_LATENCY_PERCENTILE") {
            Some(raw) => TailPercentile::parse(&raw).ok_or(ConfigError::Invalid {
                key: "TAIL_LATENCY_PERCENTILE",
                value: raw,
            })?,
            None => TailPercentile::P75,
        };

        let trend_window = parse_or(&lookup, "TREND_WINDOW", TREND_WINDOW)?;
        if trend_window == 0 {
            return Err(ConfigError::Invalid {
                key: "TREND_WINDOW",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            port: parse_or(&lookup, "CONSOLE_PORT", 3000)?,
            backend_base_url,
            backend_timeout: Duration::from_millis(parse_or(&lookup, "BACKEND_TIMEOUT_MS", 15_000)?),
            last_runs_limit: parse_or(&lookup, "LAST_RUNS_LIMIT", LAST_RUNS_LIMIT)?,
            trend_window,
            tail_percentile,
            cors_allow_origin: lookup("CORS_ALLOW_ORIGIN")
                .filter(|origin| !origin.is_empty() && origin != "*"),
        })
    }

    pub fn aggregation_options(&self) -> AggregationOptions {
        AggregationOptions {
            trend_window: self.trend_window,
            tail_percentile: self.tail_percentile,
            ..AggregationOptions::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
