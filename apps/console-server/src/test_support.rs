// [[AGENTDECK]]/apps/console-server/src/test_support.rs
// Purpose: In-memory backend used by unit and router tests.
// Architecture: Test Support
// Dependencies: async-trait

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use crate::backend::{LastRunsQuery, Page, ReviewSource, TelemetrySource};
use crate::error::ConsoleError;
use crate::models::*;
use crate::reviews::*;
use crate::security::RequestContext;

pub struct FakeBackend {
    pub overview: Overview,
    pub agents: Vec<AgentAggregate>,
    pub runs: Vec<RunRecord>,
    pub latest: Option<LatestReview>,
    fail_runs: bool,
    last_query: Mutex<Option<LastRunsQuery>>,
    last_ctx: Mutex<Option<RequestContext>>,
}

fn unavailable(endpoint: &str) -> ConsoleError {
    ConsoleError::Upstream {
        endpoint: endpoint.to_string(),
        status: 503,
    }
}

impl FakeBackend {
    /// Two named agents, one unnamed, and 20 recent runs (most recent first).
    pub fn sample() -> Self {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let agent = |id: &str, name: Option<&str>, runs: u64, errors: u64| AgentAggregate {
            agent_id: id.to_string(),
            agent_name: name.map(str::to_string),
            runs_total: runs,
            errors_total: errors,
            error_rate_pct_total: None,
            avg_latency_ms_total: Some(1_500.0),
            p75_latency_ms_total: Some(2_500.0),
            p95_latency_ms_total: None,
            prompt_tokens_total: Some(runs * 100),
            completion_tokens_total: Some(runs * 40),
            total_tokens_total: Some(runs * 140),
            cost_usd_total: runs as f64 * 0.002,
        };

        let runs = (0..20)
            .map(|i| RunRecord {
                id: format!("run-{i:02}"),
                created_at: (now - Duration::minutes(i * 3)).to_rfc3339(),
                finished_at: None,
                agent_id: if i % 2 == 0 { "agent-a".to_string() } else { "agent-b".to_string() },
                agent_name: None,
                user_id: None,
                session_id: None,
                status: if i % 7 == 3 { RunStatus::Error } else { RunStatus::Success },
                duration_ms: Some(1_000.0 + i as f64 * 10.0),
                model: Some("gpt-4o-mini".to_string()),
                total_tokens: Some(140),
                cost_usd: Some(0.002),
                error_type: None,
                error_message: None,
            })
            .collect();

        Self {
            overview: Overview {
                agent_id: None,
                totals: OverviewTotals {
                    runs_total: Some(60),
                    errors_total: Some(3),
                    error_rate_pct_total: Some(5.0),
                    avg_latency_ms_total: Some(1_500.0),
                    p75_latency_ms_total: Some(2_500.0),
                    p95_latency_ms_total: None,
                    total_tokens_total: Some(8_400),
                    cost_usd_total: Some(0.12),
                },
                last_run: None,
                most_expensive: None,
            },
            agents: vec![
                agent("agent-a", Some("Support Bot"), 40, 2),
                agent("agent-b", Some("Triage"), 15, 1),
                agent("agent-c0ffee-1234", None, 5, 0),
            ],
            runs,
            latest: None,
            fail_runs: false,
            last_query: Mutex::new(None),
            last_ctx: Mutex::new(None),
        }
    }

    pub fn failing_runs(mut self) -> Self {
        self.fail_runs = true;
        self
    }

    pub fn with_latest(mut self, latest: LatestReview) -> Self {
        self.latest = Some(latest);
        self
    }

    pub fn last_query(&self) -> Option<LastRunsQuery> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn last_ctx(&self) -> Option<RequestContext> {
        self.last_ctx.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetrySource for FakeBackend {
    async fn overview(
        &self,
        ctx: &RequestContext,
        agent_id: Option<&str>,
    ) -> Result<Overview, ConsoleError> {
        *self.last_ctx.lock().unwrap() = Some(ctx.clone());
        let mut overview = self.overview.clone();
        overview.agent_id = agent_id.map(str::to_string);
        Ok(overview)
    }

    async fn totals_by_agent(&self, _ctx: &RequestContext) -> Result<Vec<AgentAggregate>, ConsoleError> {
        Ok(self.agents.clone())
    }

    async fn last_runs(
        &self,
        _ctx: &RequestContext,
        query: &LastRunsQuery,
    ) -> Result<Vec<RunRecord>, ConsoleError> {
        *self.last_query.lock().unwrap() = Some(query.clone());
        if self.fail_runs {
            return Err(unavailable("/dashboard/last-runs"));
        }
        let limit = query.limit.unwrap_or(self.runs.len());
        Ok(self.runs.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl ReviewSource for FakeBackend {
    async fn list_repos(&self, _ctx: &RequestContext, page: Page) -> Result<RepoPage, ConsoleError> {
        Ok(RepoPage {
            limit: page.limit,
            offset: page.offset,
            repos: vec![ReviewedRepo {
                repo_full_name: "acme/api".to_string(),
                last_review_at: Some("2025-03-10T11:00:00Z".to_string()),
                prs_count: Some(2),
            }],
        })
    }

    async fn list_prs(
        &self,
        _ctx: &RequestContext,
        repo_full_name: &str,
        page: Page,
    ) -> Result<PrPage, ConsoleError> {
        Ok(PrPage {
            repo_full_name: repo_full_name.to_string(),
            limit: page.limit,
            offset: page.offset,
            prs: vec![ReviewedPr {
                pr_number: 12,
                last_job_id: Some("job-12".to_string()),
                last_review_at: None,
            }],
        })
    }

    async fn latest_review(
        &self,
        _ctx: &RequestContext,
        _repo_full_name: &str,
        _pr_number: u64,
    ) -> Result<LatestReview, ConsoleError> {
        self.latest
            .clone()
            .ok_or_else(|| unavailable("/api/v1/reviews/pr/latest"))
    }

    async fn pr_history(
        &self,
        _ctx: &RequestContext,
        repo_full_name: &str,
        pr_number: u64,
        page: Page,
    ) -> Result<PrHistory, ConsoleError> {
        Ok(PrHistory {
            repo_full_name: repo_full_name.to_string(),
            pr_number,
            limit: page.limit,
            offset: page.offset,
            jobs: self.latest.iter().map(|l| l.job.clone()).collect(),
        })
    }

    async fn review_by_job(&self, _ctx: &RequestContext, job_id: &str) -> Result<LatestReview, ConsoleError> {
        self.latest
            .clone()
            .filter(|l| l.job.id == job_id)
            .ok_or_else(|| unavailable("/api/v1/reviews/jobs"))
    }
}
