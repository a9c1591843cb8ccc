// [[AGENTDECK]]/apps/console-server/src/backend.rs
// Purpose: Read-only access to the agents backend (telemetry + PR reviews).
// Architecture: Infrastructure Layer
// Dependencies: reqwest, async-trait, tokio

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ConsoleError;
use crate::models::*;
use crate::reviews::{LatestReview, PrHistory, PrPage, RepoPage};
use crate::security::RequestContext;

const REVIEWS_BASE: &str = "/api/v1/reviews";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LastRunsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn overview(
        &self,
        ctx: &RequestContext,
        agent_id: Option<&str>,
    ) -> Result<Overview, ConsoleError>;

    async fn totals_by_agent(&self, ctx: &RequestContext) -> Result<Vec<AgentAggregate>, ConsoleError>;

    async fn last_runs(
        &self,
        ctx: &RequestContext,
        query: &LastRunsQuery,
    ) -> Result<Vec<RunRecord>, ConsoleError>;
}

#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn list_repos(&self, ctx: &RequestContext, page: Page) -> Result<RepoPage, ConsoleError>;

    async fn list_prs(
        &self,
        ctx: &RequestContext,
        repo_full_name: &str,
        page: Page,
    ) -> Result<PrPage, ConsoleError>;

    async fn latest_review(
        &self,
        ctx: &RequestContext,
        repo_full_name: &str,
        pr_number: u64,
    ) -> Result<LatestReview, ConsoleError>;

    async fn pr_history(
        &self,
        ctx: &RequestContext,
        repo_full_name: &str,
        pr_number: u64,
        page: Page,
    ) -> Result<PrHistory, ConsoleError>;

    async fn review_by_job(&self, ctx: &RequestContext, job_id: &str) -> Result<LatestReview, ConsoleError>;
}

/// Fetches overview, per-agent totals and recent runs concurrently.
/// Any failed fetch fails the whole load; nothing is partially aggregated.
pub async fn load_snapshot(
    source: &dyn TelemetrySource,
    ctx: &RequestContext,
    agent_id: Option<&str>,
    last_runs_limit: usize,
) -> Result<TelemetrySnapshot, ConsoleError> {
    let query = LastRunsQuery {
        limit: Some(last_runs_limit),
        agent_id: agent_id.map(str::to_string),
        status: None,
    };

    let (overview, agents, runs) = tokio::try_join!(
        source.overview(ctx, agent_id),
        source.totals_by_agent(ctx),
        source.last_runs(ctx, &query),
    )?;

    tracing::info!(
        "Loaded telemetry snapshot: {} agents, {} recent runs",
        agents.len(),
        runs.len()
    );

    Ok(TelemetrySnapshot {
        overview,
        agents,
        runs,
    })
}

pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConsoleError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ConsoleError::Transport {
                endpoint: "client setup".to_string(),
                source,
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T, Q>(&self, ctx: &RequestContext, path: &str, query: &Q) -> Result<T, ConsoleError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Sending backend request to: {}", url);

        let mut request = self.http_client.get(&url).query(query);
        if let Some(token) = &ctx.bearer {
            request = request.bearer_auth(token);
        }

        let transport = |source| ConsoleError::Transport {
            endpoint: path.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!("Backend answered {} for {}", status, path);
            return Err(ConsoleError::Upstream {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|source| ConsoleError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl TelemetrySource for HttpBackend {
    async fn overview(
        &self,
        ctx: &RequestContext,
        agent_id: Option<&str>,
    ) -> Result<Overview, ConsoleError> {
        let query: Vec<(&str, &str)> = agent_id.map(|id| ("agent_id", id)).into_iter().collect();
        let payload: OverviewPayload = self.get_json(ctx, "/dashboard/overview", &query).await?;
        Ok(payload.normalize())
    }

    async fn totals_by_agent(&self, ctx: &RequestContext) -> Result<Vec<AgentAggregate>, ConsoleError> {
        let payload: ListPayload<AgentAggregate> = self
            .get_json(ctx, "/dashboard/totals-by-agent", &[] as &[(&str, &str)])
            .await?;
        Ok(payload.into_items())
    }

    async fn last_runs(
        &self,
        ctx: &RequestContext,
        query: &LastRunsQuery,
    ) -> Result<Vec<RunRecord>, ConsoleError> {
        let payload: ListPayload<RunRecord> = self.get_json(ctx, "/dashboard/last-runs", query).await?;
        Ok(payload.into_items())
    }
}

#[derive(Serialize)]
struct RepoQuery<'a> {
    repo_full_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
}

impl<'a> RepoQuery<'a> {
    fn new(repo_full_name: &'a str, pr_number: Option<u64>, page: Option<Page>) -> Self {
        Self {
            repo_full_name,
            pr_number,
            limit: page.map(|p| p.limit),
            offset: page.map(|p| p.offset),
        }
    }
}

#[async_trait]
impl ReviewSource for HttpBackend {
    async fn list_repos(&self, ctx: &RequestContext, page: Page) -> Result<RepoPage, ConsoleError> {
        self.get_json(ctx, &format!("{}/repos", REVIEWS_BASE), &page).await
    }

    async fn list_prs(
        &self,
        ctx: &RequestContext,
        repo_full_name: &str,
        page: Page,
    ) -> Result<PrPage, ConsoleError> {
        let query = RepoQuery::new(repo_full_name, None, Some(page));
        self.get_json(ctx, &format!("{}/prs", REVIEWS_BASE), &query).await
    }

    async fn latest_review(
        &self,
        ctx: &RequestContext,
        repo_full_name: &str,
        pr_number: u64,
    ) -> Result<LatestReview, ConsoleError> {
        let query = RepoQuery::new(repo_full_name, Some(pr_number), None);
        self.get_json(ctx, &format!("{}/pr/latest", REVIEWS_BASE), &query).await
    }

    async fn pr_history(
        &self,
        ctx: &RequestContext,
        repo_full_name: &str,
        pr_number: u64,
        page: Page,
    ) -> Result<PrHistory, ConsoleError> {
        let query = RepoQuery::new(repo_full_name, Some(pr_number), Some(page));
        self.get_json(ctx, &format!("{}/pr/history", REVIEWS_BASE), &query).await
    }

    async fn review_by_job(&self, ctx: &RequestContext, job_id: &str) -> Result<LatestReview, ConsoleError> {
        self.get_json(
            ctx,
            &format!("{}/jobs/{}", REVIEWS_BASE, job_id),
            &[] as &[(&str, &str)],
        )
        .await
    }
}
