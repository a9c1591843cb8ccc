// [[AGENTDECK]]/apps/console-server/src/server/handlers.rs
// Purpose: API Handlers. Each request loads fresh data from the backend and derives its view.
// Architecture: API Layer
// Dependencies: Axum, Backend, Metrics, Reviews

use axum::extract::{Json, Path, Query, State};
use chrono::Utc;
use std::sync::Arc;

use crate::backend::{load_snapshot, Page};
use crate::error::ConsoleError;
use crate::metrics::{agent_rows, build_dashboard, AgentRow, DashboardView};
use crate::names::AgentNameLookup;
use crate::reviews::{PrHistory, PrPage, RepoPage, ReviewDigest};
use crate::security::RequestContext;
use crate::server::AppState;

const DEFAULT_PAGE_LIMIT: u32 = 50;
const DEFAULT_HISTORY_LIMIT: u32 = 20;

#[derive(serde::Deserialize)]
pub struct DashboardQuery {
    agent_id: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct PageQuery {
    repo_full_name: Option<String>,
    pr_number: Option<u64>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl PageQuery {
    fn page(&self, default_limit: u32) -> Page {
        Page {
            limit: self.limit.unwrap_or(default_limit),
            offset: self.offset.unwrap_or(0),
        }
    }

    fn repo(&self) -> Result<&str, ConsoleError> {
        self.repo_full_name
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ConsoleError::BadRequest("repo_full_name is required".to_string()))
    }

    fn pr_number(&self) -> Result<u64, ConsoleError> {
        self.pr_number
            .ok_or_else(|| ConsoleError::BadRequest("pr_number is required".to_string()))
    }
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "AgentDeck console server is running".to_string(),
    })
}

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardView>, ConsoleError> {
    let agent_id = query.agent_id.as_deref().filter(|id| !id.is_empty());

    let snapshot = load_snapshot(
        state.telemetry.as_ref(),
        &ctx,
        agent_id,
        state.last_runs_limit,
    )
    .await?;

    let view = build_dashboard(&snapshot, &state.options, Utc::now());
    for warning in &view.warnings {
        tracing::warn!("Telemetry data inconsistency: {:?}", warning);
    }

    Ok(Json(view))
}

pub async fn get_agent_rows(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Vec<AgentRow>>, ConsoleError> {
    let agents = state.telemetry.totals_by_agent(&ctx).await?;
    let names = AgentNameLookup::from_aggregates(&agents);
    Ok(Json(agent_rows(&agents, &names, state.options.tail_percentile)))
}

pub async fn list_repos(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Result<Json<RepoPage>, ConsoleError> {
    let page = state
        .reviews
        .list_repos(&ctx, query.page(DEFAULT_PAGE_LIMIT))
        .await?;
    Ok(Json(page))
}

pub async fn list_prs(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Result<Json<PrPage>, ConsoleError> {
    let repo = query.repo()?;
    let page = state
        .reviews
        .list_prs(&ctx, repo, query.page(DEFAULT_PAGE_LIMIT))
        .await?;
    Ok(Json(page))
}

pub async fn get_latest_review(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Result<Json<ReviewDigest>, ConsoleError> {
    let repo = query.repo()?;
    let pr_number = query.pr_number()?;
    tracing::info!("Loading latest review for {}#{}", repo, pr_number);

    let latest = state.reviews.latest_review(&ctx, repo, pr_number).await?;
    Ok(Json(ReviewDigest::from_latest(&latest)))
}

pub async fn get_pr_history(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> Result<Json<PrHistory>, ConsoleError> {
    let repo = query.repo()?;
    let pr_number = query.pr_number()?;
    let history = state
        .reviews
        .pr_history(&ctx, repo, pr_number, query.page(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(Json(history))
}

pub async fn get_review_by_job(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(job_id): Path<String>,
) -> Result<Json<ReviewDigest>, ConsoleError> {
    // The id is spliced into the backend path
    if job_id.is_empty() || !job_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ConsoleError::BadRequest(format!("invalid job id: {}", job_id)));
    }

    let review = state.reviews.review_by_job(&ctx, &job_id).await?;
    Ok(Json(ReviewDigest::from_latest(&review)))
}

#[cfg(test)]
mod tests {
    use crate::metrics::AggregationOptions;
    use crate::reviews::LatestReview;
    use crate::security::RequestContext;
    use crate::server::{router, AppState};
    use crate::test_support::FakeBackend;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_with(backend: FakeBackend) -> (Router, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let state = AppState {
            telemetry: backend.clone(),
            reviews: backend.clone(),
            options: AggregationOptions::default(),
            last_runs_limit: 20,
        };
        (router(Arc::new(state)), backend)
    }

    async fn get(app: Router, uri: &str, auth: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(value) = auth {
            request = request.header("authorization", value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn latest_review() -> LatestReview {
        serde_json::from_value(json!({
            "job": {
                "id": "job-12",
                "repo_full_name": "acme/api",
                "pr_number": 12,
                "status": "completed",
                "duration_ms": 9_500
            },
            "report": { "id": "rep", "job_id": "job-12", "summary": "Two issues" },
            "findings": [
                { "id": "f1", "severity": "MAJOR", "title": "Unchecked unwrap" },
                { "id": "f2", "severity": "NIT" }
            ],
            "tests_suggested": []
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app_with(FakeBackend::sample());
        let (status, body) = get(app, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_dashboard_view() {
        let (app, backend) = app_with(FakeBackend::sample());
        let (status, body) = get(app, "/api/dashboard", Some("Bearer abc")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success_rate_pct"], json!(95.0));
        assert_eq!(body["success_tier"], "good");
        assert_eq!(body["error_tier"], "good");
        assert_eq!(body["avg_latency"]["health"], "healthy");
        assert_eq!(body["tail_latency"]["percentile"], "p75");
        assert_eq!(body["tokens"]["prompt"], 6_000);
        assert_eq!(body["tokens"]["completion"], 2_400);
        assert_eq!(body["agent_count"], 3);
        assert_eq!(body["most_active_agent"]["label"], "Support Bot");
        assert_eq!(body["top_model"]["model"], "gpt-4o-mini");
        assert_eq!(body["top_model"]["count"], 20);
        assert_eq!(body["recent_errors"].as_array().unwrap().len(), 3);
        assert_eq!(body["recent_errors"][0]["id"], "run-03");
        assert_eq!(body["recent_errors"][0]["message"], "No details available");
        assert_eq!(body["latency_trend"]["higher_is_better"], false);
        assert!(body["latency_trend"]["delta_pct"].is_number());
        assert_eq!(body["latency_sparkline"].as_array().unwrap().len(), 20);
        assert!(body["warnings"].as_array().unwrap().is_empty());

        assert_eq!(backend.last_ctx(), Some(RequestContext::with_bearer("abc")));
    }

    #[tokio::test]
    async fn test_dashboard_scoped_to_agent() {
        let (app, backend) = app_with(FakeBackend::sample());
        let (status, body) = get(app, "/api/dashboard?agent_id=agent-b", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent_id"], "agent-b");
        assert_eq!(
            backend.last_query().and_then(|q| q.agent_id).as_deref(),
            Some("agent-b")
        );
    }

    #[tokio::test]
    async fn test_dashboard_fails_as_a_whole() {
        let (app, _) = app_with(FakeBackend::sample().failing_runs());
        let (status, body) = get(app, "/api/dashboard", None).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("/dashboard/last-runs"));
    }

    #[tokio::test]
    async fn test_malformed_auth_is_rejected() {
        let (app, _) = app_with(FakeBackend::sample());
        let (status, _) = get(app, "/api/dashboard", Some("Token nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_agent_rows() {
        let (app, _) = app_with(FakeBackend::sample());
        let (status, body) = get(app, "/api/dashboard/agents", None).await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["label"], "Support Bot");
        assert_eq!(rows[2]["label"], "agent-c0…");
        assert_eq!(rows[2]["error_tier"], "good");
    }

    #[tokio::test]
    async fn test_review_listing_defaults() {
        let (app, _) = app_with(FakeBackend::sample());
        let (status, body) = get(app.clone(), "/api/reviews/repos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["limit"], 50);
        assert_eq!(body["repos"][0]["repo_full_name"], "acme/api");

        let (status, body) = get(app.clone(), "/api/reviews/prs", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad request: repo_full_name is required");

        let (status, body) = get(app, "/api/reviews/prs?repo_full_name=acme/api&limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["prs"][0]["pr_number"], 12);
    }

    #[tokio::test]
    async fn test_latest_review_digest() {
        let (app, _) = app_with(FakeBackend::sample().with_latest(latest_review()));

        let (status, body) = get(
            app.clone(),
            "/api/reviews/pr/latest?repo_full_name=acme/api&pr_number=12",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "ready");
        assert_eq!(body["job"]["duration"], "9.5s");
        assert_eq!(body["counts"]["MAJOR"], 1);
        assert_eq!(body["groups"][1]["severity"], "MAJOR");

        let (status, _) = get(app.clone(), "/api/reviews/pr/latest?repo_full_name=acme/api", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(
            app,
            "/api/reviews/pr/history?repo_full_name=acme/api&pr_number=12",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["limit"], 20);
        assert_eq!(body["jobs"][0]["id"], "job-12");
    }

    #[tokio::test]
    async fn test_review_by_job() {
        let (app, _) = app_with(FakeBackend::sample().with_latest(latest_review()));

        let (status, body) = get(app.clone(), "/api/reviews/jobs/job-12", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["job"]["status_class"], "completed");

        let (status, _) = get(app, "/api/reviews/jobs/job%2E%2E", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
