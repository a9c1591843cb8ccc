// [[AGENTDECK]]/apps/console-server/src/reviews.rs
// Purpose: PR-review payloads and the digest shown for a reviewed pull request.
// Architecture: Domain Model + Logic Layer
// Dependencies: Serde, Chrono

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::format::format_review_duration;
use crate::models::parse_timestamp;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Blocker,
    Major,
    Minor,
    Nit,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Blocker,
        Severity::Major,
        Severity::Minor,
        Severity::Nit,
    ];
}

pub type CountsBySeverity = BTreeMap<Severity, u32>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewJob {
    pub id: String,
    pub repo_full_name: String,
    pub pr_number: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewReport {
    pub id: String,
    pub job_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summary_md: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewFinding {
    pub id: String,
    pub severity: Severity,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub line_start: Option<u32>,
    #[serde(default)]
    pub line_end: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestReview {
    pub job: ReviewJob,
    #[serde(default)]
    pub report: Option<ReviewReport>,
    #[serde(default)]
    pub counts: Option<CountsBySeverity>,
    #[serde(default)]
    pub findings: Vec<ReviewFinding>,
    #[serde(default)]
    pub tests_suggested: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewedRepo {
    pub repo_full_name: String,
    #[serde(default)]
    pub last_review_at: Option<String>,
    #[serde(default)]
    pub prs_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoPage {
    pub limit: u32,
    pub offset: u32,
    #[serde(default)]
    pub repos: Vec<ReviewedRepo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewedPr {
    pub pr_number: u64,
    #[serde(default)]
    pub last_job_id: Option<String>,
    #[serde(default)]
    pub last_review_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrPage {
    pub repo_full_name: String,
    pub limit: u32,
    pub offset: u32,
    #[serde(default)]
    pub prs: Vec<ReviewedPr>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrHistory {
    pub repo_full_name: String,
    pub pr_number: u64,
    pub limit: u32,
    pub offset: u32,
    #[serde(default)]
    pub jobs: Vec<ReviewJob>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatusClass {
    Completed,
    Failed,
    InProgress,
}

impl JobStatusClass {
    /// Backend status strings vary, so this matches on substrings.
    pub fn classify(status: Option<&str>) -> Self {
        let s = status.unwrap_or_default().to_lowercase();
        if s.contains("complete") || s.contains("success") {
            JobStatusClass::Completed
        } else if s.contains("error") || s.contains("fail") {
            JobStatusClass::Failed
        } else {
            JobStatusClass::InProgress
        }
    }
}

pub fn job_duration_ms(job: &ReviewJob) -> Option<f64> {
    if let Some(ms) = job.duration_ms.filter(|ms| *ms > 0.0) {
        return Some(ms);
    }

    let started = parse_timestamp(job.created_at.as_deref()?)?;
    let finished = parse_timestamp(job.finished_at.as_deref()?)?;
    let ms = (finished - started).num_milliseconds() as f64;
    (ms > 0.0).then_some(ms)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeverityGroup {
    pub severity: Severity,
    pub findings: Vec<ReviewFinding>,
}

/// Every severity is present, in canonical order, even when empty.
pub fn group_findings(findings: &[ReviewFinding]) -> Vec<SeverityGroup> {
    Severity::ALL
        .iter()
        .map(|severity| SeverityGroup {
            severity: *severity,
            findings: findings
                .iter()
                .filter(|f| f.severity == *severity)
                .cloned()
                .collect(),
        })
        .collect()
}

fn count_findings(findings: &[ReviewFinding]) -> CountsBySeverity {
    let mut counts: CountsBySeverity = Severity::ALL.iter().map(|s| (*s, 0)).collect();
    for finding in findings {
        *counts.entry(finding.severity).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobView {
    pub id: String,
    pub repo_full_name: String,
    pub pr_number: u64,
    pub status: String,
    pub status_class: JobStatusClass,
    pub duration_ms: Option<f64>,
    pub duration: Option<String>,
}

impl JobView {
    fn from_job(job: &ReviewJob, fallback_status: &str) -> Self {
        let duration_ms = job_duration_ms(job);
        let status = job
            .status
            .clone()
            .unwrap_or_else(|| fallback_status.to_string());
        Self {
            id: job.id.clone(),
            repo_full_name: job.repo_full_name.clone(),
            pr_number: job.pr_number,
            status_class: JobStatusClass::classify(Some(status.as_str())),
            status,
            duration_ms,
            duration: format_review_duration(duration_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewDigest {
    /// A job exists but its report is not ready yet.
    Pending { job: JobView },
    Ready {
        job: JobView,
        summary: String,
        counts: CountsBySeverity,
        total_findings: usize,
        groups: Vec<SeverityGroup>,
        tests_suggested: Vec<String>,
    },
}

impl ReviewDigest {
    pub fn from_latest(latest: &LatestReview) -> Self {
        let Some(report) = &latest.report else {
            return ReviewDigest::Pending {
                job: JobView::from_job(&latest.job, "running"),
            };
        };

        let counts = match &latest.counts {
            Some(counts) if !counts.is_empty() => Severity::ALL
                .iter()
                .map(|s| (*s, counts.get(s).copied().unwrap_or(0)))
                .collect(),
            _ => count_findings(&latest.findings),
        };

        let summary = report
            .summary_md
            .as_deref()
            .or(report.summary.as_deref())
            .unwrap_or_default()
            .to_string();

        ReviewDigest::Ready {
            job: JobView::from_job(&latest.job, "completed"),
            summary,
            counts,
            total_findings: latest.findings.len(),
            groups: group_findings(&latest.findings),
            tests_suggested: latest.tests_suggested.clone(),
        }
    }
}
