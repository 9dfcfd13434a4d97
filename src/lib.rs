//! dashqc: Quality control for CSV-driven student performance dashboards
//!
//! This library re-derives the aggregates a student performance dashboard is
//! expected to display (per-student, per-topic, per-subtopic and per-mistake
//! category statistics) from the source CSV, checks them for internal
//! consistency, and verifies that the rendered dashboard contains the
//! structural markers those aggregates should produce.

pub mod aggregate;
pub mod audit;
pub mod config;
pub mod history;
pub mod loader;
pub mod reporter;
pub mod verifier;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The result of auditing one dataset (and optionally its rendered dashboard)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    /// Path to the audited CSV dataset
    pub dataset_path: PathBuf,
    /// Path to the rendered dashboard, when document checks ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    /// Headline counts derived from the dataset
    pub stats: DatasetStats,
    /// Outcome of every check that ran
    pub findings: Vec<Finding>,
}

impl AuditResult {
    pub fn count(&self, status: Status) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(Status::Fail) > 0
    }
}

/// Headline counts for the audited dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStats {
    /// Total response records loaded
    pub records: usize,
    /// Distinct student ids
    pub students: usize,
    /// Distinct topic labels
    pub topics: usize,
    /// Distinct (topic, subtopic) pairs
    pub subtopics: usize,
    /// Records flagged as mistakes
    pub mistake_records: usize,
    /// Distinct mistake category labels
    pub mistake_categories: usize,
}

/// Outcome of a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Check that produced this finding
    pub check: Check,
    /// Pass, warn, or fail
    pub status: Status,
    /// Human-readable message
    pub message: String,
    /// Extra context (affected keys, sample values)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Finding {
    pub fn pass(check: Check, message: impl Into<String>) -> Self {
        Self::new(check, Status::Pass, message)
    }

    pub fn warn(check: Check, message: impl Into<String>) -> Self {
        Self::new(check, Status::Warn, message)
    }

    pub fn fail(check: Check, message: impl Into<String>) -> Self {
        Self::new(check, Status::Fail, message)
    }

    fn new(check: Check, status: Status, message: impl Into<String>) -> Self {
        Self {
            check,
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

/// The checks dashqc runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Check {
    /// Dataset loaded and carries records
    Dataset,
    /// Required columns present in the header
    Columns,
    /// Student section count matches expectation
    Students,
    /// Per-topic totals and mistake rates are coherent
    TopicStats,
    /// Skill level consistent across a (student, topic) pair
    SkillLevel,
    /// Mistake pill frequencies match the underlying records
    Pills,
    /// Mistake records carry the fields the question modal displays
    QuestionDetail,
    /// Structural marker present in the rendered document
    Marker,
    /// Aggregate-derived label present in the rendered document
    Content,
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Check::Dataset => write!(f, "dataset"),
            Check::Columns => write!(f, "columns"),
            Check::Students => write!(f, "students"),
            Check::TopicStats => write!(f, "topic-stats"),
            Check::SkillLevel => write!(f, "skill-level"),
            Check::Pills => write!(f, "pills"),
            Check::QuestionDetail => write!(f, "question-detail"),
            Check::Marker => write!(f, "marker"),
            Check::Content => write!(f, "content"),
        }
    }
}

impl Check {
    /// True for checks that read the rendered document rather than the dataset
    pub fn is_document_check(&self) -> bool {
        matches!(self, Check::Marker | Check::Content)
    }
}

/// Public API: audit a dataset (and optional rendered document) from paths.
///
/// * `dataset` - path to the CSV dataset
/// * `report` - optional path to the rendered dashboard HTML
/// * `config_path` - optional path to .dashqc.json; if None, searches from the dataset's directory
pub fn audit_paths(
    dataset: &Path,
    report: Option<&Path>,
    config_path: Option<&Path>,
) -> anyhow::Result<audit::AuditOutcome> {
    let work_dir = dataset.parent().unwrap_or(Path::new("."));
    let config = config::load_config(work_dir, config_path)?;
    let engine = audit::AuditEngine::from_config(&config);
    Ok(engine.run(dataset, report)?)
}
