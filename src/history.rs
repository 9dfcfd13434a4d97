//! Trend tracking - persist check outcomes to .dashqc-history.json

use crate::{AuditResult, Status};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const HISTORY_FILENAME: &str = ".dashqc-history.json";
const MAX_RUNS: usize = 50;

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct HistoryFile {
    pub runs: Vec<HistoryRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRun {
    pub timestamp: String,
    pub dataset: String,
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
}

/// History lives next to the dataset it describes
pub fn history_dir(dataset_path: &Path) -> PathBuf {
    match dataset_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load history from the directory (or create empty)
pub fn load_history(dir: &Path) -> HistoryFile {
    let path = dir.join(HISTORY_FILENAME);
    if let Ok(content) = fs::read_to_string(&path) {
        if let Ok(history) = serde_json::from_str::<HistoryFile>(&content) {
            return history;
        }
    }
    HistoryFile::default()
}

/// Save history to the directory
pub fn save_history(dir: &Path, history: &HistoryFile) -> std::io::Result<()> {
    let path = dir.join(HISTORY_FILENAME);
    let content = serde_json::to_string_pretty(history).unwrap_or_else(|_| "{}".to_string());
    fs::write(path, content)
}

/// Failed-check count from the most recent run over the same dataset
pub fn previous_failed(history: &HistoryFile, dataset: &str) -> Option<usize> {
    history
        .runs
        .iter()
        .rev()
        .find(|run| run.dataset == dataset)
        .map(|run| run.failed)
}

/// Append a run built from an audit result, keeping the file bounded
pub fn append_run(history: &mut HistoryFile, result: &AuditResult) {
    history.runs.push(HistoryRun {
        timestamp: chrono::Utc::now().to_rfc3339(),
        dataset: result.dataset_path.to_string_lossy().to_string(),
        passed: result.count(Status::Pass),
        warnings: result.count(Status::Warn),
        failed: result.count(Status::Fail),
    });
    if history.runs.len() > MAX_RUNS {
        history.runs.drain(0..history.runs.len() - MAX_RUNS);
    }
}

/// Format delta for console: " [was 3 failing, down 2]" or "" when no prior run
pub fn format_delta(previous: Option<usize>, current: usize) -> String {
    let Some(prev) = previous else {
        return String::new();
    };
    if prev == current {
        return format!(" [unchanged at {} failing]", current);
    }
    if current > prev {
        format!(" [was {} failing, up {}]", prev, current - prev)
    } else {
        format!(" [was {} failing, down {}]", prev, prev - current)
    }
}
