//! Configuration loading for dashqc

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".dashqc.json";

/// Root config structure for .dashqc.json. Every field is optional; CLI flags
/// override config values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// CSV dataset to audit
    #[serde(default)]
    pub dataset: Option<PathBuf>,

    /// Rendered dashboard document to check for markers
    #[serde(default)]
    pub report: Option<PathBuf>,

    /// Exit 1 when any check fails
    #[serde(default)]
    pub strict: bool,

    /// Pin the number of student sections the dashboard must show
    #[serde(default)]
    pub expected_students: Option<usize>,

    /// Additional marker substrings to require in the document
    #[serde(default)]
    pub extra_markers: Vec<String>,

    /// Default markers to skip (e.g. when the dashboard drops a feature)
    #[serde(default)]
    pub skip_markers: Vec<String>,
}

impl Config {
    /// CLI flags take precedence over config file values.
    pub fn merge_with_cli(
        mut self,
        dataset: Option<&Path>,
        report: Option<&Path>,
        strict: bool,
    ) -> Self {
        if let Some(dataset) = dataset {
            self.dataset = Some(dataset.to_path_buf());
        }
        if let Some(report) = report {
            self.report = Some(report.to_path_buf());
        }
        if strict {
            self.strict = true;
        }
        self
    }
}

/// Find and load the config file. Searches the given directory then its
/// parents; an explicit `--config` path must exist.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        let path = if p.is_absolute() {
            p.to_path_buf()
        } else {
            work_dir.join(p)
        };
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        Some(path)
    } else {
        find_config_in_parents(work_dir)
    };

    match path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in config: {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Search for .dashqc.json in the directory and its parents
fn find_config_in_parents(mut dir: &Path) -> Option<PathBuf> {
    loop {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Starter config written by `dashqc init`
pub fn starter_config(dataset: Option<&Path>, report: Option<&Path>) -> String {
    let dataset = dataset
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "dataset.csv".to_string());
    let report = report
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "dashboard.html".to_string());
    format!(
        r#"{{
  "dataset": "{}",
  "report": "{}",
  "strict": false,
  "extraMarkers": [],
  "skipMarkers": []
}}
"#,
        dataset, report
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert!(config.dataset.is_none());
        assert!(!config.strict);
        assert!(config.extra_markers.is_empty());
    }

    #[test]
    fn config_found_in_parent_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{ "dataset": "scores.csv", "expectedStudents": 3 }"#,
        )
        .unwrap();
        let nested = dir.path().join("reports/weekly");
        fs::create_dir_all(&nested).unwrap();

        let config = load_config(&nested, None).unwrap();
        assert_eq!(config.dataset, Some(PathBuf::from("scores.csv")));
        assert_eq!(config.expected_students, Some(3));
    }

    #[test]
    fn custom_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path(), Some(Path::new("missing.json"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        fs::write(&path, "{ not json").unwrap();
        let err = load_config(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn cli_overrides_config() {
        let config = Config {
            dataset: Some(PathBuf::from("old.csv")),
            strict: false,
            ..Config::default()
        };
        let merged = config.merge_with_cli(Some(Path::new("new.csv")), None, true);
        assert_eq!(merged.dataset, Some(PathBuf::from("new.csv")));
        assert!(merged.strict);
    }

    #[test]
    fn starter_config_parses_back() {
        let content = starter_config(Some(Path::new("scores.csv")), None);
        let config: Config = serde_json::from_str(&content).unwrap();
        assert_eq!(config.dataset, Some(PathBuf::from("scores.csv")));
        assert_eq!(config.report, Some(PathBuf::from("dashboard.html")));
    }
}
