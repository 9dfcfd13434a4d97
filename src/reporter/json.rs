//! JSON reporter for machine-readable output

use crate::{AuditResult, Status};
use serde::Serialize;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Report an audit result as JSON, with summary counts
    pub fn report(&self, result: &AuditResult) -> String {
        let output = JsonOutput {
            result,
            summary: JsonSummary {
                passed: result.count(Status::Pass),
                warnings: result.count(Status::Warn),
                failed: result.count(Status::Fail),
            },
        };

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    #[serde(flatten)]
    result: &'a AuditResult,
    summary: JsonSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    passed: usize,
    warnings: usize,
    failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Check, DatasetStats, Finding};
    use std::path::PathBuf;

    fn make_result() -> AuditResult {
        AuditResult {
            dataset_path: PathBuf::from("data.csv"),
            report_path: None,
            stats: DatasetStats {
                records: 4,
                students: 2,
                ..DatasetStats::default()
            },
            findings: vec![
                Finding::pass(Check::Dataset, "dataset loaded: 4 records"),
                Finding::fail(Check::Marker, "marker absent"),
            ],
        }
    }

    #[test]
    fn output_is_valid_json_with_summary() {
        let reporter = JsonReporter::new();
        let output = reporter.report(&make_result());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["passed"], 1);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["stats"]["records"], 4);
        assert_eq!(value["findings"][1]["check"], "marker");
        assert_eq!(value["findings"][1]["status"], "fail");
    }

    #[test]
    fn pretty_output_is_multiline() {
        let reporter = JsonReporter::new().pretty();
        let output = reporter.report(&make_result());
        assert!(output.contains('\n'));
        let _: serde_json::Value = serde_json::from_str(&output).unwrap();
    }
}
