//! Audit engine: runs the display-requirement checklist over a dataset and,
//! when a report path is given, over the rendered dashboard document.

use crate::aggregate::{aggregate, AggregationTree};
use crate::config::Config;
use crate::loader::{self, DataSourceError, LoadedDataset, ResponseRecord, REQUIRED_COLUMNS};
use crate::verifier;
use crate::{AuditResult, Check, DatasetStats, Finding};
use std::collections::BTreeSet;
use std::path::Path;

/// An audit result together with the tree it was derived from.
/// The tree is kept for verbose reporting; it is not serialized.
#[derive(Debug)]
pub struct AuditOutcome {
    pub result: AuditResult,
    pub tree: AggregationTree,
}

/// Runs the checklist. Construct via [`AuditEngine::new`] for defaults or
/// [`AuditEngine::from_config`] to apply marker and expectation overrides.
pub struct AuditEngine {
    expected_students: Option<usize>,
    markers: Vec<String>,
}

impl AuditEngine {
    pub fn new() -> Self {
        Self {
            expected_students: None,
            markers: verifier::default_markers(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut markers = verifier::default_markers();
        markers.retain(|m| !config.skip_markers.contains(m));
        for extra in &config.extra_markers {
            if !markers.contains(extra) {
                markers.push(extra.clone());
            }
        }
        Self {
            expected_students: config.expected_students,
            markers,
        }
    }

    /// Load, aggregate, and check. Fatal only when an input file cannot be
    /// read; every checklist outcome is a finding, not an error.
    pub fn run(
        &self,
        dataset_path: &Path,
        report_path: Option<&Path>,
    ) -> Result<AuditOutcome, DataSourceError> {
        let loaded = loader::load_dataset(dataset_path)?;
        let tree = aggregate(&loaded.records);

        let mut findings = Vec::new();
        self.check_columns(&loaded, &mut findings);
        self.check_dataset(&loaded, &mut findings);
        self.check_students(&tree, &mut findings);
        self.check_topic_stats(&loaded.records, &tree, &mut findings);
        self.check_skill_levels(&tree, &mut findings);
        self.check_pills(&loaded.records, &tree, &mut findings);
        self.check_question_detail(&tree, &mut findings);

        if let Some(report) = report_path {
            let document =
                std::fs::read_to_string(report).map_err(|source| DataSourceError::Open {
                    path: report.to_path_buf(),
                    source,
                })?;
            findings.extend(verifier::verify_markers(&self.markers, &document));
            findings.extend(verifier::verify_content(&tree, &document));
        }

        let result = AuditResult {
            dataset_path: dataset_path.to_path_buf(),
            report_path: report_path.map(Path::to_path_buf),
            stats: dataset_stats(&loaded.records),
            findings,
        };
        Ok(AuditOutcome { result, tree })
    }

    fn check_columns(&self, loaded: &LoadedDataset, findings: &mut Vec<Finding>) {
        if loaded.missing_columns.is_empty() {
            findings.push(Finding::pass(
                Check::Columns,
                format!("all {} required columns present", REQUIRED_COLUMNS.len()),
            ));
            return;
        }
        for column in &loaded.missing_columns {
            findings.push(Finding::warn(
                Check::Columns,
                format!(
                    "column '{}' missing from header; values treated as empty",
                    column
                ),
            ));
        }
    }

    fn check_dataset(&self, loaded: &LoadedDataset, findings: &mut Vec<Finding>) {
        findings.push(Finding::pass(
            Check::Dataset,
            format!("dataset loaded: {} records", loaded.records.len()),
        ));
    }

    fn check_students(&self, tree: &AggregationTree, findings: &mut Vec<Finding>) {
        let ids: Vec<&str> = tree.student_ids().collect();
        let listing = ids.join(", ");
        match self.expected_students {
            Some(expected) if expected != ids.len() => findings.push(
                Finding::fail(
                    Check::Students,
                    format!("expected {} student sections, found {}", expected, ids.len()),
                )
                .with_detail(listing),
            ),
            Some(expected) => findings.push(
                Finding::pass(
                    Check::Students,
                    format!("{} student sections as expected", expected),
                )
                .with_detail(listing),
            ),
            None => findings.push(
                Finding::pass(Check::Students, format!("{} student sections", ids.len()))
                    .with_detail(listing),
            ),
        }
    }

    fn check_topic_stats(
        &self,
        records: &[ResponseRecord],
        tree: &AggregationTree,
        findings: &mut Vec<Finding>,
    ) {
        let mut groups = 0;
        let mut out_of_bounds = Vec::new();
        for (student, topics) in &tree.topics {
            for (topic, stats) in topics {
                groups += 1;
                let rate = stats.mistake_rate();
                if !(0.0..=100.0).contains(&rate) {
                    out_of_bounds.push(format!("{}/{} ({:.1}%)", student, topic, rate));
                }
            }
        }

        let mut mismatched = Vec::new();
        for (student, topics) in &tree.topics {
            let summed: usize = topics.values().map(|s| s.mistake_count).sum();
            let filtered = records
                .iter()
                .filter(|r| &r.student_id == student && r.is_mistake)
                .count();
            if summed != filtered {
                mismatched.push(format!("{} (tree {}, records {})", student, summed, filtered));
            }
        }

        if out_of_bounds.is_empty() && mismatched.is_empty() {
            findings.push(Finding::pass(
                Check::TopicStats,
                format!(
                    "{} (student, topic) groups; mistake rates within 0-100% and totals match the records",
                    groups
                ),
            ));
            return;
        }
        if !out_of_bounds.is_empty() {
            findings.push(
                Finding::fail(Check::TopicStats, "mistake rate out of bounds")
                    .with_detail(out_of_bounds.join("; ")),
            );
        }
        if !mismatched.is_empty() {
            findings.push(
                Finding::fail(
                    Check::TopicStats,
                    "per-student mistake totals do not match the records",
                )
                .with_detail(mismatched.join("; ")),
            );
        }
    }

    fn check_skill_levels(&self, tree: &AggregationTree, findings: &mut Vec<Finding>) {
        for conflict in &tree.skill_conflicts {
            findings.push(Finding::warn(
                Check::SkillLevel,
                format!(
                    "skill level for {}/{} changed from \"{}\" to \"{}\"; the dashboard shows the last value",
                    conflict.student_id, conflict.topic, conflict.previous, conflict.replacement
                ),
            ));
        }

        let mut unlabelled = Vec::new();
        for (student, topics) in &tree.topics {
            for (topic, stats) in topics {
                if stats.skill_level.is_empty() {
                    unlabelled.push(format!("{}/{}", student, topic));
                }
            }
        }
        if !unlabelled.is_empty() {
            findings.push(
                Finding::warn(
                    Check::SkillLevel,
                    format!("{} topic group(s) carry no skill level", unlabelled.len()),
                )
                .with_detail(unlabelled.join("; ")),
            );
        }

        if tree.skill_conflicts.is_empty() && unlabelled.is_empty() && !tree.is_empty() {
            findings.push(Finding::pass(
                Check::SkillLevel,
                "skill levels consistent across rows",
            ));
        }
    }

    fn check_pills(
        &self,
        records: &[ResponseRecord],
        tree: &AggregationTree,
        findings: &mut Vec<Finding>,
    ) {
        let mut pills = 0;
        let mut mismatched = Vec::new();
        for (student, topics) in &tree.mistakes {
            for (topic, subtopics) in topics {
                for (subtopic, categories) in subtopics {
                    for (category, bucket) in categories {
                        pills += 1;
                        let filtered = records
                            .iter()
                            .filter(|r| {
                                &r.student_id == student
                                    && &r.topic == topic
                                    && &r.subtopic == subtopic
                                    && r.is_mistake
                                    && r.mistake_category.as_deref() == Some(category.as_str())
                            })
                            .count();
                        if bucket.len() != filtered {
                            mismatched.push(format!(
                                "{}/{}/{}/{} (pill {}, records {})",
                                student,
                                topic,
                                subtopic,
                                category,
                                bucket.len(),
                                filtered
                            ));
                        }
                    }
                }
            }
        }

        let uncategorized = records
            .iter()
            .filter(|r| r.is_mistake && r.mistake_category.is_none())
            .count();

        if mismatched.is_empty() {
            let mut message = format!("{} mistake pills; frequencies match the records", pills);
            if uncategorized > 0 {
                message.push_str(&format!(
                    " ({} mistake(s) carry no category and appear in no pill)",
                    uncategorized
                ));
            }
            findings.push(Finding::pass(Check::Pills, message));
        } else {
            findings.push(
                Finding::fail(
                    Check::Pills,
                    "pill frequencies do not match the underlying records",
                )
                .with_detail(mismatched.join("; ")),
            );
        }
    }

    fn check_question_detail(&self, tree: &AggregationTree, findings: &mut Vec<Finding>) {
        let mut incomplete = 0;
        let mut missing_fields: BTreeSet<&str> = BTreeSet::new();
        let mut total = 0;
        for student in tree.student_ids() {
            for (_, _, _, bucket) in tree.pills_for_student(student) {
                for record in bucket {
                    total += 1;
                    let fields = [
                        ("question text", record.question_text.as_str()),
                        ("model solution", record.model_solution.as_str()),
                        ("student answer", record.student_answer.as_str()),
                        ("maximum mark", record.max_mark.as_str()),
                        ("awarded mark", record.awarded_mark.as_str()),
                    ];
                    let empty: Vec<&str> = fields
                        .iter()
                        .filter(|(_, value)| value.is_empty())
                        .map(|(name, _)| *name)
                        .collect();
                    if !empty.is_empty() {
                        incomplete += 1;
                        missing_fields.extend(empty);
                    }
                }
            }
        }

        if incomplete == 0 {
            findings.push(Finding::pass(
                Check::QuestionDetail,
                format!(
                    "all {} pill records carry question, solution, answer, and marks",
                    total
                ),
            ));
        } else {
            let fields: Vec<&str> = missing_fields.into_iter().collect();
            findings.push(
                Finding::warn(
                    Check::QuestionDetail,
                    format!(
                        "{} of {} pill records lack display fields",
                        incomplete, total
                    ),
                )
                .with_detail(fields.join(", ")),
            );
        }
    }
}

impl Default for AuditEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn dataset_stats(records: &[ResponseRecord]) -> DatasetStats {
    let students: BTreeSet<&str> = records.iter().map(|r| r.student_id.as_str()).collect();
    let topics: BTreeSet<&str> = records.iter().map(|r| r.topic.as_str()).collect();
    let subtopics: BTreeSet<(&str, &str)> = records
        .iter()
        .map(|r| (r.topic.as_str(), r.subtopic.as_str()))
        .collect();
    let categories: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.mistake_category.as_deref())
        .collect();
    DatasetStats {
        records: records.len(),
        students: students.len(),
        topics: topics.len(),
        subtopics: subtopics.len(),
        mistake_records: records.iter().filter(|r| r.is_mistake).count(),
        mistake_categories: categories.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "student_id,Topic,Subtopic,mistake category,topical skill level,maximum_mark,mark_awarded,Mistake?,q_text,model solution,student answer";

    fn write_dataset(dir: &TempDir, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("data.csv");
        let mut content = String::from(HEADER);
        content.push('\n');
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(&path, content).unwrap();
        path
    }

    const ROWS: [&str; 4] = [
        "S1,Algebra,Linear Equations,Sign Error,Developing,3,1,y,Solve 2x=6,x=3,x=-3",
        "S1,Algebra,Linear Equations,Sign Error,Developing,3,2,y,Solve 3x=9,x=3,x=-3",
        "S1,Algebra,Linear Equations,,Developing,2,2,n,Solve x=1,x=1,x=1",
        "S2,Geometry,Angles,,Secure,2,2,n,Find angle,90,90",
    ];

    #[test]
    fn clean_dataset_audits_without_failures() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, &ROWS);

        let outcome = AuditEngine::new().run(&path, None).unwrap();
        let result = &outcome.result;

        assert!(!result.has_failures());
        assert_eq!(result.stats.records, 4);
        assert_eq!(result.stats.students, 2);
        assert_eq!(result.stats.mistake_records, 2);
        assert_eq!(result.stats.mistake_categories, 1);
        assert!(result
            .findings
            .iter()
            .all(|f| !f.check.is_document_check()));
    }

    #[test]
    fn expected_student_count_mismatch_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, &ROWS);

        let config = Config {
            expected_students: Some(3),
            ..Config::default()
        };
        let outcome = AuditEngine::from_config(&config).run(&path, None).unwrap();
        let students = outcome
            .result
            .findings
            .iter()
            .find(|f| f.check == Check::Students)
            .unwrap();
        assert_eq!(students.status, Status::Fail);
        assert!(students.message.contains("expected 3"));
    }

    #[test]
    fn skill_conflict_surfaces_as_warning() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(
            &dir,
            &[
                "S1,Algebra,Fractions,,Developing,2,2,n,Q,A,B",
                "S1,Algebra,Decimals,,Secure,2,2,n,Q,A,B",
            ],
        );

        let outcome = AuditEngine::new().run(&path, None).unwrap();
        let warns: Vec<&Finding> = outcome
            .result
            .findings
            .iter()
            .filter(|f| f.check == Check::SkillLevel && f.status == Status::Warn)
            .collect();
        assert_eq!(warns.len(), 1);
        assert!(warns[0].message.contains("the dashboard shows the last value"));
    }

    #[test]
    fn missing_report_marker_is_flagged_and_checks_continue() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, &ROWS);
        let report = dir.path().join("dashboard.html");
        fs::write(
            &report,
            "<div class=\"student-section topic-section subtopic-section mistake-pill marks-badge\">\
             <script>questionModal addEventListener parseCSV showQuestions</script>\
             S1 S2 Algebra Geometry Sign Error",
        )
        .unwrap();

        let outcome = AuditEngine::new().run(&path, Some(&report)).unwrap();
        let result = &outcome.result;

        let absent: Vec<&Finding> = result
            .findings
            .iter()
            .filter(|f| f.check == Check::Marker && f.status == Status::Fail)
            .collect();
        assert_eq!(absent.len(), 1);
        assert!(absent[0].message.contains("frequency-badge"));

        // the remaining markers and the content labels were still checked
        let marker_count = result
            .findings
            .iter()
            .filter(|f| f.check == Check::Marker)
            .count();
        assert_eq!(marker_count, 10);
        assert!(result
            .findings
            .iter()
            .any(|f| f.check == Check::Content && f.status == Status::Pass));
    }

    #[test]
    fn unreadable_report_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_dataset(&dir, &ROWS);
        let err = AuditEngine::new()
            .run(&path, Some(&dir.path().join("missing.html")))
            .unwrap_err();
        assert!(matches!(err, DataSourceError::Open { .. }));
    }

    #[test]
    fn config_markers_extend_and_skip() {
        let config = Config {
            extra_markers: vec!["export-button".to_string()],
            skip_markers: vec!["parseCSV".to_string()],
            ..Config::default()
        };
        let engine = AuditEngine::from_config(&config);
        assert!(engine.markers.contains(&"export-button".to_string()));
        assert!(!engine.markers.contains(&"parseCSV".to_string()));
    }

    #[test]
    fn missing_columns_warn_per_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "student_id,Topic,Subtopic,Mistake?\nS1,Algebra,Fractions,y\n").unwrap();

        let outcome = AuditEngine::new().run(&path, None).unwrap();
        let column_warns = outcome
            .result
            .findings
            .iter()
            .filter(|f| f.check == Check::Columns && f.status == Status::Warn)
            .count();
        assert_eq!(column_warns, 7);
        assert!(!outcome.result.has_failures());
    }
}
