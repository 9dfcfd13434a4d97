//! Report Verifier: presence checks over the rendered dashboard text.
//!
//! The document is an opaque external artifact. The only question asked of it
//! is "does this literal substring occur" - no parsing, no nesting checks,
//! no counting.

use crate::aggregate::AggregationTree;
use crate::{Check, Finding};
use std::collections::BTreeSet;

/// Structural markers a conforming dashboard must contain, with the display
/// feature each one stands for.
pub const STRUCTURAL_MARKERS: [(&str, &str); 10] = [
    ("student-section", "student sections"),
    ("topic-section", "topic sections"),
    ("subtopic-section", "subtopic sections"),
    ("mistake-pill", "mistake pills"),
    ("frequency-badge", "pill frequency badges"),
    ("marks-badge", "marks badges"),
    ("questionModal", "question detail modal"),
    ("addEventListener", "click event handling"),
    ("parseCSV", "embedded CSV parsing"),
    ("showQuestions", "question display handler"),
];

/// The default marker list as owned strings (extended/trimmed via config).
pub fn default_markers() -> Vec<String> {
    STRUCTURAL_MARKERS
        .iter()
        .map(|(marker, _)| marker.to_string())
        .collect()
}

fn describe(marker: &str) -> Option<&'static str> {
    STRUCTURAL_MARKERS
        .iter()
        .find(|(m, _)| *m == marker)
        .map(|(_, description)| *description)
}

/// Check each marker for literal presence in the document text.
/// An absent marker is flagged and checking continues.
pub fn verify_markers(markers: &[String], document: &str) -> Vec<Finding> {
    markers
        .iter()
        .map(|marker| {
            let label = match describe(marker) {
                Some(description) => format!("{} ('{}')", description, marker),
                None => format!("'{}'", marker),
            };
            if document.contains(marker.as_str()) {
                Finding::pass(Check::Marker, format!("{} present", label))
            } else {
                Finding::fail(Check::Marker, format!("{} not found in document", label))
            }
        })
        .collect()
}

/// Check that the labels the aggregation produced (student ids, topic names,
/// mistake categories) occur somewhere in the document text. Coarser than the
/// structural markers: absences are warnings, since labels may be restyled.
pub fn verify_content(tree: &AggregationTree, document: &str) -> Vec<Finding> {
    let mut labels: BTreeSet<(&str, &str)> = BTreeSet::new();
    for (student, topics) in &tree.topics {
        labels.insert(("student id", student.as_str()));
        for topic in topics.keys() {
            labels.insert(("topic", topic.as_str()));
        }
    }
    for topics in tree.mistakes.values() {
        for subtopics in topics.values() {
            for categories in subtopics.values() {
                for category in categories.keys() {
                    labels.insert(("mistake category", category.as_str()));
                }
            }
        }
    }

    let total = labels.len();
    let mut findings = Vec::new();
    for (kind, label) in labels {
        if !label.is_empty() && !document.contains(label) {
            findings.push(Finding::warn(
                Check::Content,
                format!("{} \"{}\" not found in document", kind, label),
            ));
        }
    }

    if findings.is_empty() && total > 0 {
        findings.push(Finding::pass(
            Check::Content,
            format!("all {} aggregate labels present in document", total),
        ));
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::loader::ResponseRecord;
    use crate::Status;

    fn record(student: &str, topic: &str, category: Option<&str>) -> ResponseRecord {
        ResponseRecord {
            student_id: student.to_string(),
            topic: topic.to_string(),
            subtopic: "Fractions".to_string(),
            skill_level: "Secure".to_string(),
            is_mistake: category.is_some(),
            mistake_category: category.map(str::to_string),
            max_mark: "2".to_string(),
            awarded_mark: "1".to_string(),
            question_text: "Q".to_string(),
            model_solution: "A".to_string(),
            student_answer: "B".to_string(),
        }
    }

    fn full_document() -> String {
        STRUCTURAL_MARKERS
            .iter()
            .map(|(marker, _)| format!("<div class=\"{}\">", marker))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn all_markers_present_all_pass() {
        let findings = verify_markers(&default_markers(), &full_document());
        assert_eq!(findings.len(), STRUCTURAL_MARKERS.len());
        assert!(findings.iter().all(|f| f.status == Status::Pass));
    }

    #[test]
    fn missing_marker_is_flagged_without_aborting() {
        let document = full_document().replace("frequency-badge", "freq");
        let findings = verify_markers(&default_markers(), &document);
        assert_eq!(findings.len(), STRUCTURAL_MARKERS.len());
        let absent: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.status == Status::Fail)
            .collect();
        assert_eq!(absent.len(), 1);
        assert!(absent[0].message.contains("frequency-badge"));
    }

    #[test]
    fn unknown_extra_marker_has_no_description() {
        let markers = vec!["custom-hook".to_string()];
        let findings = verify_markers(&markers, "nothing here");
        assert_eq!(findings[0].message, "'custom-hook' not found in document");
    }

    #[test]
    fn content_labels_checked_against_document() {
        let records = vec![
            record("S1", "Algebra", Some("Sign Error")),
            record("S2", "Geometry", None),
        ];
        let tree = aggregate(&records);

        let document = "S1 Algebra Sign Error S2 Geometry";
        let findings = verify_content(&tree, document);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Pass);

        let partial = "S1 Algebra Sign Error S2";
        let findings = verify_content(&tree, partial);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].status, Status::Warn);
        assert!(findings[0].message.contains("Geometry"));
    }

    #[test]
    fn empty_tree_yields_no_content_findings() {
        let tree = aggregate(&[]);
        assert!(verify_content(&tree, "anything").is_empty());
    }
}
