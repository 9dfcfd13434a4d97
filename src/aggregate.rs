//! Aggregation Engine: builds the nested summary tree the dashboard renders.
//!
//! One pass over the records, upsert semantics throughout. Ordered maps keep
//! enumeration lexicographic on read, matching the dashboard's display order.

use crate::loader::ResponseRecord;
use std::collections::BTreeMap;

/// Per-(student, topic) statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicStats {
    /// Skill level for this (student, topic) pair; last row wins
    pub skill_level: String,
    pub total_count: usize,
    pub mistake_count: usize,
}

impl TopicStats {
    /// Share of this group's records flagged as mistakes, as a percentage.
    /// The original dashboard labels this "accuracy"; higher means worse.
    pub fn mistake_rate(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.mistake_count as f64 / self.total_count as f64 * 100.0
        }
    }
}

/// A (student, topic) pair whose skill level changed between rows.
/// The dataset assumes the level is constant within the pair; when it is not,
/// the last row silently wins in the dashboard and the audit flags the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillConflict {
    pub student_id: String,
    pub topic: String,
    pub previous: String,
    pub replacement: String,
}

/// Records grouped by subtopic, in input order
pub type SubtopicMap = BTreeMap<String, Vec<ResponseRecord>>;
/// Mistake records grouped by subtopic then category, in input order
pub type MistakeMap = BTreeMap<String, BTreeMap<String, Vec<ResponseRecord>>>;

/// The derived, read-only summary for one run. Built once from the full
/// record set, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationTree {
    /// student -> topic -> stats
    pub topics: BTreeMap<String, BTreeMap<String, TopicStats>>,
    /// student -> topic -> subtopic -> records
    pub subtopics: BTreeMap<String, BTreeMap<String, SubtopicMap>>,
    /// student -> topic -> subtopic -> category -> mistake records
    pub mistakes: BTreeMap<String, BTreeMap<String, MistakeMap>>,
    /// Skill-level overwrites observed while building `topics`
    pub skill_conflicts: Vec<SkillConflict>,
}

impl AggregationTree {
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Students present in the dataset, lexicographic
    pub fn student_ids(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    /// Mistakes for one student that carry a category, flattened to
    /// (topic, subtopic, category, records)
    pub fn pills_for_student(
        &self,
        student_id: &str,
    ) -> Vec<(&str, &str, &str, &[ResponseRecord])> {
        let mut pills = Vec::new();
        if let Some(topics) = self.mistakes.get(student_id) {
            for (topic, subtopics) in topics {
                for (subtopic, categories) in subtopics {
                    for (category, records) in categories {
                        pills.push((
                            topic.as_str(),
                            subtopic.as_str(),
                            category.as_str(),
                            records.as_slice(),
                        ));
                    }
                }
            }
        }
        pills
    }
}

/// Build the aggregation tree from the full record set.
///
/// Never fails: the empty sequence produces an empty tree.
pub fn aggregate(records: &[ResponseRecord]) -> AggregationTree {
    let mut tree = AggregationTree::default();

    for record in records {
        let stats = tree
            .topics
            .entry(record.student_id.clone())
            .or_default()
            .entry(record.topic.clone())
            .or_default();
        if stats.total_count > 0 && stats.skill_level != record.skill_level {
            tree.skill_conflicts.push(SkillConflict {
                student_id: record.student_id.clone(),
                topic: record.topic.clone(),
                previous: stats.skill_level.clone(),
                replacement: record.skill_level.clone(),
            });
        }
        stats.skill_level = record.skill_level.clone();
        stats.total_count += 1;
        if record.is_mistake {
            stats.mistake_count += 1;
        }

        tree.subtopics
            .entry(record.student_id.clone())
            .or_default()
            .entry(record.topic.clone())
            .or_default()
            .entry(record.subtopic.clone())
            .or_default()
            .push(record.clone());

        if record.is_mistake {
            if let Some(category) = &record.mistake_category {
                tree.mistakes
                    .entry(record.student_id.clone())
                    .or_default()
                    .entry(record.topic.clone())
                    .or_default()
                    .entry(record.subtopic.clone())
                    .or_default()
                    .entry(category.clone())
                    .or_default()
                    .push(record.clone());
            }
        }
    }

    tree
}
