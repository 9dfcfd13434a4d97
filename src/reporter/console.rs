//! Console reporter with colored output

use crate::aggregate::AggregationTree;
use crate::{AuditResult, Finding, Status};
use colored::Colorize;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Enable verbose output (includes the derived aggregates)
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Report a full audit: findings grouped by target, then the summary
    pub fn report(&self, result: &AuditResult, tree: &AggregationTree, delta: &str) {
        self.print_header(result);

        let (dataset, document): (Vec<&Finding>, Vec<&Finding>) = result
            .findings
            .iter()
            .partition(|f| !f.check.is_document_check());

        self.print_findings("Dataset checks:", &dataset);
        if let Some(ref report) = result.report_path {
            self.print_findings(
                &format!("Document checks: {}", report.display()),
                &document,
            );
        }

        if self.verbose {
            self.print_tree(tree);
        }

        self.print_summary(result, delta);
    }

    /// Report in quiet mode (one line)
    pub fn report_quiet(&self, result: &AuditResult, delta: &str) {
        println!(
            "{}: {} passed, {} warnings, {} failed{}",
            result.dataset_path.display(),
            result.count(Status::Pass),
            result.count(Status::Warn),
            result.count(Status::Fail),
            delta
        );
    }

    fn print_header(&self, result: &AuditResult) {
        println!();
        println!(
            "{}",
            format!("📋 Dashboard QC: {}", result.dataset_path.display()).bold()
        );
        let stats = &result.stats;
        println!(
            "   Records: {} | Students: {} | Topics: {} | Subtopics: {} | Mistakes: {} ({} categories)",
            stats.records,
            stats.students,
            stats.topics,
            stats.subtopics,
            stats.mistake_records,
            stats.mistake_categories
        );
        println!();
    }

    fn print_findings(&self, title: &str, findings: &[&Finding]) {
        if findings.is_empty() {
            return;
        }
        println!("   {}", title.bold());
        for finding in findings {
            let icon = match finding.status {
                Status::Pass => "✓".green(),
                Status::Warn => "⚠".yellow(),
                Status::Fail => "✗".red(),
            };
            println!(
                "   {} {} {}",
                icon,
                format!("[{}]", finding.check).dimmed(),
                finding.message
            );
            if let Some(ref detail) = finding.detail {
                if self.verbose || finding.status != Status::Pass {
                    println!("       {} {}", "→".dimmed(), detail.dimmed());
                }
            }
        }
        println!();
    }

    fn print_tree(&self, tree: &AggregationTree) {
        if tree.is_empty() {
            return;
        }
        println!("   {}", "Derived aggregates:".bold());
        for (student, topics) in &tree.topics {
            println!("   {}", format!("Student {}", student).cyan().bold());
            for (topic, stats) in topics {
                let level = if stats.skill_level.is_empty() {
                    "no skill level".to_string()
                } else {
                    stats.skill_level.clone()
                };
                println!(
                    "     {} [{}] - {} questions, {} mistakes ({:.1}% mistake rate)",
                    topic,
                    level,
                    stats.total_count,
                    stats.mistake_count,
                    stats.mistake_rate()
                );
                if let Some(subtopics) = tree.subtopics.get(student).and_then(|t| t.get(topic)) {
                    for (subtopic, records) in subtopics {
                        println!(
                            "       {} {} question(s)",
                            format!("{}:", subtopic).dimmed(),
                            records.len()
                        );
                        if let Some(categories) = tree
                            .mistakes
                            .get(student)
                            .and_then(|t| t.get(topic))
                            .and_then(|s| s.get(subtopic))
                        {
                            for (category, bucket) in categories {
                                println!(
                                    "         {} {}",
                                    format!("[{}x]", bucket.len()).yellow(),
                                    category
                                );
                            }
                        }
                    }
                }
            }
        }
        println!();
    }

    fn print_summary(&self, result: &AuditResult, delta: &str) {
        let passed = result.count(Status::Pass);
        let warnings = result.count(Status::Warn);
        let failed = result.count(Status::Fail);

        println!("{}", "═".repeat(60));
        println!("{}", "Summary".bold());
        println!("{}", "═".repeat(60));
        println!("   Passed:   {}", passed.to_string().green().bold());
        if warnings > 0 {
            println!("   Warnings: {}", warnings.to_string().yellow().bold());
        }
        if failed > 0 {
            println!("   Failed:   {}{}", failed.to_string().red().bold(), delta);
        } else {
            println!("   Failed:   {}{}", "0".green(), delta);
        }
        println!();
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}
