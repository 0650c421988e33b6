//! Output formatting and styling module.
//!
//! All user-facing terminal output goes through [`OutputFormatter`], so the
//! command handlers never format colors or progress bars themselves.
//! Diagnostics for troubleshooting go through the `log` macros instead.

use crate::planner::TransferPlan;
use crate::rules::RuleList;
use crate::transfer::{TransferReport, TransferStatus};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use regmv::output::OutputFormatter;
    /// OutputFormatter::success("Rule added");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for a batch of transfers.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use regmv::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints the filters and the numbered rule list.
    pub fn dashboard(rules: &RuleList, blacklist: &str, extension_filter: &str, header: bool) {
        if header {
            println!("{} {}", "blacklist:".bold(), blacklist);
            println!("{} {}", "extension filter:".bold(), extension_filter);
        }
        for (index, rule) in rules.iter().enumerate() {
            println!(
                "{}: {}|{}",
                index.to_string().cyan(),
                rule.pattern,
                rule.destination_dir.display()
            );
        }
    }

    /// Prints one `MATCH:` line per planned transfer.
    pub fn matches(plan: &TransferPlan) {
        for entry in plan {
            println!(
                "{} {}  ==>  {}",
                "MATCH:".green(),
                entry.source.display(),
                entry.destination.display()
            );
        }
    }

    /// Prints how many planned files each destination directory receives.
    pub fn summary_table(plan: &TransferPlan, candidates: usize) {
        Self::header("SUMMARY");

        let mut per_directory: BTreeMap<&Path, usize> = BTreeMap::new();
        for entry in plan {
            let dir = entry.destination.parent().unwrap_or(Path::new(""));
            *per_directory.entry(dir).or_insert(0) += 1;
        }

        let max_dir_len = per_directory
            .keys()
            .map(|dir| dir.display().to_string().len())
            .max()
            .unwrap_or(0)
            .max(11); // At least "Destination" width

        println!(
            "{:<width$} | {}",
            "Destination".bold(),
            "Files".bold(),
            width = max_dir_len
        );
        println!("{}", "-".repeat(max_dir_len + 10));

        for (dir, count) in &per_directory {
            println!(
                "{:<width$} | {} {}",
                dir.display().to_string(),
                count.to_string().green(),
                plural(*count),
                width = max_dir_len
            );
        }

        println!("{}", "-".repeat(max_dir_len + 10));
        println!(
            "{:<width$} | {} of {} {}",
            "Matched".bold(),
            plan.len().to_string().green().bold(),
            candidates,
            plural(candidates),
            width = max_dir_len
        );
    }

    /// Prints the per-entry results of an executed plan.
    pub fn transfer_report(report: &TransferReport) {
        if report.dry_run {
            let sources: Vec<String> = report
                .would_transfer()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            Self::dry_run_notice(&format!(
                "Test mode is active, so no files will be moved / copied. Use --no-test-mode to move. Files would have been: {}",
                sources.join(";")
            ));
        }

        for dir in &report.created_dirs {
            Self::info(&format!("Created directory {}", dir.display()));
        }

        for outcome in &report.outcomes {
            match &outcome.status {
                TransferStatus::Moved => Self::success(&format!(
                    "Moved {} to {}",
                    outcome.source.display(),
                    outcome.destination.display()
                )),
                TransferStatus::Copied => Self::success(&format!(
                    "Copied {} to {}",
                    outcome.source.display(),
                    outcome.destination.display()
                )),
                TransferStatus::AlreadyInPlace => Self::info(&format!(
                    "{} is already in place",
                    outcome.source.display()
                )),
                TransferStatus::SkippedDryRun => {}
                TransferStatus::Failed(e) => Self::error(&e.to_string()),
            }
        }

        if !report.is_complete_success() {
            Self::warning(&format!(
                "{} of {} {} could not be transferred",
                report.failed(),
                report.outcomes.len(),
                plural(report.outcomes.len())
            ));
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
