//! Command-line interface module for regmv.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing (clap derive)
//! - Rule list editing (add, delete, generalize)
//! - Filter replacement (blacklist, extension)
//! - Match reporting and transfer orchestration
//!
//! Every handler works on the [`RuleStore`] it is given; `main` passes the
//! file-backed store and the tests pass a fixed in-memory one.

use crate::config::{ConfigError, RuleStore};
use crate::discovery::{self, DiscoveryError};
use crate::generalize::{GeneralizeError, generalize};
use crate::output::OutputFormatter;
use crate::planner::MatchPlanner;
use crate::rules::{
    AnchoredPattern, Rule, RuleChange, RuleError, compile_search_regex, file_name_of,
};
use crate::transfer::{TransferExecutor, TransferMode};
use clap::{ArgAction, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Flag that turns a `move` from a dry run into a real one.
pub const NO_TEST_MODE_FLAG: &str = "--no-test-mode";

/// Errors reported to the user by a command.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Generalize(#[from] GeneralizeError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// A path given on the command line could not be made absolute.
    #[error("Cannot resolve path {}: {source}", .path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The example file passed to `generalize` has no file name.
    #[error("{} has no file name to generalize", .0.display())]
    NoFileName(PathBuf),
    /// At least one entry of a `move` failed.
    #[error("{failed} of {total} file(s) could not be transferred")]
    TransfersFailed { failed: usize, total: usize },
}

/// Move or copy files into directories chosen by an ordered list of regexes.
#[derive(Debug, Parser)]
#[command(name = "regmv", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file to use instead of ~/.move_by_regex/move.conf
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List the rules, preceded by the blacklist and extension filter
    Dashboard {
        /// Leave out the blacklist and extension filter header
        #[arg(long)]
        no_header: bool,
    },

    /// Add a rule, or replace the rule at --index
    Add {
        /// Index to replace, appends a new rule if omitted
        #[arg(long)]
        index: Option<usize>,

        /// Insert before --index instead of replacing it
        #[arg(long, requires = "index")]
        insert: bool,

        /// Directory matching files go to, defaults to the working directory
        #[arg(long, value_name = "DIR")]
        target_parent: Option<PathBuf>,

        /// Regex a file name has to match completely
        regex: String,
    },

    /// Delete the rule at --index
    Delete {
        /// Index of the rule to delete
        #[arg(long)]
        index: usize,
    },

    /// Replace the regex for files never to be considered
    Blacklist {
        /// Regex searched anywhere in a file's path
        regex: String,
    },

    /// Replace the regex for accepted file extensions
    Extension {
        /// Regex the extension (without dot) has to match completely
        regex: String,
    },

    /// Derive a rule from an example file name by wildcarding its numbers
    Generalize {
        /// Index to replace, appends a new rule if omitted
        #[arg(long)]
        index: Option<usize>,

        /// Insert before --index instead of replacing it
        #[arg(long, requires = "index")]
        insert: bool,

        /// Directory matching files go to, defaults to the example file's directory
        #[arg(long, value_name = "DIR")]
        target_parent: Option<PathBuf>,

        /// Example file
        file: PathBuf,
    },

    /// Show which files would go where, without changing anything
    Check {
        /// Files and directories to be scanned
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Move or copy matching files (a dry run unless --no-test-mode is given)
    Move {
        /// Files and directories to be scanned
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Actually change files instead of only reporting
        #[arg(long)]
        no_test_mode: bool,

        /// Copy instead of move
        #[arg(long)]
        copy_files: bool,

        /// Replace files that already exist at the destination
        #[arg(long)]
        overwrite_existing: bool,
    },
}

/// Runs one command against the given rule store.
///
/// # Examples
///
/// ```
/// use regmv::cli::{Command, run_cli};
/// use regmv::config::{FixedRuleStore, RuleStore};
///
/// let mut store = FixedRuleStore::sample();
/// run_cli(Command::Extension { regex: "mkv|avi".to_string() }, &mut store).unwrap();
/// assert_eq!(store.extension_filter().as_str(), "mkv|avi");
/// ```
pub fn run_cli(command: Command, store: &mut dyn RuleStore) -> Result<(), AppError> {
    match command {
        Command::Dashboard { no_header } => {
            show_dashboard(store, !no_header);
            Ok(())
        }
        Command::Add {
            index,
            insert,
            target_parent,
            regex,
        } => add_rule(store, &regex, index, insert, target_parent.as_deref()),
        Command::Delete { index } => delete_rule(store, index),
        Command::Blacklist { regex } => {
            store.set_blacklist(compile_search_regex(&regex)?)?;
            OutputFormatter::success(&format!("Blacklist set to {regex}"));
            Ok(())
        }
        Command::Extension { regex } => {
            store.set_extension_filter(AnchoredPattern::new(&regex)?)?;
            OutputFormatter::success(&format!("Extension filter set to {regex}"));
            Ok(())
        }
        Command::Generalize {
            index,
            insert,
            target_parent,
            file,
        } => generalize_rule(store, &file, index, insert, target_parent.as_deref()),
        Command::Check { files } => check_files(store, &files),
        Command::Move {
            files,
            no_test_mode,
            copy_files,
            overwrite_existing,
        } => move_files(
            store,
            &files,
            TransferMode {
                dry_run: !no_test_mode,
                use_copy: copy_files,
                overwrite: overwrite_existing,
            },
        ),
    }
}

fn show_dashboard(store: &dyn RuleStore, header: bool) {
    OutputFormatter::dashboard(
        store.rules(),
        store.blacklist().as_str(),
        store.extension_filter().as_str(),
        header,
    );
}

/// Adds `pattern` routing to `target_parent` (default: working directory).
pub fn add_rule(
    store: &mut dyn RuleStore,
    pattern: &str,
    index: Option<usize>,
    insert: bool,
    target_parent: Option<&Path>,
) -> Result<(), AppError> {
    let destination = match target_parent {
        Some(dir) => absolute(dir)?,
        None => working_dir()?,
    };
    let rule = Rule::new(pattern, destination)?;
    store_rule(store, rule, index, insert)
}

/// Generalizes the name of `file` and stores the result as a rule.
pub fn generalize_rule(
    store: &mut dyn RuleStore,
    file: &Path,
    index: Option<usize>,
    insert: bool,
    target_parent: Option<&Path>,
) -> Result<(), AppError> {
    let name = file_name_of(file).ok_or_else(|| AppError::NoFileName(file.to_path_buf()))?;
    let pattern = generalize(&name)?;
    OutputFormatter::info(&format!("Generalized {name} to {pattern}"));

    let destination = match target_parent {
        Some(dir) => absolute(dir)?,
        None => absolute(file)?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let rule = Rule {
        pattern,
        destination_dir: destination,
    };
    store_rule(store, rule, index, insert)
}

fn store_rule(
    store: &mut dyn RuleStore,
    rule: Rule,
    index: Option<usize>,
    insert: bool,
) -> Result<(), AppError> {
    let description = format!("{}|{}", rule.pattern, rule.destination_dir.display());
    let mut rules = store.rules().clone();

    let change = match index {
        None => rules.append(rule),
        Some(index) if insert => rules.insert(index, rule)?,
        Some(index) => rules.replace(index, rule)?,
    };

    match change {
        RuleChange::Applied => {
            store.set_rules(rules)?;
            log::info!("Stored rule {description}");
            OutputFormatter::success(&format!("Stored rule {description}"));
        }
        RuleChange::AlreadyPresent => {
            OutputFormatter::warning(&format!(
                "A rule with this regex already exists, nothing changed: {description}"
            ));
        }
    }
    Ok(())
}

/// Removes the rule at `index`. Out of range leaves the store untouched.
pub fn delete_rule(store: &mut dyn RuleStore, index: usize) -> Result<(), AppError> {
    let mut rules = store.rules().clone();
    let removed = rules.remove(index)?;
    store.set_rules(rules)?;
    OutputFormatter::success(&format!(
        "Deleted rule {}|{}",
        removed.pattern,
        removed.destination_dir.display()
    ));
    Ok(())
}

/// Prints where each file would go. Never changes anything.
pub fn check_files(store: &dyn RuleStore, inputs: &[PathBuf]) -> Result<(), AppError> {
    OutputFormatter::plain(&format!("checking in {}:", working_dir()?.display()));

    let files = discovery::list_files(inputs)?;
    let plan = MatchPlanner::from_store(store).plan(&files);

    if plan.is_empty() {
        OutputFormatter::info("No files matched any rule.");
        return Ok(());
    }
    OutputFormatter::matches(&plan);
    OutputFormatter::summary_table(&plan, files.len());
    Ok(())
}

/// Plans and executes transfers for `inputs`.
///
/// # Errors
///
/// Returns `AppError::TransfersFailed` after reporting every entry if at
/// least one of them failed.
pub fn move_files(
    store: &dyn RuleStore,
    inputs: &[PathBuf],
    mode: TransferMode,
) -> Result<(), AppError> {
    let files = discovery::list_files(inputs)?;
    let plan = MatchPlanner::from_store(store).plan(&files);

    if plan.is_empty() {
        OutputFormatter::info("No files matched any rule.");
        return Ok(());
    }

    let mut executor = TransferExecutor::new(mode);
    if !mode.dry_run {
        executor = executor.with_progress(OutputFormatter::create_progress_bar(plan.len() as u64));
    }

    let report = executor.execute(&plan);
    OutputFormatter::transfer_report(&report);

    if report.dry_run {
        OutputFormatter::plain(&format!(
            "Run again with {NO_TEST_MODE_FLAG} to execute the transfer."
        ));
    }

    if report.is_complete_success() {
        Ok(())
    } else {
        Err(AppError::TransfersFailed {
            failed: report.failed(),
            total: report.outcomes.len(),
        })
    }
}

fn working_dir() -> Result<PathBuf, AppError> {
    std::env::current_dir().map_err(|e| AppError::Path {
        path: PathBuf::from("."),
        source: e,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    std::path::absolute(path).map_err(|e| AppError::Path {
        path: path.to_path_buf(),
        source: e,
    })
}
