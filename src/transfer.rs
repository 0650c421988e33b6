//! Execution of a transfer plan.
//!
//! Every entry is validated before anything on disk changes: an existing
//! destination is never replaced unless overwriting was requested, the source
//! must be readable, and an existing destination must be writable. Entries
//! that pass get their destination directory created and are then moved or
//! copied one by one. A failing entry never stops the others, and nothing is
//! rolled back; the returned [`TransferReport`] records what happened to each.

use crate::planner::{PlannedTransfer, TransferPlan};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a single entry was not transferred.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The destination exists and overwriting was not requested.
    #[error(
        "File at \"{}\" already exists, use flag --overwrite-existing to overwrite regardless",
        .0.display()
    )]
    AlreadyExists(PathBuf),
    /// An earlier entry of the same batch already targets this destination.
    #[error("\"{}\" is already the destination of another file in this run", .0.display())]
    DuplicateDestination(PathBuf),
    /// The source file cannot be opened for reading.
    #[error("Cannot read source file at {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The destination exists but is read-only.
    #[error("Cannot write target file at {}", .0.display())]
    TargetUnwritable(PathBuf),
    /// The destination directory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A move fell back to copying, the copy is in place but the source
    /// could not be removed.
    #[error(
        "Copied {} to {} but could not remove the source ({source}), remove it by hand",
        .from.display(),
        .to.display()
    )]
    SourceNotRemoved {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The move or copy itself failed.
    #[error("Failed to transfer {} to {}: {source}", .from.display(), .to.display())]
    TransferFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a plan is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferMode {
    /// Only report; touch nothing.
    pub dry_run: bool,
    /// Copy instead of move, leaving sources in place.
    pub use_copy: bool,
    /// Replace destinations that already exist.
    pub overwrite: bool,
}

impl Default for TransferMode {
    fn default() -> Self {
        Self {
            dry_run: true,
            use_copy: false,
            overwrite: false,
        }
    }
}

/// What happened to one entry.
#[derive(Debug)]
pub enum TransferStatus {
    Moved,
    Copied,
    SkippedDryRun,
    /// Source and destination are the same file; nothing was done.
    AlreadyInPlace,
    Failed(TransferError),
}

/// Result for one planned entry.
#[derive(Debug)]
pub struct TransferOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: TransferStatus,
}

impl TransferOutcome {
    fn new(entry: &PlannedTransfer, status: TransferStatus) -> Self {
        Self {
            source: entry.source.clone(),
            destination: entry.destination.clone(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, TransferStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&TransferError> {
        match &self.status {
            TransferStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcome of executing a whole plan.
#[derive(Debug, Default)]
pub struct TransferReport {
    /// One outcome per plan entry, in plan order.
    pub outcomes: Vec<TransferOutcome>,
    /// Destination directories that had to be created.
    pub created_dirs: Vec<PathBuf>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl TransferReport {
    fn count(&self, predicate: impl Fn(&TransferStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn moved(&self) -> usize {
        self.count(|s| matches!(s, TransferStatus::Moved))
    }

    pub fn copied(&self) -> usize {
        self.count(|s| matches!(s, TransferStatus::Copied))
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Sources a dry run would have transferred.
    pub fn would_transfer(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TransferStatus::SkippedDryRun))
            .map(|o| o.source.as_path())
            .collect()
    }

    /// Returns true if no entry failed.
    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Validates and performs the transfers of a plan.
pub struct TransferExecutor {
    mode: TransferMode,
    progress: Option<ProgressBar>,
}

impl TransferExecutor {
    pub fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            progress: None,
        }
    }

    /// Advances `progress` once per entry actually transferred.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Executes `plan` according to the configured mode.
    ///
    /// In dry-run mode only the read-only validation runs: entries that would
    /// fail are reported as failed and all others as skipped. No file or
    /// directory is created, moved or copied.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use regmv::planner::TransferPlan;
    /// use regmv::transfer::{TransferExecutor, TransferMode};
    ///
    /// let plan = TransferPlan::new();
    /// let mode = TransferMode { dry_run: false, use_copy: true, overwrite: false };
    /// let report = TransferExecutor::new(mode).execute(&plan);
    /// println!("copied {} file(s)", report.copied());
    /// ```
    pub fn execute(&self, plan: &TransferPlan) -> TransferReport {
        let checks = self.validate(plan);
        let mut report = TransferReport {
            dry_run: self.mode.dry_run,
            ..TransferReport::default()
        };

        if self.mode.dry_run {
            report.outcomes = plan
                .iter()
                .zip(checks)
                .map(|(entry, check)| match check {
                    Ok(()) => TransferOutcome::new(entry, TransferStatus::SkippedDryRun),
                    Err(e) => TransferOutcome::new(entry, TransferStatus::Failed(e)),
                })
                .collect();
            log::info!(
                "Dry run: {} of {} transfer(s) would be performed",
                report.would_transfer().len(),
                plan.len()
            );
            return report;
        }

        // Destination directories are created for every valid entry up front.
        let checks: Vec<_> = plan
            .iter()
            .zip(checks)
            .map(|(entry, check)| {
                check.and_then(|()| Self::ensure_parent(entry, &mut report.created_dirs))
            })
            .collect();

        for (entry, check) in plan.iter().zip(checks) {
            let status = match check {
                Ok(()) => self.transfer(entry),
                Err(e) => TransferStatus::Failed(e),
            };
            if let TransferStatus::Failed(ref e) = status {
                log::warn!("{e}");
            }
            report.outcomes.push(TransferOutcome::new(entry, status));
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }
        report
    }

    /// Runs the precondition checks for every entry without side effects.
    pub fn validate(&self, plan: &TransferPlan) -> Vec<Result<(), TransferError>> {
        let mut claimed = HashSet::new();
        plan.iter()
            .map(|entry| {
                check_preconditions(entry, self.mode.overwrite)?;
                if !claimed.insert(entry.destination.clone()) {
                    return Err(TransferError::DuplicateDestination(
                        entry.destination.clone(),
                    ));
                }
                Ok(())
            })
            .collect()
    }

    fn ensure_parent(
        entry: &PlannedTransfer,
        created: &mut Vec<PathBuf>,
    ) -> Result<(), TransferError> {
        let Some(parent) = entry.destination.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }

        log::info!("Creating directory {}", parent.display());
        fs::create_dir_all(parent).map_err(|e| TransferError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
        created.push(parent.to_path_buf());
        Ok(())
    }

    fn transfer(&self, entry: &PlannedTransfer) -> TransferStatus {
        if let Some(progress) = &self.progress
            && let Some(name) = entry.source.file_name()
        {
            progress.set_message(name.to_string_lossy().into_owned());
        }

        if is_same_file(&entry.source, &entry.destination) {
            log::info!("{} is already in place", entry.source.display());
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
            return TransferStatus::AlreadyInPlace;
        }

        let (result, done) = if self.mode.use_copy {
            (
                copy_replacing(&entry.source, &entry.destination),
                TransferStatus::Copied,
            )
        } else {
            (
                move_replacing(&entry.source, &entry.destination),
                TransferStatus::Moved,
            )
        };

        if let Some(progress) = &self.progress {
            progress.inc(1);
        }

        match result {
            Ok(()) => {
                log::info!(
                    "{} {} -> {}",
                    if self.mode.use_copy { "Copied" } else { "Moved" },
                    entry.source.display(),
                    entry.destination.display()
                );
                done
            }
            Err(e) => TransferStatus::Failed(e),
        }
    }
}

/// Checks one entry in the fixed order: existing destination, readable
/// source, writable destination.
fn check_preconditions(entry: &PlannedTransfer, overwrite: bool) -> Result<(), TransferError> {
    let destination_exists = entry.destination.exists();

    if destination_exists && !overwrite {
        return Err(TransferError::AlreadyExists(entry.destination.clone()));
    }

    File::open(&entry.source).map_err(|e| TransferError::SourceUnreadable {
        path: entry.source.clone(),
        source: e,
    })?;

    if destination_exists && is_read_only(&entry.destination) {
        return Err(TransferError::TargetUnwritable(entry.destination.clone()));
    }

    Ok(())
}

fn is_read_only(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.permissions().readonly())
        .unwrap_or(false)
}

/// True if both paths resolve to the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Renames `from` over `to`, falling back to copy and delete when the rename
/// is refused, e.g. across filesystems.
fn move_replacing(from: &Path, to: &Path) -> Result<(), TransferError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::debug!(
                "Rename of {} failed ({e}), falling back to copy and remove",
                from.display()
            );
            copy_then_remove(from, to)
        }
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> Result<(), TransferError> {
    copy_replacing(from, to)?;
    fs::remove_file(from).map_err(|e| TransferError::SourceNotRemoved {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })
}

/// Copies `from` into a fresh temporary file next to `to`, then renames it
/// into place so an existing destination is swapped in one step. The
/// temporary file is removed again if anything fails.
fn copy_replacing(from: &Path, to: &Path) -> Result<(), TransferError> {
    let failed = |source: io::Error| TransferError::TransferFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let parent = match to.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".regmv-")
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(failed)?;

    fs::copy(from, staging.path()).map_err(failed)?;
    staging.persist(to).map_err(|e| failed(e.error))?;
    Ok(())
}
