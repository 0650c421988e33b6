//! Expands command-line inputs into the list of candidate files.
//!
//! Files are taken as given, directories are walked recursively, and
//! patterns the shell left unexpanded (`*.mkv` on Windows, or quoted) are
//! expanded with `glob`. The result order follows the inputs, with each
//! directory walked in file-name order, so planning sees a stable sequence.

use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while listing input files.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The input is neither an existing path nor a glob pattern.
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The input looked like a glob pattern but could not be parsed.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },
    /// A directory below an input could not be read.
    #[error("Error walking {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Lists all regular files reachable from `inputs`, without duplicates.
///
/// # Errors
///
/// Fails on the first input that does not exist and expands to nothing,
/// and on unreadable directories.
pub fn list_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        for path in expand_input(input)? {
            for file in regular_files_below(&path)? {
                if seen.insert(file.clone()) {
                    files.push(file);
                }
            }
        }
    }

    log::debug!(
        "Discovered {} file(s) from {} input(s)",
        files.len(),
        inputs.len()
    );
    Ok(files)
}

/// Resolves one input to existing paths, expanding glob patterns.
fn expand_input(input: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if input.exists() {
        return Ok(vec![input.to_path_buf()]);
    }

    let pattern = input.to_string_lossy();
    if !looks_like_glob(&pattern) {
        return Err(DiscoveryError::NotFound(input.to_path_buf()));
    }

    let entries = glob(&pattern).map_err(|e| DiscoveryError::InvalidGlob {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut matches: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    if matches.is_empty() {
        return Err(DiscoveryError::NotFound(input.to_path_buf()));
    }
    matches.sort();
    Ok(matches)
}

fn looks_like_glob(text: &str) -> bool {
    text.contains(['*', '?', '['])
}

/// Regular files at or below `path`. Symlinks are not followed.
fn regular_files_below(path: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| DiscoveryError::Walk {
            path: path.to_path_buf(),
            source: e,
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
