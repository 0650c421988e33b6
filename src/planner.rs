//! Maps candidate files to their destinations.
//!
//! Planning is a fixed pipeline of pure stages over the candidate list:
//!
//! 1. keep files whose extension full-matches the extension filter,
//! 2. drop files whose full path contains a blacklist match,
//! 3. route each remaining file with the first rule whose pattern
//!    full-matches its base name; unmatched files are dropped.
//!
//! Nothing here touches the filesystem.

use crate::config::RuleStore;
use crate::rules::{AnchoredPattern, Rule, RuleList, file_name_of};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One planned source to destination transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Position of the rule that claimed the file.
    pub rule_index: usize,
}

/// Source to destination mapping with unique sources.
///
/// Entries keep the order in which their sources were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferPlan {
    entries: Vec<PlannedTransfer>,
    planned_sources: HashSet<PathBuf>,
}

impl TransferPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry unless its source is already planned.
    ///
    /// Returns false if the source was already present.
    pub fn insert(&mut self, entry: PlannedTransfer) -> bool {
        if !self.planned_sources.insert(entry.source.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedTransfer> {
        self.entries.iter()
    }

    /// Destination planned for `source`, if any.
    pub fn destination_of(&self, source: &Path) -> Option<&Path> {
        self.entries
            .iter()
            .find(|e| e.source == source)
            .map(|e| e.destination.as_path())
    }

    /// All planned source paths.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.source.as_path())
    }
}

impl<'a> IntoIterator for &'a TransferPlan {
    type Item = &'a PlannedTransfer;
    type IntoIter = std::slice::Iter<'a, PlannedTransfer>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Extension as the text after the last `.` of the file name.
///
/// Unlike [`Path::extension`], a leading dot counts, so `.bashrc` has the
/// extension `bashrc`. Returns an empty string when there is no dot.
pub fn extension_of(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
}

/// Plans transfers against a snapshot of the rules and filters.
#[derive(Debug, Clone, Copy)]
pub struct MatchPlanner<'a> {
    rules: &'a RuleList,
    blacklist: &'a Regex,
    extension_filter: &'a AnchoredPattern,
}

impl<'a> MatchPlanner<'a> {
    pub fn new(
        rules: &'a RuleList,
        blacklist: &'a Regex,
        extension_filter: &'a AnchoredPattern,
    ) -> Self {
        Self {
            rules,
            blacklist,
            extension_filter,
        }
    }

    /// Plans against the current content of a store.
    pub fn from_store(store: &'a dyn RuleStore) -> Self {
        Self::new(store.rules(), store.blacklist(), store.extension_filter())
    }

    /// Computes the transfer plan for `files`.
    ///
    /// The same inputs always yield the same plan.
    pub fn plan(&self, files: &[PathBuf]) -> TransferPlan {
        let mut plan = TransferPlan::new();
        files
            .iter()
            .filter(|file| self.passes_extension_filter(file))
            .filter(|file| self.passes_blacklist(file))
            .filter_map(|file| self.route(file))
            .for_each(|entry| {
                plan.insert(entry);
            });

        log::debug!(
            "Planned {} transfer(s) out of {} candidate(s)",
            plan.len(),
            files.len()
        );
        plan
    }

    /// True if the file's extension full-matches the extension filter.
    pub fn passes_extension_filter(&self, file: &Path) -> bool {
        let name = file_name_of(file).unwrap_or_default();
        let keep = self.extension_filter.is_full_match(extension_of(&name));
        if !keep {
            log::trace!("{} rejected by extension filter", file.display());
        }
        keep
    }

    /// True if the blacklist finds nothing anywhere in the full path.
    pub fn passes_blacklist(&self, file: &Path) -> bool {
        let keep = !self.blacklist.is_match(&file.to_string_lossy());
        if !keep {
            log::trace!("{} rejected by blacklist", file.display());
        }
        keep
    }

    /// The first rule claiming this file, with its index.
    pub fn matching_rule(&self, file: &Path) -> Option<(usize, &'a Rule)> {
        let name = file_name_of(file)?;
        self.rules.first_match(&name)
    }

    fn route(&self, file: &Path) -> Option<PlannedTransfer> {
        let (rule_index, rule) = self.matching_rule(file)?;
        Some(PlannedTransfer {
            source: file.to_path_buf(),
            destination: rule.destination_for(file.file_name()?),
            rule_index,
        })
    }
}
