//! Routing rules and the ordered rule list.
//!
//! A [`Rule`] pairs a filename pattern with the directory that matching files
//! are routed to. Rules live in an ordered list: the first rule whose pattern
//! matches a filename wins, so every editing operation here keeps the relative
//! order of the untouched rules.
//!
//! # Examples
//!
//! ```
//! use regmv::rules::{Rule, RuleList};
//!
//! let mut rules = RuleList::default();
//! rules.append(Rule::new(r"show[0-9]+\.mkv", "videos").unwrap());
//! assert!(rules.get(0).unwrap().pattern.is_full_match("show12.mkv"));
//! assert!(!rules.get(0).unwrap().pattern.is_full_match("my show12.mkv"));
//! ```

use regex::Regex;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building or editing rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The pattern text is not a valid regular expression.
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// An index outside the rule list was given.
    #[error("Index {index} is not allowed to be outside [0,{len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A regular expression that is only ever matched against a whole string.
///
/// The original pattern text is kept for display and persistence, while
/// matching goes through an anchored copy.
#[derive(Debug, Clone)]
pub struct AnchoredPattern {
    source: String,
    anchored: Regex,
}

impl AnchoredPattern {
    /// Compiles `pattern` for full-string matching.
    ///
    /// The bare pattern is compiled first so that text such as `a)(b`, which
    /// only becomes valid once wrapped in a group, is still rejected.
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let invalid = |source| RuleError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        };
        Regex::new(pattern).map_err(invalid)?;
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)?;
        Ok(Self {
            source: pattern.to_string(),
            anchored,
        })
    }

    /// Returns the pattern text as written by the user.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if the pattern matches the entire `text`.
    pub fn is_full_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

impl fmt::Display for AnchoredPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for AnchoredPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for AnchoredPattern {}

/// Compiles a pattern used for substring search, such as the blacklist.
pub fn compile_search_regex(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|source| RuleError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// A single routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Pattern matched against a file's base name.
    pub pattern: AnchoredPattern,
    /// Directory matching files are relocated into. Need not exist yet.
    pub destination_dir: PathBuf,
}

impl Rule {
    /// Creates a rule, compiling its pattern.
    pub fn new(pattern: &str, destination_dir: impl Into<PathBuf>) -> Result<Self, RuleError> {
        Ok(Self {
            pattern: AnchoredPattern::new(pattern)?,
            destination_dir: destination_dir.into(),
        })
    }

    /// Returns true if this rule claims the given file name.
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_full_match(file_name)
    }

    /// Where a file with the given name ends up. Rules never rename, so the
    /// name is joined as is, not as the lossy text used for matching.
    pub fn destination_for(&self, file_name: &OsStr) -> PathBuf {
        self.destination_dir.join(file_name)
    }
}

/// Result of an add/insert/replace request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleChange {
    /// The list was modified.
    Applied,
    /// A rule with identical pattern text already exists; nothing changed.
    AlreadyPresent,
}

/// The ordered list of routing rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleList {
    rules: Vec<Rule>,
}

impl RuleList {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Returns true if a rule with exactly this pattern text exists.
    pub fn contains_pattern(&self, pattern: &str) -> bool {
        self.rules.iter().any(|rule| rule.pattern.as_str() == pattern)
    }

    /// Index and rule of the first rule matching `file_name`.
    pub fn first_match(&self, file_name: &str) -> Option<(usize, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(file_name))
    }

    /// Appends a rule at the lowest priority.
    pub fn append(&mut self, rule: Rule) -> RuleChange {
        if self.contains_pattern(rule.pattern.as_str()) {
            return RuleChange::AlreadyPresent;
        }
        self.rules.push(rule);
        RuleChange::Applied
    }

    /// Inserts a rule before `index`, shifting later rules down.
    ///
    /// `index == len` is allowed and appends.
    pub fn insert(&mut self, index: usize, rule: Rule) -> Result<RuleChange, RuleError> {
        if index > self.rules.len() {
            return Err(self.out_of_range(index));
        }
        if self.contains_pattern(rule.pattern.as_str()) {
            return Ok(RuleChange::AlreadyPresent);
        }
        self.rules.insert(index, rule);
        Ok(RuleChange::Applied)
    }

    /// Replaces the rule at `index` in place.
    pub fn replace(&mut self, index: usize, rule: Rule) -> Result<RuleChange, RuleError> {
        if index >= self.rules.len() {
            return Err(self.out_of_range(index));
        }
        if self.contains_pattern(rule.pattern.as_str()) {
            return Ok(RuleChange::AlreadyPresent);
        }
        self.rules[index] = rule;
        Ok(RuleChange::Applied)
    }

    /// Removes and returns the rule at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Rule, RuleError> {
        if index >= self.rules.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.rules.remove(index))
    }

    fn out_of_range(&self, index: usize) -> RuleError {
        RuleError::IndexOutOfRange {
            index,
            len: self.rules.len(),
        }
    }
}

impl From<Vec<Rule>> for RuleList {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}

impl<'a> IntoIterator for &'a RuleList {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Extracts the base name of a path as text for matching.
///
/// Names that are not valid UTF-8 come back with replacement characters and
/// must not be used to build paths.
pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}
