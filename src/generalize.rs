//! Derives a reusable rule pattern from one example filename.
//!
//! Every maximal run of ASCII digits becomes `[0-9]+`, so an episode file
//! such as `Show S3 - 12.mkv` yields a pattern matching every other episode.
//!
//! Only `.` and `[` are escaped before the digit runs are wildcarded. Other
//! metacharacters pass through untouched, which means a name containing
//! e.g. `(` or `+` may produce a pattern that does not compile or does not
//! match the name. [`generalize`] detects both cases and refuses to return
//! such a pattern.
//!
//! ```
//! use regmv::generalize::generalize;
//!
//! let pattern = generalize("[MyTag] My Show Name S3 - 12 [1080p].mkv").unwrap();
//! assert_eq!(
//!     pattern.as_str(),
//!     r"\[MyTag] My Show Name S[0-9]+ - [0-9]+ \[[0-9]+p]\.mkv"
//! );
//! ```

use crate::rules::AnchoredPattern;
use regex::{NoExpand, Regex};
use std::sync::LazyLock;
use thiserror::Error;

/// Wildcard substituted for each digit run.
pub const DIGIT_WILDCARD: &str = "[0-9]+";

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]+").expect("digit run regex is valid"));

/// The generalized pattern failed its round-trip check.
///
/// This is a defect in the generalization, not a user error, and is always
/// surfaced.
#[derive(Debug, Error)]
#[error("Internal error: generalizing '{filename}' produced '{pattern}', {reason}")]
pub struct GeneralizeError {
    pub filename: String,
    pub pattern: String,
    pub reason: String,
}

/// Escapes the literal characters a filename commonly contains.
pub fn escape_literal(filename: &str) -> String {
    filename.replace('.', r"\.").replace('[', r"\[")
}

/// Builds the generalized pattern text without compiling it.
pub fn generalized_pattern_text(filename: &str) -> String {
    let escaped = escape_literal(filename);
    DIGIT_RUN
        .replace_all(&escaped, NoExpand(DIGIT_WILDCARD))
        .into_owned()
}

/// Generalizes `filename` and verifies the result full-matches it.
pub fn generalize(filename: &str) -> Result<AnchoredPattern, GeneralizeError> {
    let text = generalized_pattern_text(filename);
    let failure = |reason: String| GeneralizeError {
        filename: filename.to_string(),
        pattern: text.clone(),
        reason,
    };

    let pattern =
        AnchoredPattern::new(&text).map_err(|e| failure(format!("which does not compile: {e}")))?;

    if !pattern.is_full_match(filename) {
        return Err(failure("which does not match the original name".to_string()));
    }

    log::debug!("Generalized '{filename}' to '{text}'");
    Ok(pattern)
}
