//! Persisted rule configuration.
//!
//! The rule list, blacklist and extension filter are stored together in one
//! JSON file, by default `~/.move_by_regex/move.conf`:
//!
//! ```json
//! {
//!   "regexMatches": [ { "regex": "myfile[0-9]*.txt", "filepath": "tmp" } ],
//!   "blacklistRegex": "notmovethisfile\\.txt|orthisfile\\.txt",
//!   "extensionRegex": "avi|mkv|mp4"
//! }
//! ```
//!
//! Commands never touch the file directly. They receive a [`RuleStore`],
//! either the file-backed [`JsonRuleStore`] or the in-memory
//! [`FixedRuleStore`] used by tests, chosen by whoever builds the command.
//!
//! Rules are kept in the order they were edited in; nothing re-sorts them,
//! so the position a user gives a rule is its matching priority.

use crate::rules::{AnchoredPattern, Rule, RuleError, RuleList, compile_search_regex};
use directories::BaseDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory below the home directory holding the configuration.
pub const CONFIG_DIR_NAME: &str = ".move_by_regex";
/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "move.conf";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but cannot be understood. Must be repaired by hand.
    #[error(
        "Conf file at {} seems to be missing or corrupted ({reason}), please repair or delete the file manually and rerun the command afterwards.",
        .path.display()
    )]
    Corrupt { path: PathBuf, reason: String },
    /// Reading or writing the file failed.
    #[error("IO error on configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No home directory to place the default configuration in.
    #[error("Could not determine the home directory for the configuration file")]
    NoHomeDirectory,
}

/// One serialized rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexFilePair {
    pub regex: String,
    pub filepath: String,
}

/// On-disk shape of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub regex_matches: Vec<RegexFilePair>,
    #[serde(default = "default_blacklist")]
    pub blacklist_regex: String,
    #[serde(default = "default_extension")]
    pub extension_regex: String,
}

fn default_blacklist() -> String {
    r"notmovethisfile\.txt|orthisfile\.txt".to_string()
}

fn default_extension() -> String {
    "avi|mkv|mp4".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            regex_matches: vec![RegexFilePair {
                regex: "myfile[0-9]*.txt".to_string(),
                filepath: "tmp".to_string(),
            }],
            blacklist_regex: default_blacklist(),
            extension_regex: default_extension(),
        }
    }
}

impl ConfigFile {
    /// Compiles every pattern, turning the file into a [`RuleConfig`].
    pub fn compile(&self) -> Result<RuleConfig, RuleError> {
        let rules = self
            .regex_matches
            .iter()
            .map(|pair| Rule::new(&pair.regex, &pair.filepath))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleConfig {
            rules: RuleList::new(rules),
            blacklist: compile_search_regex(&self.blacklist_regex)?,
            extension_filter: AnchoredPattern::new(&self.extension_regex)?,
        })
    }
}

/// Compiled configuration held in memory.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    pub rules: RuleList,
    /// Searched anywhere in a file's full path.
    pub blacklist: Regex,
    /// Full-matched against a file's bare extension.
    pub extension_filter: AnchoredPattern,
}

impl RuleConfig {
    /// Serializable form of this configuration.
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            regex_matches: self
                .rules
                .iter()
                .map(|rule| RegexFilePair {
                    regex: rule.pattern.as_str().to_string(),
                    filepath: rule.destination_dir.to_string_lossy().into_owned(),
                })
                .collect(),
            blacklist_regex: self.blacklist.as_str().to_string(),
            extension_regex: self.extension_filter.as_str().to_string(),
        }
    }
}

/// Access to the rule list and filters.
///
/// Every setter replaces its value as a whole and is persisted before it
/// returns, where the implementation persists at all.
pub trait RuleStore {
    fn rules(&self) -> &RuleList;
    fn set_rules(&mut self, rules: RuleList) -> Result<(), ConfigError>;
    fn blacklist(&self) -> &Regex;
    fn set_blacklist(&mut self, blacklist: Regex) -> Result<(), ConfigError>;
    fn extension_filter(&self) -> &AnchoredPattern;
    fn set_extension_filter(&mut self, filter: AnchoredPattern) -> Result<(), ConfigError>;
}

/// Rule store backed by the JSON configuration file.
#[derive(Debug)]
pub struct JsonRuleStore {
    location: PathBuf,
    config: RuleConfig,
}

impl JsonRuleStore {
    /// Returns the default configuration path inside the home directory.
    pub fn default_location() -> Result<PathBuf, ConfigError> {
        let dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(dirs.home_dir().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Opens the store at `config_path`, or at the default location.
    ///
    /// A missing file is created with the default content first.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Corrupt` if the file cannot be parsed or holds
    /// an invalid regex, and `ConfigError::Io` if it cannot be read or created.
    pub fn open(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let location = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_location()?,
        };

        if !location.exists() {
            log::info!(
                "No configuration at {}, writing defaults",
                location.display()
            );
            write_config(&location, &ConfigFile::default())?;
        }

        let config = load_config(&location)?;
        log::debug!(
            "Loaded {} rule(s) from {}",
            config.rules.len(),
            location.display()
        );
        Ok(Self { location, config })
    }

    /// Path of the backing file.
    pub fn location(&self) -> &Path {
        &self.location
    }

    fn save(&self) -> Result<(), ConfigError> {
        write_config(&self.location, &self.config.to_file())
    }
}

impl RuleStore for JsonRuleStore {
    fn rules(&self) -> &RuleList {
        &self.config.rules
    }

    fn set_rules(&mut self, rules: RuleList) -> Result<(), ConfigError> {
        self.config.rules = rules;
        self.save()
    }

    fn blacklist(&self) -> &Regex {
        &self.config.blacklist
    }

    fn set_blacklist(&mut self, blacklist: Regex) -> Result<(), ConfigError> {
        self.config.blacklist = blacklist;
        self.save()
    }

    fn extension_filter(&self) -> &AnchoredPattern {
        &self.config.extension_filter
    }

    fn set_extension_filter(&mut self, filter: AnchoredPattern) -> Result<(), ConfigError> {
        self.config.extension_filter = filter;
        self.save()
    }
}

/// In-memory rule store with fixed starting content. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct FixedRuleStore {
    config: RuleConfig,
}

impl FixedRuleStore {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Builds a store from raw pattern text.
    pub fn from_patterns(
        rules: &[(&str, &str)],
        blacklist: &str,
        extension_filter: &str,
    ) -> Result<Self, RuleError> {
        let rules = rules
            .iter()
            .map(|(pattern, dir)| Rule::new(pattern, *dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(RuleConfig {
            rules: RuleList::new(rules),
            blacklist: compile_search_regex(blacklist)?,
            extension_filter: AnchoredPattern::new(extension_filter)?,
        }))
    }

    /// The fixture used throughout the test-suite: one `.mkv` rule into `tmp`.
    pub fn sample() -> Self {
        Self::from_patterns(&[(r"\[MyTag]thefile.mkv", "tmp")], "fileIDoNotWant", "mkv")
            .expect("sample patterns are valid")
    }
}

impl RuleStore for FixedRuleStore {
    fn rules(&self) -> &RuleList {
        &self.config.rules
    }

    fn set_rules(&mut self, rules: RuleList) -> Result<(), ConfigError> {
        self.config.rules = rules;
        Ok(())
    }

    fn blacklist(&self) -> &Regex {
        &self.config.blacklist
    }

    fn set_blacklist(&mut self, blacklist: Regex) -> Result<(), ConfigError> {
        self.config.blacklist = blacklist;
        Ok(())
    }

    fn extension_filter(&self) -> &AnchoredPattern {
        &self.config.extension_filter
    }

    fn set_extension_filter(&mut self, filter: AnchoredPattern) -> Result<(), ConfigError> {
        self.config.extension_filter = filter;
        Ok(())
    }
}

fn load_config(path: &Path) -> Result<RuleConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let file: ConfigFile = serde_json::from_str(&content).map_err(|e| ConfigError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    file.compile().map_err(|e| ConfigError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_config(path: &Path, file: &ConfigFile) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let json = serde_json::to_string_pretty(file).map_err(|e| ConfigError::Corrupt {
        path: path.to_path_buf(),
        reason: format!("JSON serialization failed: {e}"),
    })?;
    fs::write(path, json).map_err(io_error)
}
