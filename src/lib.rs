//! regmv - move or copy files by filename regex
//!
//! This library routes files into target directories using a user-maintained,
//! ordered list of regex rules. The first rule whose pattern matches a file's
//! whole name decides where it goes. A blacklist and an extension filter
//! narrow the candidates first, transfers are a dry run unless requested
//! otherwise, and existing files are never replaced silently.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod generalize;
pub mod output;
pub mod planner;
pub mod rules;
pub mod transfer;

pub use config::{ConfigError, FixedRuleStore, JsonRuleStore, RuleStore};
pub use generalize::generalize;
pub use planner::{MatchPlanner, TransferPlan};
pub use rules::{Rule, RuleList};
pub use transfer::{TransferExecutor, TransferMode, TransferReport};

pub use cli::{Cli, Command, run_cli};
