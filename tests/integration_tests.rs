//! Integration tests for regmv
//!
//! These tests drive complete commands through `run_cli`, the same entry
//! point the binary uses, against a temporary directory tree.
//!
//! Test categories:
//! 1. Rule list editing
//! 2. Generalizing rules from example files
//! 3. Checking matches
//! 4. Moving and copying
//! 5. Persisted configuration

use regmv::cli::{AppError, Command, run_cli};
use regmv::config::{FixedRuleStore, JsonRuleStore, RuleStore};
use regmv::rules::RuleError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A test fixture that sets up a temporary directory with configurable
/// file structure for testing.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// Create a new test fixture with a temporary directory.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TestFixture { temp_dir }
    }

    /// Get the path to the test directory.
    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a relative location inside the fixture.
    fn join(&self, rel_path: &str) -> PathBuf {
        self.path().join(rel_path)
    }

    /// Same as `join`, as text for building rules.
    fn dir(&self, rel_path: &str) -> String {
        self.join(rel_path).to_string_lossy().into_owned()
    }

    /// Create a text file, creating parent directories as needed.
    fn create_text_file(&self, rel_path: &str, content: &str) {
        let path = self.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
    }

    fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.join(rel_path)).expect("Failed to read file")
    }

    /// Assert that a file exists at the given relative path.
    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.join(rel_path);
        assert!(
            path.exists() && path.is_file(),
            "File should exist: {}",
            path.display()
        );
    }

    /// Assert that nothing exists at the given relative path.
    fn assert_not_exists(&self, rel_path: &str) {
        let path = self.join(rel_path);
        assert!(!path.exists(), "Path should not exist: {}", path.display());
    }

    /// List all files below the fixture, relative and sorted.
    fn list_files_recursive(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(self.path(), &mut files);
        let mut relative: Vec<PathBuf> = files
            .into_iter()
            .map(|f| f.strip_prefix(self.path()).unwrap().to_path_buf())
            .collect();
        relative.sort();
        relative
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }

    /// A store routing `show<N>.mkv` to `tv/` and any other video to `movies/`.
    fn video_store(&self) -> FixedRuleStore {
        let tv = self.dir("tv");
        let movies = self.dir("movies");
        FixedRuleStore::from_patterns(
            &[
                (r"show[0-9]+\.mkv", tv.as_str()),
                (r".*\.(mkv|mp4)", movies.as_str()),
            ],
            "private",
            "mkv|mp4",
        )
        .expect("valid fixture patterns")
    }

    fn move_command(&self, inputs: &[&str], no_test_mode: bool) -> Command {
        Command::Move {
            files: inputs.iter().map(|i| self.join(i)).collect(),
            no_test_mode,
            copy_files: false,
            overwrite_existing: false,
        }
    }
}

fn patterns(store: &dyn RuleStore) -> Vec<String> {
    store
        .rules()
        .iter()
        .map(|r| r.pattern.as_str().to_string())
        .collect()
}

// ============================================================================
// Test Suite 1: Rule List Editing
// ============================================================================

#[test]
fn test_add_with_index_replaces_entry() {
    let mut store = FixedRuleStore::sample();

    run_cli(
        Command::Add {
            index: Some(0),
            insert: false,
            target_parent: Some(PathBuf::from("mytmp")),
            regex: "myregex".to_string(),
        },
        &mut store,
    )
    .expect("add should succeed");

    assert_eq!(store.rules().len(), 1);
    let rule = store.rules().get(0).unwrap();
    assert_eq!(rule.pattern.as_str(), "myregex");
    assert_eq!(rule.destination_dir, std::path::absolute("mytmp").unwrap());
    assert!(rule.destination_dir.is_absolute());
}

#[test]
fn test_add_without_index_appends() {
    let mut store = FixedRuleStore::sample();

    run_cli(
        Command::Add {
            index: None,
            insert: false,
            target_parent: Some(PathBuf::from("/media/other")),
            regex: r"other\.mkv".to_string(),
        },
        &mut store,
    )
    .unwrap();

    assert_eq!(
        patterns(&store),
        vec![r"\[MyTag]thefile.mkv".to_string(), r"other\.mkv".to_string()]
    );
}

#[test]
fn test_add_insert_keeps_existing_rule() {
    let mut store = FixedRuleStore::sample();

    run_cli(
        Command::Add {
            index: Some(0),
            insert: true,
            target_parent: None,
            regex: "first".to_string(),
        },
        &mut store,
    )
    .unwrap();

    assert_eq!(
        patterns(&store),
        vec!["first".to_string(), r"\[MyTag]thefile.mkv".to_string()]
    );
    assert_eq!(
        store.rules().get(0).unwrap().destination_dir,
        std::env::current_dir().unwrap()
    );
}

#[test]
fn test_add_identical_pattern_is_noop() {
    let mut store = FixedRuleStore::sample();

    run_cli(
        Command::Add {
            index: None,
            insert: false,
            target_parent: Some(PathBuf::from("/elsewhere")),
            regex: r"\[MyTag]thefile.mkv".to_string(),
        },
        &mut store,
    )
    .unwrap();

    assert_eq!(store.rules().len(), 1);
    assert_eq!(
        store.rules().get(0).unwrap().destination_dir,
        PathBuf::from("tmp")
    );
}

#[test]
fn test_add_invalid_regex_or_index_changes_nothing() {
    let mut store = FixedRuleStore::sample();

    let bad_regex = run_cli(
        Command::Add {
            index: None,
            insert: false,
            target_parent: None,
            regex: "(unclosed".to_string(),
        },
        &mut store,
    );
    assert!(matches!(
        bad_regex,
        Err(AppError::Rule(RuleError::InvalidRegex { .. }))
    ));

    let bad_index = run_cli(
        Command::Add {
            index: Some(3),
            insert: false,
            target_parent: None,
            regex: "fine".to_string(),
        },
        &mut store,
    );
    assert!(matches!(
        bad_index,
        Err(AppError::Rule(RuleError::IndexOutOfRange { index: 3, len: 1 }))
    ));

    assert_eq!(patterns(&store), vec![r"\[MyTag]thefile.mkv".to_string()]);
}

#[test]
fn test_delete_out_of_range() {
    let mut store = FixedRuleStore::sample();

    let result = run_cli(Command::Delete { index: 5 }, &mut store);

    assert!(matches!(
        result,
        Err(AppError::Rule(RuleError::IndexOutOfRange { index: 5, len: 1 }))
    ));
    assert_eq!(store.rules().len(), 1);
}

#[test]
fn test_delete_keeps_order_of_remaining_rules() {
    let mut store =
        FixedRuleStore::from_patterns(&[("a", "/1"), ("b", "/2"), ("c", "/3")], "x", "mkv")
            .unwrap();

    run_cli(Command::Delete { index: 1 }, &mut store).unwrap();

    assert_eq!(patterns(&store), vec!["a".to_string(), "c".to_string()]);
}

#[test]
fn test_replace_filters() {
    let mut store = FixedRuleStore::sample();

    run_cli(
        Command::Blacklist {
            regex: "sample|trailer".to_string(),
        },
        &mut store,
    )
    .unwrap();
    run_cli(
        Command::Extension {
            regex: "avi|mkv".to_string(),
        },
        &mut store,
    )
    .unwrap();

    assert_eq!(store.blacklist().as_str(), "sample|trailer");
    assert_eq!(store.extension_filter().as_str(), "avi|mkv");
    assert!(run_cli(Command::Dashboard { no_header: false }, &mut store).is_ok());
}

// ============================================================================
// Test Suite 2: Generalize
// ============================================================================

#[test]
fn test_generalize_stores_rule_for_example_directory() {
    let fixture = TestFixture::new();
    let name = "[MyTag] My Show Name S3 - 12 [1080p].mkv";
    fixture.create_text_file(&format!("shows/{name}"), "video");
    let mut store = FixedRuleStore::sample();

    run_cli(
        Command::Generalize {
            index: None,
            insert: false,
            target_parent: None,
            file: fixture.join("shows").join(name),
        },
        &mut store,
    )
    .expect("generalize should succeed");

    let rule = store.rules().get(1).expect("rule appended");
    assert_eq!(
        rule.pattern.as_str(),
        r"\[MyTag] My Show Name S[0-9]+ - [0-9]+ \[[0-9]+p]\.mkv"
    );
    assert_eq!(rule.destination_dir, fixture.join("shows"));
}

#[test]
fn test_generalized_rule_routes_next_episode() {
    let fixture = TestFixture::new();
    let mut store = FixedRuleStore::from_patterns(&[], "private", "mkv").unwrap();

    run_cli(
        Command::Generalize {
            index: None,
            insert: false,
            target_parent: Some(fixture.join("library")),
            file: PathBuf::from("Show 1x01.mkv"),
        },
        &mut store,
    )
    .unwrap();

    fixture.create_text_file("downloads/Show 2x13.mkv", "episode");
    fixture.create_text_file("downloads/Other 2x13.mkv", "other");

    run_cli(fixture.move_command(&["downloads"], true), &mut store).unwrap();

    fixture.assert_file_exists("library/Show 2x13.mkv");
    fixture.assert_file_exists("downloads/Other 2x13.mkv");
}

#[test]
fn test_generalize_rejects_non_matching_pattern() {
    let mut store = FixedRuleStore::sample();

    let result = run_cli(
        Command::Generalize {
            index: None,
            insert: false,
            target_parent: None,
            file: PathBuf::from("c+ notes.txt"),
        },
        &mut store,
    );

    assert!(matches!(result, Err(AppError::Generalize(_))));
    assert_eq!(store.rules().len(), 1);
}

// ============================================================================
// Test Suite 3: Check
// ============================================================================

#[test]
fn test_check_does_not_modify_anything() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/show1.mkv", "a");
    fixture.create_text_file("in/film.mp4", "b");
    let mut store = fixture.video_store();
    let before = fixture.list_files_recursive();

    run_cli(
        Command::Check {
            files: vec![fixture.join("in")],
        },
        &mut store,
    )
    .unwrap();

    assert_eq!(fixture.list_files_recursive(), before);
    fixture.assert_not_exists("tv");
}

#[test]
fn test_check_missing_input_fails() {
    let fixture = TestFixture::new();
    let mut store = fixture.video_store();

    let result = run_cli(
        Command::Check {
            files: vec![fixture.join("nope.mkv")],
        },
        &mut store,
    );

    assert!(matches!(result, Err(AppError::Discovery(_))));
}

// ============================================================================
// Test Suite 4: Move and Copy
// ============================================================================

#[test]
fn test_move_defaults_to_dry_run() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/show1.mkv", "a");
    let mut store = fixture.video_store();

    run_cli(fixture.move_command(&["in"], false), &mut store).unwrap();

    fixture.assert_file_exists("in/show1.mkv");
    fixture.assert_not_exists("tv");
}

#[test]
fn test_move_routes_by_first_matching_rule() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/show1.mkv", "episode");
    fixture.create_text_file("in/film.mkv", "film");
    fixture.create_text_file("in/nested/clip.mp4", "clip");
    let mut store = fixture.video_store();

    run_cli(fixture.move_command(&["in"], true), &mut store).unwrap();

    assert_eq!(
        fixture.list_files_recursive(),
        vec![
            PathBuf::from("movies/clip.mp4"),
            PathBuf::from("movies/film.mkv"),
            PathBuf::from("tv/show1.mkv"),
        ]
    );
    assert_eq!(fixture.read("tv/show1.mkv"), "episode");
}

#[test]
fn test_move_respects_blacklist_and_extension_filter() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/private/show1.mkv", "secret");
    fixture.create_text_file("in/show2.avi", "wrong extension");
    fixture.create_text_file("in/show3.mkv", "ok");
    let mut store = fixture.video_store();

    run_cli(fixture.move_command(&["in"], true), &mut store).unwrap();

    fixture.assert_file_exists("in/private/show1.mkv");
    fixture.assert_file_exists("in/show2.avi");
    fixture.assert_file_exists("tv/show3.mkv");
    fixture.assert_not_exists("in/show3.mkv");
}

#[test]
fn test_copy_files_keeps_sources() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/show1.mkv", "episode");
    let mut store = fixture.video_store();

    run_cli(
        Command::Move {
            files: vec![fixture.join("in/show1.mkv")],
            no_test_mode: true,
            copy_files: true,
            overwrite_existing: false,
        },
        &mut store,
    )
    .unwrap();

    fixture.assert_file_exists("in/show1.mkv");
    assert_eq!(fixture.read("tv/show1.mkv"), "episode");
}

#[test]
fn test_existing_destination_fails_without_overwrite() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/show1.mkv", "new");
    fixture.create_text_file("in/show2.mkv", "other");
    fixture.create_text_file("tv/show1.mkv", "old");
    let mut store = fixture.video_store();

    let result = run_cli(fixture.move_command(&["in"], true), &mut store);

    assert!(matches!(
        result,
        Err(AppError::TransfersFailed {
            failed: 1,
            total: 2
        })
    ));
    assert_eq!(fixture.read("in/show1.mkv"), "new");
    assert_eq!(fixture.read("tv/show1.mkv"), "old");
    // The sibling entry is still transferred.
    fixture.assert_file_exists("tv/show2.mkv");
}

#[test]
fn test_overwrite_existing_replaces_destination() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/show1.mkv", "new");
    fixture.create_text_file("tv/show1.mkv", "old");
    let mut store = fixture.video_store();

    run_cli(
        Command::Move {
            files: vec![fixture.join("in")],
            no_test_mode: true,
            copy_files: false,
            overwrite_existing: true,
        },
        &mut store,
    )
    .unwrap();

    fixture.assert_not_exists("in/show1.mkv");
    assert_eq!(fixture.read("tv/show1.mkv"), "new");
}

#[test]
fn test_dry_run_with_conflict_reports_failure_without_changes() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/show1.mkv", "new");
    fixture.create_text_file("tv/show1.mkv", "old");
    let mut store = fixture.video_store();
    let before = fixture.list_files_recursive();

    let result = run_cli(fixture.move_command(&["in"], false), &mut store);

    assert!(matches!(result, Err(AppError::TransfersFailed { .. })));
    assert_eq!(fixture.list_files_recursive(), before);
}

#[test]
fn test_no_matching_files_is_success() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/readme.txt", "text");
    let mut store = fixture.video_store();

    run_cli(fixture.move_command(&["in"], true), &mut store).unwrap();

    fixture.assert_file_exists("in/readme.txt");
}

// ============================================================================
// Test Suite 5: Persisted Configuration
// ============================================================================

#[test]
fn test_edits_survive_reopening_json_store() {
    let fixture = TestFixture::new();
    let config_path = fixture.join("conf/move.conf");

    let mut store = JsonRuleStore::open(Some(&config_path)).expect("open store");
    run_cli(
        Command::Add {
            index: Some(0),
            insert: true,
            target_parent: Some(fixture.join("videos")),
            regex: r"clip[0-9]+\.mp4".to_string(),
        },
        &mut store,
    )
    .unwrap();
    run_cli(
        Command::Extension {
            regex: "mp4".to_string(),
        },
        &mut store,
    )
    .unwrap();

    let reopened = JsonRuleStore::open(Some(&config_path)).expect("reopen store");
    assert_eq!(
        patterns(&reopened),
        vec![r"clip[0-9]+\.mp4".to_string(), "myfile[0-9]*.txt".to_string()]
    );
    assert_eq!(
        reopened.rules().get(0).unwrap().destination_dir,
        fixture.join("videos")
    );
    assert_eq!(reopened.extension_filter().as_str(), "mp4");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
    assert_eq!(json["regexMatches"][0]["regex"], r"clip[0-9]+\.mp4");
}

#[test]
fn test_failed_edit_is_not_persisted() {
    let fixture = TestFixture::new();
    let config_path = fixture.join("move.conf");
    let mut store = JsonRuleStore::open(Some(&config_path)).unwrap();
    let before = fs::read_to_string(&config_path).unwrap();

    assert!(run_cli(Command::Delete { index: 7 }, &mut store).is_err());

    assert_eq!(fs::read_to_string(&config_path).unwrap(), before);
}
