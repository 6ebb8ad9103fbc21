//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let remote = MemoryRemote::default()
//!     .with_definitions("github.com/acme/ext-cheese", "v1.0.0", fixtures::CHEESE_DEFINITIONS);
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use extension_lock::chart::ChartRepository;
use extension_lock::error::{Error, Result};
use extension_lock::executable::{EnvVar, ScriptOutput, ScriptRunner};
use extension_lock::extension::DEFINITIONS_FILE;
use extension_lock::repository::RemoteContent;
use extension_lock::store::{ExtensionRecord, ExtensionStore};

/// Re-export commonly used test dependencies for convenience.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::fixtures;
    pub use super::{
        MemoryRemote, MemoryStore, RecordingCharts, RecordingRunner, TestFixture,
    };
}

/// YAML documents shared by several tests.
pub mod fixtures {
    pub const CHEESE_UUID: &str = "1b2a3e1c-7c84-4a2d-9b5f-7f3b1f0d8a11";
    pub const CRACKERS_UUID: &str = "7d9b0f52-5f0b-4a63-8d58-3a8a9e0c2f44";
    pub const PLATTER_UUID: &str = "0a6c1f0e-2d9b-4c3f-8e41-5b7d6c9a0e12";

    /// `cheese` without a pinned UUID.
    pub const CHEESE_DEFINITIONS: &str = r##"
extensions:
  - name: cheese
    namespace: acme
    description: Adds cheese
    when: [install, upgrade]
    parameters:
      - name: slackChannel
        defaultValue: "#general"
"##;

    /// `crackers` with a pinned UUID and an inline script.
    pub const CRACKERS_DEFINITIONS: &str = r#"
extensions:
  - name: crackers
    namespace: acme
    uuid: 7d9b0f52-5f0b-4a63-8d58-3a8a9e0c2f44
    description: Adds crackers
    when: [install]
    script: echo crackers
"#;

    /// A composite pulling `crackers` from its own remote and `cheese` by name.
    pub const PLATTER_DEFINITIONS: &str = r#"
extensions:
  - name: platter
    namespace: acme
    uuid: 0a6c1f0e-2d9b-4c3f-8e41-5b7d6c9a0e12
    description: Cheese and crackers
    when: [install]
    children:
      - name: crackers
        namespace: acme
        remote: github.com/acme/ext-crackers
        tag: v2.0.0
      - acme.cheese
"#;

    /// A previous lock with `cheese` at 1.0.0.
    pub const PREVIOUS_LOCK: &str = r#"
version: "4"
extensions:
  - name: cheese
    namespace: acme
    version: 1.0.0
    uuid: 1b2a3e1c-7c84-4a2d-9b5f-7f3b1f0d8a11
    description: Adds cheese
    when: [install, upgrade]
    script: echo old cheese
"#;
}

/// Serves definitions and scripts from memory, keyed by remote, tag and path.
#[derive(Default)]
pub struct MemoryRemote {
    latest: HashMap<String, String>,
    files: HashMap<(String, String, String), String>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl MemoryRemote {
    pub fn with_file(mut self, remote: &str, tag: &str, path: &str, content: &str) -> Self {
        self.files.insert(
            (remote.to_string(), tag.to_string(), path.to_string()),
            content.to_string(),
        );
        self
    }

    pub fn with_definitions(self, remote: &str, tag: &str, content: &str) -> Self {
        self.with_file(remote, tag, DEFINITIONS_FILE, content)
    }

    pub fn with_latest(mut self, remote: &str, tag: &str) -> Self {
        self.latest.insert(remote.to_string(), tag.to_string());
        self
    }

    /// Every `remote@tag:path` fetched so far.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

impl RemoteContent for MemoryRemote {
    fn resolve_latest_tag(&self, remote: &str) -> Result<String> {
        self.latest.get(remote).cloned().ok_or_else(|| Error::Fetch {
            remote: remote.to_string(),
            tag: "latest".to_string(),
            path: String::new(),
            message: "no semantic version tags found".to_string(),
        })
    }

    fn fetch_file(&self, remote: &str, tag: &str, path: &str) -> Result<Vec<u8>> {
        self.fetches
            .lock()
            .unwrap()
            .push(format!("{}@{}:{}", remote, tag, path));
        self.files
            .get(&(remote.to_string(), tag.to_string(), path.to_string()))
            .map(|content| content.as_bytes().to_vec())
            .ok_or_else(|| Error::Fetch {
                remote: remote.to_string(),
                tag: tag.to_string(),
                path: path.to_string(),
                message: "not found".to_string(),
            })
    }
}

/// Keeps installed records in memory and records every write.
#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<HashMap<String, ExtensionRecord>>,
    pub writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn with_record(self, record: ExtensionRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(record.spec.uuid.clone(), record);
        self
    }

    pub fn version_of(&self, uuid: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(uuid)
            .map(|r| r.spec.version.clone())
    }
}

impl ExtensionStore for MemoryStore {
    fn list_installed(&self) -> Result<HashMap<String, ExtensionRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }

    fn create(&self, record: &ExtensionRecord) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push(format!("create {}", record.resource_name));
        self.records
            .lock()
            .unwrap()
            .insert(record.spec.uuid.clone(), record.clone());
        Ok(())
    }

    fn patch_update(&self, record: &ExtensionRecord) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push(format!("patch {}", record.resource_name));
        self.records
            .lock()
            .unwrap()
            .insert(record.spec.uuid.clone(), record.clone());
        Ok(())
    }
}

/// Counts index refreshes.
#[derive(Default)]
pub struct RecordingCharts {
    pub refreshes: Mutex<usize>,
}

impl ChartRepository for RecordingCharts {
    fn refresh_index(&self) -> Result<()> {
        *self.refreshes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Records scripts and their environment instead of running them.
#[derive(Default)]
pub struct RecordingRunner {
    pub runs: Mutex<Vec<(String, Vec<EnvVar>)>>,
}

impl RecordingRunner {
    pub fn scripts(&self) -> Vec<String> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .map(|(script, _)| script.clone())
            .collect()
    }
}

impl ScriptRunner for RecordingRunner {
    fn execute(&self, script: &str, env: &[EnvVar]) -> Result<ScriptOutput> {
        self.runs
            .lock()
            .unwrap()
            .push((script.to_string(), env.to_vec()));
        Ok(ScriptOutput {
            status: Some(0),
            ..Default::default()
        })
    }
}

/// A temporary working directory for CLI tests.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// The binary, run in this fixture's directory with a private store and cache.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("extension-lock");
        cmd.current_dir(self.path())
            .env("EXTENSION_LOCK_STORE", self.path().join("installed"))
            .env("EXTENSION_LOCK_CACHE", self.path().join("cache"))
            .env_remove("VERSION")
            .env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a git repository at `dir` holding `files`, tagged `tag`.
///
/// Needs a `git` binary but no network.
pub fn git_remote(dir: &Path, tag: &str, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).expect("Failed to create remote directory");
    for (path, content) in files {
        std::fs::write(dir.join(path), content).expect("Failed to write remote file");
    }
    let git = |args: &[&str]| {
        let status = Command::new("git")
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .status()
            .expect("Failed to run git");
        assert!(status.success(), "git {:?} failed", args);
    };
    if !dir.join(".git").exists() {
        git(&["init", "--quiet"]);
    }
    git(&["add", "."]);
    git(&["commit", "--quiet", "--allow-empty", "-m", tag]);
    git(&["tag", tag]);
}
