//! # Input Configuration
//!
//! The two documents an operator writes by hand:
//!
//! - **`RemoteReferenceList`** (`extensions-repository.yaml`): the ordered list
//!   of remotes the lock builder reads definitions from. Each entry names a
//!   remote and a tag; `latest` (or no tag) resolves to the newest release.
//!
//! - **`TeamExtensionConfig`** (`extensions.yaml`): the top-level extensions a
//!   team has opted into, with per-extension parameter overrides.
//!
//! Both are parsed with `serde_yaml`. Default file names live here so every
//! command agrees on them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extension::fully_qualified_name;

/// Default name of the remote list read by `lock`.
pub const DEFAULT_INPUT_FILENAME: &str = "extensions-repository.yaml";

/// Default name of the lock document written by `lock`.
pub const DEFAULT_LOCK_FILENAME: &str = "extensions-repository.lock.yaml";

/// Default name of the team configuration read by `upgrade`.
pub const DEFAULT_TEAM_CONFIG_FILENAME: &str = "extensions.yaml";

/// One remote to read extension definitions from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReference {
    /// e.g. `github.com/acme/ext-cheese` or a full git URL.
    pub remote: String,
    /// A tag, or `latest`.
    #[serde(default)]
    pub tag: String,
}

/// The ordered remotes the lock builder reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReferenceList {
    #[serde(default)]
    pub remotes: Vec<RemoteReference>,
}

impl RemoteReferenceList {
    pub fn parse(yaml: &str) -> Result<Self> {
        let list: Self = serde_yaml::from_str(yaml)?;
        if let Some(empty) = list.remotes.iter().find(|r| r.remote.trim().is_empty()) {
            return Err(Error::Config {
                message: format!("Remote with tag '{}' has an empty 'remote' field", empty.tag),
                hint: Some("Use a format like github.com/acme/ext-cheese".to_string()),
            });
        }
        Ok(list)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&content)
    }
}

/// A value supplied by the team for one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

/// One extension a team has opted into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub parameters: Vec<ParameterValue>,
}

impl ExtensionConfig {
    pub fn fully_qualified_name(&self) -> String {
        fully_qualified_name(&self.namespace, &self.name)
    }

    /// The team's value for `parameter`, if one was given.
    pub fn parameter(&self, parameter: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == parameter)
            .map(|p| p.value.as_str())
    }
}

/// The extensions a team has opted into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamExtensionConfig {
    #[serde(default)]
    pub extensions: Vec<ExtensionConfig>,
}

impl TeamExtensionConfig {
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&content)
    }
}

/// Returns the default clone cache directory.
///
/// Uses the platform cache directory (`~/.cache/extension-lock` on Linux),
/// falling back to `.extension-lock-cache` in the current directory.
/// Overridden by `--cache-root` or `EXTENSION_LOCK_CACHE`.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".extension-lock-cache"))
        .join("extension-lock")
}

/// Returns the default directory of installed extension records.
///
/// Overridden by `--store-dir` or `EXTENSION_LOCK_STORE`.
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".extension-lock"))
        .join("extension-lock")
        .join("installed")
}
