//! # Repository Lock
//!
//! The lock is the resolved, versioned, UUID-addressed snapshot of every
//! extension a team could install. It is regenerated by the `LockBuilder` from
//! a list of remotes and the previous lock, and consumed by the upgrade
//! orchestrator.
//!
//! ## Building a lock
//!
//! 1.  **Walk** (`walk`): every remote is walked in order. Each definition gets
//!     a UUID (pinned, inherited from the previous lock by name, or freshly
//!     generated) and is either *refreshed* (script inlined, child remotes
//!     walked) or *carried forward* from the previous lock with its children
//!     flattened before it.
//! 2.  **Validate** (`validate`): duplicates are collapsed by UUID, ambiguous
//!     versions are rejected, child references are turned into UUIDs and the
//!     result is sorted by UUID so regenerated documents diff cleanly.
//!
//! Unresolvable children do not stop the validation pass. They are collected
//! and returned inside `Error::UnresolvedChildren` together with the partial
//! lock; the builder can also save that partial lock to a temporary file.

mod validate;
mod walk;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::RemoteReference;
use crate::error::{Error, Result};
use crate::extension::ExtensionSpec;
use crate::repository::RemoteContent;

pub use validate::finalize;

/// Accept the version stamp as either a string or a bare number.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stamp {
        Text(String),
        Number(u64),
    }

    Ok(match Stamp::deserialize(deserializer)? {
        Stamp::Text(text) => text,
        Stamp::Number(number) => number.to_string(),
    })
}

/// The lock document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryLock {
    /// Build stamp of this lock.
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: String,
    /// Extensions sorted by UUID, one entry per UUID.
    #[serde(default)]
    pub extensions: Vec<ExtensionSpec>,
}

impl RepositoryLock {
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&content)
    }

    /// Load the previous lock, or an empty one if the file does not exist yet.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            debug!("No previous lock at {}, starting empty", path.display());
            Ok(Self::default())
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// The stamp after this one, when this one is numeric (or empty).
    pub fn next_version(&self) -> Option<String> {
        if self.version.trim().is_empty() {
            return Some("1".to_string());
        }
        self.version
            .trim()
            .parse::<u64>()
            .ok()
            .map(|v| (v + 1).to_string())
    }

    /// Index the extensions by UUID.
    pub fn index(&self) -> LockIndex {
        LockIndex::new(&self.extensions)
    }
}

/// A lock's extensions indexed by UUID, keeping lock order for name lookups.
#[derive(Debug, Clone, Default)]
pub struct LockIndex {
    order: Vec<String>,
    specs: HashMap<String, ExtensionSpec>,
}

impl LockIndex {
    pub fn new(extensions: &[ExtensionSpec]) -> Self {
        let mut index = Self::default();
        for spec in extensions {
            if index.specs.insert(spec.uuid.clone(), spec.clone()).is_none() {
                index.order.push(spec.uuid.clone());
            }
        }
        index
    }

    pub fn get(&self, uuid: &str) -> Option<&ExtensionSpec> {
        self.specs.get(uuid)
    }

    /// Every extension with this fully qualified name, in lock order.
    pub fn find_by_name(&self, fully_qualified_name: &str) -> Vec<&ExtensionSpec> {
        self.order
            .iter()
            .filter_map(|uuid| self.specs.get(uuid))
            .filter(|spec| spec.fully_qualified_name() == fully_qualified_name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Builds a new `RepositoryLock` from remotes and the previous lock.
pub struct LockBuilder<'a> {
    host: &'a dyn RemoteContent,
    partial_output_dir: Option<PathBuf>,
}

impl<'a> LockBuilder<'a> {
    pub fn new(host: &'a dyn RemoteContent) -> Self {
        Self {
            host,
            partial_output_dir: None,
        }
    }

    /// Save the partial lock into `dir` when children cannot be resolved.
    pub fn write_partial_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.partial_output_dir = Some(dir.into());
        self
    }

    /// Walk every remote and collect the unvalidated candidate specs.
    pub fn collect(
        &self,
        remotes: &[RemoteReference],
        previous: &RepositoryLock,
    ) -> Result<Vec<ExtensionSpec>> {
        let mut walker = walk::Walker::new(self.host, previous);
        let mut candidates = Vec::new();
        for remote in remotes {
            walker.walk_remote(&remote.remote, &remote.tag, &mut candidates)?;
        }
        Ok(candidates)
    }

    /// Build and validate the new lock, stamped with `version`.
    pub fn build(
        &self,
        remotes: &[RemoteReference],
        previous: &RepositoryLock,
        version: impl Into<String>,
    ) -> Result<RepositoryLock> {
        let candidates = self.collect(remotes, previous)?;
        match (finalize(version.into(), candidates), &self.partial_output_dir) {
            (
                Err(Error::UnresolvedChildren {
                    references,
                    partial,
                    ..
                }),
                Some(dir),
            ) => {
                let written_to = match write_partial(dir, &partial) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!("Unable to write partial lock to {}: {}", dir.display(), e);
                        None
                    }
                };
                Err(Error::UnresolvedChildren {
                    references,
                    partial,
                    written_to,
                })
            }
            (result, _) => result,
        }
    }
}

/// Write a partial lock to a new file in `dir` and return its path.
fn write_partial(dir: &Path, lock: &RepositoryLock) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("extensions-repository-")
        .suffix(".lock.yaml")
        .tempfile_in(dir)?;
    file.write_all(lock.to_yaml()?.as_bytes())?;
    let (_, path) = file.keep().map_err(|e| Error::Io(e.error))?;
    Ok(path)
}
