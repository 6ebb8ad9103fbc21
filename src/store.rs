//! # Installed Extension Records
//!
//! An `ExtensionRecord` is the installed state of one extension: the locked
//! spec it was installed or last upgraded from, stored under a kebab-cased
//! resource name. Records are keyed by UUID when listed; the resource name is
//! only used to detect collisions.
//!
//! The `ExtensionStore` trait has no delete. Removing a record is an operator
//! action.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extension::ExtensionSpec;

/// An installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRecord {
    pub resource_name: String,
    pub spec: ExtensionSpec,
}

impl ExtensionRecord {
    pub fn new(spec: ExtensionSpec) -> Self {
        Self {
            resource_name: spec.resource_name(),
            spec,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.spec.uuid
    }
}

/// Persistence for installed records.
pub trait ExtensionStore {
    /// Every installed record, keyed by UUID.
    fn list_installed(&self) -> Result<HashMap<String, ExtensionRecord>>;

    /// Store a record that does not exist yet.
    fn create(&self, record: &ExtensionRecord) -> Result<()>;

    /// Replace the spec of an existing record.
    fn patch_update(&self, record: &ExtensionRecord) -> Result<()>;
}

/// A directory with one `<resource-name>.yaml` file per record.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, resource_name: &str) -> PathBuf {
        self.root.join(format!("{}.yaml", resource_name))
    }

    fn write(&self, record: &ExtensionRecord) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.record_path(&record.resource_name);
        fs::write(&path, serde_yaml::to_string(record)?)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

impl ExtensionStore for FileStore {
    fn list_installed(&self) -> Result<HashMap<String, ExtensionRecord>> {
        let mut installed = HashMap::new();
        if !self.root.is_dir() {
            return Ok(installed);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
            .collect();
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)?;
            let record: ExtensionRecord =
                serde_yaml::from_str(&content).map_err(|e| Error::Store {
                    message: format!("{}: {}", path.display(), e),
                })?;
            if record.spec.uuid.trim().is_empty() {
                return Err(Error::MissingUuid {
                    resource: record.resource_name,
                });
            }
            installed.insert(record.spec.uuid.clone(), record);
        }
        Ok(installed)
    }

    fn create(&self, record: &ExtensionRecord) -> Result<()> {
        if self.record_path(&record.resource_name).exists() {
            return Err(Error::Store {
                message: format!("record {} already exists", record.resource_name),
            });
        }
        self.write(record)
    }

    fn patch_update(&self, record: &ExtensionRecord) -> Result<()> {
        if !self.record_path(&record.resource_name).exists() {
            return Err(Error::Store {
                message: format!("record {} does not exist", record.resource_name),
            });
        }
        self.write(record)
    }
}
