//! # Error Handling
//!
//! This module defines the centralized error type for `extension-lock`. It uses
//! the `thiserror` library to build a single `Error` enum that covers every
//! failure mode of the lock builder and the upgrade orchestrator.
//!
//! ## Taxonomy
//!
//! - **Fetch errors** (`GitClone`, `GitCommand`, `Fetch`): a remote could not
//!   be reached or a file is missing at the requested tag.
//! - **Version errors** (`Version`): a definition or record carries a version
//!   that is not valid semver.
//! - **Identity errors** (`AmbiguousVersion`, `UuidChanged`, `MissingUuid`):
//!   these carry remediation text, because they can only be fixed by an
//!   operator or an extension maintainer.
//! - **Reference errors** (`UnresolvedChildren`, `MissingExtension`,
//!   `CycleDetected`): broken links between extensions. Unresolved children are
//!   aggregated so a single run reports all of them, and carry the partial
//!   lock that would have been produced.
//! - **Side-effect errors** (`Store`, `ChartRepository`, `ScriptFailed`).
//!
//! None of these are retried; every one is a terminal failure of the run.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::lock::RepositoryLock;

/// A child reference that could not be turned into a UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Fully qualified name of the extension that declares the child.
    pub extension: String,
    /// The reference as written in the definition (a name or a UUID).
    pub reference: String,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (child of {})", self.reference, self.extension)
    }
}

fn join_references(references: &[UnresolvedReference]) -> String {
    references
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Main error type for extension-lock operations
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration or input document is invalid.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred while cloning a remote at a tag.
    #[error("Git clone error for {url}@{r#ref}: {message}")]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// A file could not be retrieved from a remote at a given tag.
    #[error("Unable to fetch {path} from {remote}@{tag}: {message}")]
    Fetch {
        remote: String,
        tag: String,
        path: String,
        message: String,
    },

    /// A version string could not be parsed as a semantic version.
    #[error("Unable to determine version for {extension}: '{version}' is not a semantic version ({message})")]
    Version {
        extension: String,
        version: String,
        message: String,
    },

    /// Two remotes resolved the same UUID to different versions.
    #[error(
        "Unable to add {name} ({uuid}) as two versions are available in the extension repository [ {first}, {second} ]\n  hint: fix the source repositories so only one version of the extension is referenced"
    )]
    AmbiguousVersion {
        name: String,
        uuid: String,
        first: String,
        second: String,
    },

    /// An installed record with the same resource name exists under a different UUID.
    #[error(
        "Extension {name} has changed UUID. It used to have UUID {old_uuid} and now has UUID {new_uuid}.\n  hint: if this is correct, remove the installed record '{resource}' manually; otherwise contact the extension maintainer and inform them of this change"
    )]
    UuidChanged {
        name: String,
        resource: String,
        old_uuid: String,
        new_uuid: String,
    },

    /// An installed record does not carry a UUID.
    #[error("Extension record {resource} does not have a UUID")]
    MissingUuid { resource: String },

    /// Child references could not be resolved to known extensions.
    ///
    /// `partial` holds the lock that would have been produced, so it can be
    /// inspected; `written_to` is set when it was also saved to disk.
    #[error("Cannot resolve children [ {} ] in repository.{}", join_references(.references), .written_to.as_ref().map(|p| format!(" Partial .lock file written to {}.", p.display())).unwrap_or_default())]
    UnresolvedChildren {
        references: Vec<UnresolvedReference>,
        partial: Box<RepositoryLock>,
        written_to: Option<PathBuf>,
    },

    /// A UUID referenced as a child is absent from the lock.
    #[error("Unable to find extension for UUID {uuid}")]
    MissingExtension { uuid: String },

    /// A circular dependency was detected between extensions or remotes.
    #[error("Cycle detected in extension dependencies: {cycle}")]
    CycleDetected { cycle: String },

    /// The installed-record store failed.
    #[error("Extension store error: {message}")]
    Store { message: String },

    /// The chart repository index could not be refreshed.
    #[error("Chart repository command failed: {command} - {stderr}")]
    ChartRepository { command: String, stderr: String },

    /// An extension script exited unsuccessfully.
    #[error("Script for {extension} failed with {status}: {output}")]
    ScriptFailed {
        extension: String,
        status: String,
        output: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
