//! # Extension Lock Library
//!
//! Core functionality of the `extension-lock` tool: building a versioned,
//! UUID-addressed lock of extensions published across many git remotes, and
//! installing or upgrading a team's chosen extensions from that lock.
//!
//! ## Quick Example
//!
//! ```
//! use extension_lock::lock::{finalize, RepositoryLock};
//! use extension_lock::extension::ExtensionSpec;
//!
//! let cheese = ExtensionSpec {
//!     name: "cheese".to_string(),
//!     namespace: "acme".to_string(),
//!     version: "1.1.0".to_string(),
//!     uuid: "1b2a3e1c-7c84-4a2d-9b5f-7f3b1f0d8a11".to_string(),
//!     ..Default::default()
//! };
//! let lock: RepositoryLock = finalize("2".to_string(), vec![cheese.clone(), cheese]).unwrap();
//! assert_eq!(lock.extensions.len(), 1);
//! assert!(lock.to_yaml().unwrap().contains("acme"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Extensions (`extension`)**: definitions as authors publish them and the
//!   resolved specs that end up in a lock.
//! - **Lock (`lock`)**: the `LockBuilder` walks remotes and the previous lock,
//!   then validates the candidates into a sorted, deduplicated
//!   `RepositoryLock`.
//! - **Upgrade (`upgrade`)**: reconciles a lock against the installed records
//!   of a team and runs the queued extension scripts.
//! - **Collaborators**: `repository::RemoteContent` (git remotes),
//!   `store::ExtensionStore` (installed records), `chart::ChartRepository`
//!   (chart index refresh) and `executable::ScriptRunner` (script execution).
//!   Each has a concrete implementation and can be replaced in tests.
//!
//! Everything runs on one thread; remote walks and the upgrade walk are
//! sequential and depth-first.

pub mod chart;
pub mod config;
pub mod error;
pub mod executable;
pub mod extension;
pub mod git;
pub mod lock;
pub mod naming;
pub mod output;
pub mod repository;
pub mod store;
pub mod upgrade;
pub mod version;

#[cfg(test)]
mod naming_proptest;
