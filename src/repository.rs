//! # Remote Content
//!
//! This module provides the `RemoteContent` trait, the lock builder's only
//! view of where extension definitions and scripts live, and the
//! `RepositoryManager`, its git-backed implementation.
//!
//! ## Design
//!
//! The `RepositoryManager` is built around a trait-based design that separates
//! content retrieval from the concrete git commands:
//!
//! - **`RemoteContent`**: "what is the newest tag of this remote" and "give me
//!   this file at this tag". The lock builder and the `upgrade` command depend
//!   only on this trait, so tests can serve content from memory.
//!
//! - **`GitOperations`**: the raw git actions (shallow clone, list tags) used by
//!   the `RepositoryManager`. `DefaultGitOperations` shells out to the system
//!   `git`, which picks up the user's SSH keys and credential helpers.
//!
//! Checkouts are cached per remote and tag under a cache root. Tags are treated
//! as immutable, so a cached checkout is reused for the rest of its life.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::version::find_latest_version;

/// Where extension definitions, scripts and published locks come from.
pub trait RemoteContent {
    /// The newest release tag of `remote`, as written in the remote.
    fn resolve_latest_tag(&self, remote: &str) -> Result<String>;

    /// The bytes of `path` in `remote` at `tag`.
    fn fetch_file(&self, remote: &str, tag: &str, path: &str) -> Result<Vec<u8>>;

    /// `fetch_file` decoded as UTF-8.
    fn fetch_string(&self, remote: &str, tag: &str, path: &str) -> Result<String> {
        let bytes = self.fetch_file(remote, tag, path)?;
        String::from_utf8(bytes).map_err(|e| Error::Fetch {
            remote: remote.to_string(),
            tag: tag.to_string(),
            path: path.to_string(),
            message: format!("file is not valid UTF-8: {}", e),
        })
    }
}

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Clones a repository at a specific Git reference.
    ///
    /// This is expected to be a shallow clone to optimize for speed and disk
    /// space.
    fn clone_shallow(&self, url: &str, ref_name: &str, target_dir: &Path) -> Result<()>;

    /// Retrieves a list of all tags from a remote repository.
    fn list_tags(&self, url: &str) -> Result<Vec<String>>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_shallow(&self, url: &str, ref_name: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_shallow(url, ref_name, target_dir)
    }

    fn list_tags(&self, url: &str) -> Result<Vec<String>> {
        crate::git::list_tags(url)
    }
}

/// Git-backed `RemoteContent` with an on-disk checkout cache.
pub struct RepositoryManager {
    git_ops: Box<dyn GitOperations>,
    cache_root: PathBuf,
}

impl RepositoryManager {
    /// Creates a new `RepositoryManager` using the system `git` and the given
    /// cache directory.
    pub fn new(cache_root: PathBuf) -> Self {
        Self {
            git_ops: Box::new(DefaultGitOperations),
            cache_root,
        }
    }

    /// Creates a `RepositoryManager` with a custom `GitOperations`.
    ///
    /// This is primarily used for testing to inject mock operations.
    pub fn with_operations(git_ops: Box<dyn GitOperations>, cache_root: PathBuf) -> Self {
        Self {
            git_ops,
            cache_root,
        }
    }

    /// Ensure a checkout of `remote` at `tag` exists and return its directory.
    fn checkout(&self, remote: &str, tag: &str) -> Result<PathBuf> {
        let url = crate::git::remote_to_url(remote)?;
        let cache_path = crate::git::url_to_cache_path(&self.cache_root, &url, tag);
        if !(cache_path.exists() && cache_path.is_dir()) {
            log::debug!("Cloning {}@{} into {}", url, tag, cache_path.display());
            self.git_ops.clone_shallow(&url, tag, &cache_path)?;
        }
        Ok(cache_path)
    }

    /// Checks if a checkout of `remote` at `tag` is in the cache.
    pub fn is_cached(&self, remote: &str, tag: &str) -> bool {
        match crate::git::remote_to_url(remote) {
            Ok(url) => crate::git::url_to_cache_path(&self.cache_root, &url, tag).is_dir(),
            Err(_) => false,
        }
    }
}

impl RemoteContent for RepositoryManager {
    fn resolve_latest_tag(&self, remote: &str) -> Result<String> {
        let url = crate::git::remote_to_url(remote)?;
        let tags = self.git_ops.list_tags(&url)?;
        find_latest_version(&tags)
            .map(|(tag, _)| tag)
            .ok_or_else(|| Error::Fetch {
                remote: remote.to_string(),
                tag: crate::version::LATEST.to_string(),
                path: String::new(),
                message: "no semantic version tags found".to_string(),
            })
    }

    fn fetch_file(&self, remote: &str, tag: &str, path: &str) -> Result<Vec<u8>> {
        let checkout = self.checkout(remote, tag)?;
        crate::git::read_checked_out_file(&checkout, path).map_err(|e| Error::Fetch {
            remote: remote.to_string(),
            tag: tag.to_string(),
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}
