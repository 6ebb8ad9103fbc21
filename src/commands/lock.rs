//! # Lock Command Implementation
//!
//! This module implements the `lock` subcommand, which regenerates the
//! extensions repository lock.
//!
//! ## Functionality
//!
//! - **Inputs**: the remote list (`--input-file`) and the previous lock, read
//!   from `--output-file` when it exists.
//! - **Version stamp**: `--lock-version` (or `VERSION`); without it the
//!   previous numeric stamp is incremented.
//! - **Output**: the new lock is written over `--output-file`. When child
//!   references cannot be resolved nothing is written there; the partial lock
//!   goes to a temporary file named in the error instead.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use extension_lock::config::{
    default_cache_root, RemoteReferenceList, DEFAULT_INPUT_FILENAME, DEFAULT_LOCK_FILENAME,
};
use extension_lock::error::Error;
use extension_lock::lock::{LockBuilder, RepositoryLock};
use extension_lock::repository::RepositoryManager;

/// Build the extensions repository lock
#[derive(Args, Debug)]
pub struct LockArgs {
    /// The list of remotes to read extension definitions from.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_INPUT_FILENAME)]
    pub input_file: PathBuf,

    /// Where the lock is read from and written to.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_LOCK_FILENAME)]
    pub output_file: PathBuf,

    /// Version stamp of the new lock.
    ///
    /// Defaults to the previous lock's stamp plus one.
    #[arg(long, value_name = "VERSION", env = "VERSION")]
    pub lock_version: Option<String>,

    /// The root directory for the clone cache.
    ///
    /// Defaults to the system cache directory (`~/.cache/extension-lock` on
    /// Linux). Can also be set with the `EXTENSION_LOCK_CACHE` environment
    /// variable.
    #[arg(long, value_name = "DIR", env = "EXTENSION_LOCK_CACHE")]
    pub cache_root: Option<PathBuf>,
}

/// Execute the `lock` command.
pub fn execute(args: LockArgs) -> Result<()> {
    let remotes = RemoteReferenceList::from_file(&args.input_file)
        .with_context(|| format!("Failed to load remotes from {}", args.input_file.display()))?;
    let previous = RepositoryLock::from_file_or_default(&args.output_file).with_context(|| {
        format!(
            "Failed to load previous lock from {}",
            args.output_file.display()
        )
    })?;

    let version = match args.lock_version {
        Some(version) => version,
        None => previous.next_version().ok_or_else(|| {
            anyhow!(Error::Config {
                message: format!(
                    "Cannot derive the next version from lock version '{}'",
                    previous.version
                ),
                hint: Some("Pass --lock-version or set VERSION".to_string()),
            })
        })?,
    };
    info!(
        "Updating extensions repository from {} to {}",
        if previous.version.is_empty() {
            "nothing"
        } else {
            previous.version.as_str()
        },
        version
    );

    let manager = RepositoryManager::new(args.cache_root.unwrap_or_else(default_cache_root));
    let lock = LockBuilder::new(&manager)
        .write_partial_to(std::env::temp_dir())
        .build(&remotes.remotes, &previous, version)?;

    lock.write_to(&args.output_file)
        .with_context(|| format!("Failed to write {}", args.output_file.display()))?;
    info!(
        "Wrote {} extension(s) to {}",
        lock.extensions.len(),
        args.output_file.display()
    );
    Ok(())
}
