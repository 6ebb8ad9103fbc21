//! # Upgrade Command Implementation
//!
//! This module implements the `upgrade` subcommand, which installs and
//! upgrades the extensions a team has opted into.
//!
//! ## Functionality
//!
//! - **Lock source**: a local `--lock-file`, or the
//!   `extensions-repository.lock.yaml` published in `--repository` at `--tag`
//!   (default `latest`).
//! - **Records**: installed extensions live in `--store-dir`, one YAML file per
//!   extension. New extensions are created, older ones patched in place.
//! - **Scripts**: queued install/upgrade scripts run with `bash` after a single
//!   `helm repo update`, which `--skip-repo-update` suppresses.

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use extension_lock::chart::{ChartRepository, HelmRepository};
use extension_lock::config::{
    default_cache_root, default_store_dir, TeamExtensionConfig, DEFAULT_LOCK_FILENAME,
    DEFAULT_TEAM_CONFIG_FILENAME,
};
use extension_lock::executable::ShellRunner;
use extension_lock::lock::RepositoryLock;
use extension_lock::repository::{RemoteContent, RepositoryManager};
use extension_lock::store::FileStore;
use extension_lock::upgrade::execute_upgrade;
use extension_lock::version::{is_latest, LATEST};

/// Install and upgrade extensions from a lock
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// A local lock file to upgrade from.
    #[arg(long, value_name = "FILE", conflicts_with = "repository")]
    pub lock_file: Option<PathBuf>,

    /// A remote publishing the lock file, e.g. github.com/acme/extensions.
    #[arg(long, value_name = "REMOTE", required_unless_present = "lock_file")]
    pub repository: Option<String>,

    /// Tag of `--repository` to read the lock from.
    #[arg(long, value_name = "TAG", default_value = LATEST)]
    pub tag: String,

    /// The team's extension configuration.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_TEAM_CONFIG_FILENAME)]
    pub team_config: PathBuf,

    /// Directory of installed extension records.
    ///
    /// Can also be set with the `EXTENSION_LOCK_STORE` environment variable.
    #[arg(long, value_name = "DIR", env = "EXTENSION_LOCK_STORE")]
    pub store_dir: Option<PathBuf>,

    /// The root directory for the clone cache, used with `--repository`.
    #[arg(long, value_name = "DIR", env = "EXTENSION_LOCK_CACHE")]
    pub cache_root: Option<PathBuf>,

    /// Do not refresh the chart repository index before running scripts.
    #[arg(long)]
    pub skip_repo_update: bool,

    /// The helm binary used to refresh the chart repository index.
    #[arg(long, value_name = "PATH", default_value = "helm")]
    pub helm_binary: String,
}

/// Execute the `upgrade` command.
pub fn execute(args: UpgradeArgs) -> Result<()> {
    let lock = load_lock(&args)?;
    let team = TeamExtensionConfig::from_file(&args.team_config).with_context(|| {
        format!(
            "Failed to load team configuration from {}",
            args.team_config.display()
        )
    })?;

    let store = FileStore::new(args.store_dir.clone().unwrap_or_else(default_store_dir));
    let helm = HelmRepository::new(&args.helm_binary);
    let charts: Option<&dyn ChartRepository> = if args.skip_repo_update {
        None
    } else {
        Some(&helm)
    };

    let plan = execute_upgrade(&lock, &team, &store, charts, &ShellRunner::new())?;
    if plan.is_empty() {
        info!("All extensions are up to date");
    } else {
        info!(
            "{} extension(s) changed, {} script(s) run",
            plan.changes.len(),
            plan.executables.len()
        );
    }
    Ok(())
}

fn load_lock(args: &UpgradeArgs) -> Result<RepositoryLock> {
    if let Some(path) = &args.lock_file {
        return RepositoryLock::from_file(path)
            .with_context(|| format!("Failed to load lock from {}", path.display()));
    }

    // clap guarantees one of the two
    let remote = args.repository.as_deref().unwrap_or_default();
    let manager = RepositoryManager::new(
        args.cache_root
            .clone()
            .unwrap_or_else(default_cache_root),
    );
    let tag = if is_latest(&args.tag) {
        manager.resolve_latest_tag(remote)?
    } else {
        args.tag.clone()
    };
    info!("Using extensions repository {}@{}", remote, tag);

    let content = manager.fetch_string(remote, &tag, DEFAULT_LOCK_FILENAME)?;
    RepositoryLock::parse(&content)
        .with_context(|| format!("Failed to parse {} from {}@{}", DEFAULT_LOCK_FILENAME, remote, tag))
}
