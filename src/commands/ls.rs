//! # Ls Command Implementation
//!
//! Lists the installed extension records: resource name, UUID and version,
//! sorted by resource name. This is a read-only operation.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use extension_lock::config::default_store_dir;
use extension_lock::output::OutputConfig;
use extension_lock::store::{ExtensionRecord, ExtensionStore, FileStore};

/// List installed extensions
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Directory of installed extension records.
    ///
    /// Can also be set with the `EXTENSION_LOCK_STORE` environment variable.
    #[arg(long, value_name = "DIR", env = "EXTENSION_LOCK_STORE")]
    pub store_dir: Option<PathBuf>,

    /// Show only the number of installed extensions.
    #[arg(long)]
    pub count: bool,
}

/// Execute the `ls` command.
pub fn execute(args: LsArgs, output: &OutputConfig) -> Result<()> {
    let store = FileStore::new(args.store_dir.unwrap_or_else(default_store_dir));
    let installed = store.list_installed().with_context(|| {
        format!(
            "Failed to read installed extensions from {}",
            store.root().display()
        )
    })?;

    if args.count {
        println!("{}", installed.len());
        return Ok(());
    }
    if installed.is_empty() {
        println!("No extensions installed in {}", store.root().display());
        return Ok(());
    }

    let mut records: Vec<ExtensionRecord> = installed.into_values().collect();
    records.sort_by(|a, b| a.resource_name.cmp(&b.resource_name));
    for line in render(&records, output) {
        println!("{}", line);
    }
    Ok(())
}

fn render(records: &[ExtensionRecord], output: &OutputConfig) -> Vec<String> {
    let width = records
        .iter()
        .map(|r| r.resource_name.len())
        .max()
        .unwrap_or(0);
    records
        .iter()
        .map(|record| {
            let padding = " ".repeat(width - record.resource_name.len());
            format!(
                "{}{}  {}  {}",
                output.name(&record.resource_name),
                padding,
                output.dim(&record.spec.uuid),
                output.version(&record.spec.version)
            )
        })
        .collect()
}
