//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use extension_lock::output::OutputConfig;

use crate::commands;

/// Extension Lock - Lock extension definitions and upgrade installed extensions
#[derive(Parser, Debug)]
#[command(name = "extension-lock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the extensions repository lock from its remotes
    Lock(commands::lock::LockArgs),

    /// Install and upgrade the team's extensions from a lock
    Upgrade(commands::upgrade::UpgradeArgs),

    /// List installed extensions
    Ls(commands::ls::LsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let output = OutputConfig::from_env_and_flag(&self.color);
        init_logging(&self.log_level, &output);

        match self.command {
            Commands::Lock(args) => commands::lock::execute(args),
            Commands::Upgrade(args) => commands::upgrade::execute(args),
            Commands::Ls(args) => commands::ls::execute(args, &output),
        }
    }
}

fn init_logging(level: &str, output: &OutputConfig) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second init (e.g. in tests) keeps the first logger
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .write_style(output.log_style())
        .try_init();
}
