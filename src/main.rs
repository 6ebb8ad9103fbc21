//! # Extension Lock CLI
//!
//! Binary entry point for the `extension-lock` command-line tool.
//!
//! It parses arguments with `clap`, sets up logging and dispatches to the
//! command implementations. The work itself lives in the library crate; the
//! binary adds file handling and turns library errors into readable output.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
