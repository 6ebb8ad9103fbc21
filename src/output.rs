//! # Terminal Output
//!
//! Colour handling for the `extension-lock` binary. Colour is decided once
//! from the global `--color` flag and the environment, and then applies both
//! to command output and to log lines.
//!
//! In `auto` mode colour is off when any of these hold:
//! - `NO_COLOR` is set, to any value (https://no-color.org/)
//! - `CLICOLOR=0`
//! - `TERM=dumb`
//! - stdout is not a terminal, unless `CLICOLOR_FORCE` is set to a non-zero value

use std::env;

use console::{style, StyledObject};

/// Whether to colour output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve `always`, `never` or `auto` (anything else counts as `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_ascii_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::terminal_wants_color(),
        };
        Self { use_color }
    }

    fn terminal_wants_color() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| !v.is_empty() && v != "0") {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// The matching `env_logger` write style.
    pub fn log_style(&self) -> env_logger::WriteStyle {
        if self.use_color {
            env_logger::WriteStyle::Always
        } else {
            env_logger::WriteStyle::Never
        }
    }

    /// A resource or extension name.
    pub fn name<'a>(&self, text: &'a str) -> StyledObject<&'a str> {
        style(text).cyan().bold().force_styling(self.use_color)
    }

    /// A version string.
    pub fn version<'a>(&self, text: &'a str) -> StyledObject<&'a str> {
        style(text).green().force_styling(self.use_color)
    }

    /// Low-emphasis detail such as UUIDs and paths.
    pub fn dim<'a>(&self, text: &'a str) -> StyledObject<&'a str> {
        style(text).dim().force_styling(self.use_color)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
