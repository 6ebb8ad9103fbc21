use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// The chart repository index that extension scripts install from.
pub trait ChartRepository {
    fn refresh_index(&self) -> Result<()>;
}

/// Refreshes the index with `helm repo update`.
pub struct HelmRepository {
    binary: String,
}

impl HelmRepository {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for HelmRepository {
    fn default() -> Self {
        Self::new("helm")
    }
}

impl ChartRepository for HelmRepository {
    fn refresh_index(&self) -> Result<()> {
        let command = format!("{} repo update", self.binary);
        debug!("Running {}", command);
        let output = Command::new(&self.binary)
            .args(["repo", "update"])
            .output()
            .map_err(|e| Error::ChartRepository {
                command: command.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::ChartRepository {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
