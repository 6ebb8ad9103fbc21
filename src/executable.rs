//! # Executable Extensions
//!
//! A queued script together with the environment it runs in. Parameters are
//! exposed as environment variables named by `environmentVariableName`, or by
//! the upper-snake-case parameter name. The team's value wins over the
//! parameter's default; a parameter with neither produces no variable.

use std::fmt;
use std::io::Write;
use std::process::Command;

use log::debug;

use crate::config::ExtensionConfig;
use crate::error::{Error, Result};
use crate::extension::{ExtensionSpec, Parameter};
use crate::naming::upper_snake_case;

/// One environment binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl fmt::Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A script ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableExtension {
    pub name: String,
    pub uuid: String,
    pub script: String,
    pub env: Vec<EnvVar>,
}

impl ExecutableExtension {
    /// Bind `spec`'s parameters using the team's overrides, when there are any.
    pub fn new(spec: &ExtensionSpec, team: Option<&ExtensionConfig>) -> Self {
        let env = spec
            .parameters
            .iter()
            .filter_map(|parameter| {
                let value = team
                    .and_then(|t| t.parameter(&parameter.name))
                    .map(str::to_string)
                    .or_else(|| parameter.default_value.clone())?;
                Some(EnvVar {
                    name: environment_name(parameter),
                    value,
                })
            })
            .collect();

        Self {
            name: spec.fully_qualified_name(),
            uuid: spec.uuid.clone(),
            script: spec.script.clone(),
            env,
        }
    }

    /// `[ A=1, B=2 ]`, the form used when announcing a run.
    pub fn describe_env(&self) -> String {
        let bindings: Vec<String> = self.env.iter().map(|e| e.to_string()).collect();
        format!("[ {} ]", bindings.join(", "))
    }
}

fn environment_name(parameter: &Parameter) -> String {
    match parameter
        .environment_variable_name
        .as_deref()
        .filter(|n| !n.is_empty())
    {
        Some(name) => name.to_string(),
        None => upper_snake_case(&parameter.name),
    }
}

/// What a finished script reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Exit code, or `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }
}

/// Runs extension scripts.
pub trait ScriptRunner {
    fn execute(&self, script: &str, env: &[EnvVar]) -> Result<ScriptOutput>;
}

/// Runs scripts with `bash` from a temporary file.
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "bash".to_string(),
        }
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRunner for ShellRunner {
    fn execute(&self, script: &str, env: &[EnvVar]) -> Result<ScriptOutput> {
        let mut file = tempfile::Builder::new()
            .prefix("extension-")
            .suffix(".sh")
            .tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        let output = Command::new(&self.shell)
            .arg(file.path())
            .envs(env.iter().map(|e| (&e.name, &e.value)))
            .output()?;

        let result = ScriptOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("Script stdout:\n{}", result.stdout);
        if !result.stderr.is_empty() {
            debug!("Script stderr:\n{}", result.stderr);
        }
        Ok(result)
    }
}

/// Run `executable`, turning an unsuccessful exit into `Error::ScriptFailed`.
pub fn run(runner: &dyn ScriptRunner, executable: &ExecutableExtension) -> Result<ScriptOutput> {
    let output = runner.execute(&executable.script, &executable.env)?;
    if !output.success() {
        let captured = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        return Err(Error::ScriptFailed {
            extension: executable.name.clone(),
            status: output.status_text(),
            output: captured,
        });
    }
    Ok(output)
}
