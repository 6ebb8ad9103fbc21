//! Thin wrappers around the system `git` binary.
//!
//! Shelling out means remotes authenticate exactly as they do for the user:
//! SSH agent keys, credential helpers and `~/.gitconfig` all apply.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

use url::Url;

use crate::error::Error;

const REMOTE_HINT: &str = "Use a format like github.com/acme/ext-cheese";

/// Turn a remote as written by authors into something `git` can clone.
///
/// Remotes with a scheme (`https://`, `ssh://`, `file://`) or scp-style
/// (`git@host:org/repo`) are used as-is; bare `host/org/repo` remotes are
/// fetched over https. Absolute local paths are kept for local mirrors.
pub fn remote_to_url(remote: &str) -> Result<String, Error> {
    let remote = remote.trim().trim_end_matches('/');
    if remote.is_empty() {
        return Err(Error::Config {
            message: "Empty remote".to_string(),
            hint: Some(REMOTE_HINT.to_string()),
        });
    }

    if remote.contains("://") {
        // Validate, but hand git the original spelling
        Url::parse(remote)?;
        return Ok(remote.to_string());
    }
    if remote.starts_with('/') || remote.starts_with("git@") {
        return Ok(remote.to_string());
    }

    let url = Url::parse(&format!("https://{}", remote))?;
    if url.path_segments().map_or(0, |s| s.filter(|p| !p.is_empty()).count()) < 2 {
        return Err(Error::Config {
            message: format!("Cannot parse extension remote {}", remote),
            hint: Some(REMOTE_HINT.to_string()),
        });
    }
    Ok(url.to_string())
}

/// Run `git` with `args`, mapping a failure to start it onto `on_error`.
fn run_git<F>(args: &[&str], target: Option<&Path>, on_error: F) -> Result<Output, Error>
where
    F: FnOnce(String) -> Error,
{
    let mut command = Command::new("git");
    command.args(args).env("GIT_TERMINAL_PROMPT", "0");
    if let Some(target) = target {
        command.arg(target);
    }
    command.output().map_err(|e| on_error(e.to_string()))
}

/// Explain the usual cause of an access failure, keeping git's own message.
fn describe_clone_failure(stderr: &str) -> String {
    let denied = [
        "Authentication failed",
        "Permission denied",
        "Could not read from remote repository",
    ]
    .iter()
    .any(|needle| stderr.contains(needle));

    if denied {
        format!(
            "access denied. Check that your SSH agent or git credential helper can reach this remote.\n{}",
            stderr.trim()
        )
    } else {
        stderr.trim().to_string()
    }
}

/// Shallow-clone `url` at `tag` into `target_dir`, replacing anything there.
pub fn clone_shallow(url: &str, tag: &str, target_dir: &Path) -> Result<(), Error> {
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let clone_error = |message: String| Error::GitClone {
        url: url.to_string(),
        r#ref: tag.to_string(),
        message,
    };
    let output = run_git(
        &["clone", "--quiet", "--depth=1", "--branch", tag, url],
        Some(target_dir),
        clone_error,
    )?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(clone_error(describe_clone_failure(&stderr)));
    }
    Ok(())
}

/// Cache directory of `url` at `tag`: `<repo-name>-<url hash>-<tag>`.
pub fn url_to_cache_path(cache_root: &Path, url: &str, tag: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);

    let name = url
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .rsplit(['/', ':'])
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("remote");

    cache_root.join(format!(
        "{}-{:016x}-{}",
        name,
        hasher.finish(),
        tag.replace('/', "-")
    ))
}

/// Read a file from a checked-out repository, refusing paths that escape it.
pub fn read_checked_out_file(checkout: &Path, path: &str) -> Result<Vec<u8>, Error> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(Error::Config {
            message: format!("Path {} must be relative to the repository root", path),
            hint: None,
        });
    }
    Ok(fs::read(checkout.join(relative))?)
}

/// Tag names published by `url`, via `git ls-remote --tags`.
pub fn list_tags(url: &str) -> Result<Vec<String>, Error> {
    let command_error = |stderr: String| Error::GitCommand {
        command: "ls-remote --tags".to_string(),
        url: url.to_string(),
        stderr,
    };
    let output = run_git(&["ls-remote", "--tags", url], None, command_error)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(command_error(stderr));
    }
    Ok(parse_ls_remote_tags(&String::from_utf8_lossy(&output.stdout)))
}

/// Extract tag names from `git ls-remote --tags` output.
///
/// Lines look like `<hash>\trefs/tags/v1.0.0`; peeled `^{}` entries are
/// folded into their tag.
fn parse_ls_remote_tags(stdout: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for line in stdout.lines() {
        let Some((_, ref_name)) = line.split_once('\t') else {
            continue;
        };
        let Some(tag) = ref_name.strip_prefix("refs/tags/") else {
            continue;
        };
        let tag = tag.trim_end_matches("^{}");
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
