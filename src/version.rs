//! # Version Resolution and Comparison
//!
//! Semantic version helpers shared by the lock builder and the upgrade
//! orchestrator.
//!
//! - **Tag resolution**: a remote's newest release is the greatest tag that
//!   parses as a semantic version (with or without a leading `v`) and is not a
//!   pre-release.
//! - **Upgrade decisions**: an extension is upgraded when the candidate version
//!   is strictly greater than the recorded one. A missing or unparsable prior
//!   version counts as "nothing installed yet", so it always upgrades.

use semver::Version;

use crate::error::{Error, Result};

/// The tag value that asks for the newest published release of a remote.
pub const LATEST: &str = "latest";

/// Returns true if `tag` asks for the newest release. An empty tag does too.
pub fn is_latest(tag: &str) -> bool {
    tag.is_empty() || tag == LATEST
}

/// Strip a `v` prefix and any `refs/tags/` prefix from a tag.
pub fn version_from_tag(tag: &str) -> &str {
    let tag = tag.strip_prefix("refs/tags/").unwrap_or(tag);
    tag.strip_prefix('v').unwrap_or(tag)
}

/// Parse a version that must be valid, naming the extension on failure.
pub fn parse_version(extension: &str, version: &str) -> Result<Version> {
    Version::parse(version_from_tag(version)).map_err(|e| Error::Version {
        extension: extension.to_string(),
        version: version.to_string(),
        message: e.to_string(),
    })
}

/// Parse a previously recorded version, treating garbage as absent.
pub fn parse_previous_version(version: &str) -> Option<Version> {
    Version::parse(version_from_tag(version)).ok()
}

/// True when `candidate` should replace `previous`.
pub fn is_upgrade(previous: Option<&Version>, candidate: &Version) -> bool {
    match previous {
        Some(previous) => previous < candidate,
        None => true,
    }
}

/// Find the latest release from a list of tags, returning the tag as written.
///
/// Pre-release tags such as `v2.0.0-rc.1` are never picked.
pub fn find_latest_version(tags: &[String]) -> Option<(String, Version)> {
    let mut latest: Option<(String, Version)> = None;

    for tag in tags {
        let Ok(version) = Version::parse(version_from_tag(tag)) else {
            continue;
        };
        if !version.pre.is_empty() {
            continue;
        }
        match &latest {
            Some((_, latest_ver)) if version <= *latest_ver => {}
            _ => latest = Some((tag.clone(), version)),
        }
    }

    latest
}
