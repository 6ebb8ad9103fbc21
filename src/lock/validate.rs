use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};
use uuid::Uuid;

use super::RepositoryLock;
use crate::error::{Error, Result, UnresolvedReference};
use crate::extension::ExtensionSpec;

/// Turn walked candidates into a lock stamped with `version`.
///
/// Candidates are collapsed by UUID (first occurrence wins when versions
/// agree), children are rewritten to UUIDs and the result is sorted by UUID.
/// Every unresolvable child is reported at once through
/// `Error::UnresolvedChildren`, which also carries the partial lock.
pub fn finalize(version: String, candidates: Vec<ExtensionSpec>) -> Result<RepositoryLock> {
    let mut extensions = dedupe(candidates)?;

    let mut by_name: HashMap<String, String> = HashMap::new();
    let mut known: HashSet<String> = HashSet::new();
    for spec in &extensions {
        by_name.insert(spec.fully_qualified_name(), spec.uuid.clone());
        known.insert(spec.uuid.clone());
    }
    let sorted: BTreeMap<_, _> = by_name.iter().collect();
    debug!("Extension name to UUID mapping: {:?}", sorted);

    let mut unresolved = Vec::new();
    for spec in &mut extensions {
        let owner = spec.fully_qualified_name();
        for child in &mut spec.children {
            match resolve_child(child, &by_name, &known) {
                Some(uuid) => {
                    if *child != uuid {
                        info!(
                            "Resolved child {} of {} to UUID {}; consider referencing the UUID directly",
                            child, owner, uuid
                        );
                        *child = uuid;
                    }
                }
                None => unresolved.push(UnresolvedReference {
                    extension: owner.clone(),
                    reference: child.clone(),
                }),
            }
        }
    }

    extensions.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    let lock = RepositoryLock {
        version,
        extensions,
    };

    if unresolved.is_empty() {
        Ok(lock)
    } else {
        Err(Error::UnresolvedChildren {
            references: unresolved,
            partial: Box::new(lock),
            written_to: None,
        })
    }
}

/// Keep one spec per UUID, rejecting a UUID seen at two versions.
fn dedupe(candidates: Vec<ExtensionSpec>) -> Result<Vec<ExtensionSpec>> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<ExtensionSpec> = Vec::new();

    for candidate in candidates {
        match seen.get(&candidate.uuid) {
            Some(&index) => {
                let first = &unique[index];
                if first.version != candidate.version {
                    return Err(Error::AmbiguousVersion {
                        name: candidate.fully_qualified_name(),
                        uuid: candidate.uuid,
                        first: first.version.clone(),
                        second: candidate.version,
                    });
                }
            }
            None => {
                seen.insert(candidate.uuid.clone(), unique.len());
                unique.push(candidate);
            }
        }
    }
    Ok(unique)
}

/// A UUID-shaped reference must name a known extension; anything else is a name.
fn resolve_child(
    reference: &str,
    by_name: &HashMap<String, String>,
    known: &HashSet<String>,
) -> Option<String> {
    if Uuid::parse_str(reference).is_ok() {
        return known.get(reference).cloned();
    }
    by_name.get(reference).cloned()
}
