//! Walking remotes and the previous lock to collect candidate specs.

use std::collections::HashMap;

use log::{debug, info, warn};
use uuid::Uuid;

use super::RepositoryLock;
use crate::error::{Error, Result};
use crate::extension::{ExtensionDefinition, ExtensionDefinitionList, ExtensionSpec, DEFINITIONS_FILE};
use crate::repository::RemoteContent;
use crate::version::{is_latest, is_upgrade, parse_previous_version, parse_version, version_from_tag};

pub(super) struct Walker<'a> {
    host: &'a dyn RemoteContent,
    previous_by_name: HashMap<String, &'a ExtensionSpec>,
    previous_by_uuid: HashMap<&'a str, &'a ExtensionSpec>,
    /// `remote@tag` of every remote currently being walked.
    visiting: Vec<String>,
}

impl<'a> Walker<'a> {
    pub(super) fn new(host: &'a dyn RemoteContent, previous: &'a RepositoryLock) -> Self {
        let mut previous_by_name = HashMap::new();
        let mut previous_by_uuid = HashMap::new();
        for spec in &previous.extensions {
            previous_by_name.insert(spec.fully_qualified_name(), spec);
            previous_by_uuid.insert(spec.uuid.as_str(), spec);
        }
        Self {
            host,
            previous_by_name,
            previous_by_uuid,
            visiting: Vec::new(),
        }
    }

    /// Walk one remote, appending its specs (and those of child remotes) to `out`.
    pub(super) fn walk_remote(
        &mut self,
        remote: &str,
        tag: &str,
        out: &mut Vec<ExtensionSpec>,
    ) -> Result<()> {
        let refresh_all = is_latest(tag);
        let resolved_tag = if refresh_all {
            let resolved = self.host.resolve_latest_tag(remote)?;
            debug!("Resolved {}@latest to {}", remote, resolved);
            resolved
        } else {
            tag.to_string()
        };

        let key = format!("{}@{}", remote, resolved_tag);
        if self.visiting.contains(&key) {
            let mut cycle = self.visiting.clone();
            cycle.push(key);
            return Err(Error::CycleDetected {
                cycle: cycle.join(" -> "),
            });
        }

        self.visiting.push(key);
        let result = self.walk_definitions(remote, &resolved_tag, refresh_all, out);
        self.visiting.pop();
        result
    }

    fn walk_definitions(
        &mut self,
        remote: &str,
        tag: &str,
        refresh_all: bool,
        out: &mut Vec<ExtensionSpec>,
    ) -> Result<()> {
        let content = self.host.fetch_string(remote, tag, DEFINITIONS_FILE)?;
        let definitions = ExtensionDefinitionList::parse(&content).map_err(|e| Error::Config {
            message: format!("Invalid {} in {}@{}: {}", DEFINITIONS_FILE, remote, tag, e),
            hint: None,
        })?;
        let new_version = version_from_tag(tag).to_string();

        for definition in &definitions.extensions {
            let name = definition.fully_qualified_name();
            let uuid = self.resolve_uuid(definition);
            let candidate = parse_version(&name, &new_version)?;

            let previous = self.previous_by_uuid.get(uuid.as_str()).copied();
            let previous_version = previous.and_then(|p| {
                let parsed = parse_previous_version(&p.version);
                if parsed.is_none() {
                    info!(
                        "Cannot determine existing version for {}. Upgrading to {} anyway.",
                        name, new_version
                    );
                }
                parsed
            });

            let carried = previous
                .filter(|_| !refresh_all && !is_upgrade(previous_version.as_ref(), &candidate));
            match carried {
                Some(previous) => {
                    debug!("Keeping {} at version {}", name, previous.version);
                    self.walk_lock(previous, &mut Vec::new(), out)?;
                }
                None => {
                    let spec = self.refresh(remote, tag, definition, uuid, &new_version, out)?;
                    debug!("Found extension {} version {}", name, spec.version);
                    out.push(spec);
                }
            }
        }
        Ok(())
    }

    /// Build a fresh spec for `definition`, walking child remotes into `out` first.
    fn refresh(
        &mut self,
        remote: &str,
        tag: &str,
        definition: &ExtensionDefinition,
        uuid: String,
        version: &str,
        out: &mut Vec<ExtensionSpec>,
    ) -> Result<ExtensionSpec> {
        let mut children = Vec::new();
        let mut script = String::new();

        if definition.children.is_empty() {
            script = match &definition.script {
                Some(inline) => inline.clone(),
                None => self
                    .host
                    .fetch_string(remote, tag, &definition.script_file())?,
            };
        } else {
            if definition.script.is_some() || definition.script_file.is_some() {
                warn!(
                    "{} declares both children and a script; the script is ignored",
                    definition.fully_qualified_name()
                );
            }
            for child in &definition.children {
                children.push(child.reference());
                if let Some(child_remote) = &child.remote {
                    self.walk_remote(child_remote, child.tag.as_deref().unwrap_or(""), out)?;
                }
            }
        }

        let script = script.strip_suffix('\n').unwrap_or(&script).to_string();
        Ok(ExtensionSpec {
            name: definition.name.clone(),
            namespace: definition.namespace.clone(),
            version: version.to_string(),
            uuid,
            description: definition.description.clone(),
            parameters: definition.parameters.clone(),
            when: definition.when.clone(),
            given: definition.given.clone(),
            script,
            children,
        })
    }

    /// Emit a previous-lock entry preceded by its flattened children.
    fn walk_lock(
        &self,
        spec: &ExtensionSpec,
        ancestors: &mut Vec<String>,
        out: &mut Vec<ExtensionSpec>,
    ) -> Result<()> {
        if ancestors.contains(&spec.uuid) {
            let mut cycle = ancestors.clone();
            cycle.push(spec.uuid.clone());
            return Err(Error::CycleDetected {
                cycle: cycle.join(" -> "),
            });
        }

        ancestors.push(spec.uuid.clone());
        for child_uuid in &spec.children {
            let child = self
                .previous_by_uuid
                .get(child_uuid.as_str())
                .ok_or_else(|| Error::MissingExtension {
                    uuid: child_uuid.clone(),
                })?;
            self.walk_lock(child, ancestors, out)?;
        }
        ancestors.pop();

        out.push(spec.clone());
        Ok(())
    }

    /// Pinned UUID, else the previous lock's UUID for this name, else a new one.
    fn resolve_uuid(&self, definition: &ExtensionDefinition) -> String {
        if let Some(uuid) = definition.pinned_uuid() {
            return uuid.to_string();
        }

        let name = definition.fully_qualified_name();
        if let Some(previous) = self.previous_by_name.get(&name) {
            if !previous.uuid.is_empty() {
                return previous.uuid.clone();
            }
        }

        let generated = Uuid::new_v4().to_string();
        warn!(
            "No UUID found for {}. Generated UUID {}, please update your extension definition \
             accordingly; without it a rename will give the extension a new identity.",
            name, generated
        );
        generated
    }
}
