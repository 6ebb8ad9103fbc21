//! # Extension Schema
//!
//! Data structures for extensions in their two shapes:
//!
//! - **`ExtensionDefinition`**: what an author publishes in a remote's
//!   `extension-definitions.yaml`. The UUID is optional and children are
//!   references (a UUID, a fully qualified name, and optionally a further
//!   remote to fetch).
//! - **`ExtensionSpec`**: the resolved, locked record. It always carries a
//!   version and a UUID, its script is inlined, and after lock validation its
//!   children are UUIDs only.
//!
//! The UUID is the only identity that survives renames. The fully qualified
//! name (`namespace.name`) is a display label and is never used to key
//! installed state.

use serde::{Deserialize, Deserializer, Serialize};

use crate::naming::{kebab_case, snake_case};

/// The file each remote publishes its definitions in, at the repository root.
pub const DEFINITIONS_FILE: &str = "extension-definitions.yaml";

/// Build `namespace.name`, or just `name` when there is no namespace.
pub fn fully_qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// When an extension's script should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum When {
    /// When the extension is first installed.
    Install,
    /// When an installed extension moves to a newer version.
    Upgrade,
    /// As a step of a pipeline run.
    Pipeline,
    /// After a pipeline run.
    Post,
}

/// Returns true when an extension triggered on `when` should be queued for `kind`.
pub fn should_queue(when: &[When], kind: When) -> bool {
    when.contains(&kind)
}

/// Activation condition for an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Given {
    #[serde(alias = "Always")]
    Always,
    #[serde(alias = "Success")]
    Success,
    #[serde(alias = "Failure")]
    Failure,
}

/// Accept either a single value or a list.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// A named input to an extension's script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Overrides the environment variable the value is exposed as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variable_name: Option<String>,
}

/// A resolved, locked extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    pub version: String,
    pub uuid: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<When>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub given: Vec<Given>,
    #[serde(default)]
    pub script: String,
    /// Child UUIDs. Before lock validation these may still be names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl ExtensionSpec {
    pub fn fully_qualified_name(&self) -> String {
        fully_qualified_name(&self.namespace, &self.name)
    }

    /// The name the installed record is stored under, e.g. `acme.cheese-board`.
    pub fn resource_name(&self) -> String {
        if self.namespace.is_empty() {
            kebab_case(&self.name)
        } else {
            format!("{}.{}", kebab_case(&self.namespace), kebab_case(&self.name))
        }
    }
}

/// A reference from a composite definition to one of its children.
///
/// In YAML this is either a bare string (a UUID or a fully qualified name) or
/// a mapping with `name`, `namespace`, `uuid`, `remote` and `tag`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawChildReference")]
pub struct ChildReference {
    pub name: String,
    pub namespace: String,
    pub uuid: Option<String>,
    /// A further remote to walk for the child's definition.
    pub remote: Option<String>,
    pub tag: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChildReference {
    Bare(String),
    Detailed {
        #[serde(default)]
        name: String,
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        uuid: Option<String>,
        #[serde(default)]
        remote: Option<String>,
        #[serde(default)]
        tag: Option<String>,
    },
}

impl From<RawChildReference> for ChildReference {
    fn from(raw: RawChildReference) -> Self {
        match raw {
            RawChildReference::Bare(reference) => {
                if uuid::Uuid::parse_str(&reference).is_ok() {
                    ChildReference {
                        uuid: Some(reference),
                        ..Default::default()
                    }
                } else {
                    ChildReference {
                        name: reference,
                        ..Default::default()
                    }
                }
            }
            RawChildReference::Detailed {
                name,
                namespace,
                uuid,
                remote,
                tag,
            } => ChildReference {
                name,
                namespace,
                uuid: uuid.filter(|u| !u.is_empty()),
                remote: remote.filter(|r| !r.is_empty()),
                tag,
            },
        }
    }
}

impl ChildReference {
    /// The pinned UUID if any, otherwise the fully qualified name.
    pub fn reference(&self) -> String {
        match &self.uuid {
            Some(uuid) => uuid.clone(),
            None => fully_qualified_name(&self.namespace, &self.name),
        }
    }
}

/// An extension as published by its author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDefinition {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub when: Vec<When>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub given: Vec<Given>,
    /// Inline script text. Takes precedence over `script_file`.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub script_file: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildReference>,
}

impl ExtensionDefinition {
    pub fn fully_qualified_name(&self) -> String {
        fully_qualified_name(&self.namespace, &self.name)
    }

    /// The UUID the author pinned, ignoring empty strings.
    pub fn pinned_uuid(&self) -> Option<&str> {
        self.uuid.as_deref().filter(|u| !u.is_empty())
    }

    /// Path of the script inside the remote, defaulting to `<snake_name>.sh`.
    pub fn script_file(&self) -> String {
        match self.script_file.as_deref().filter(|f| !f.is_empty()) {
            Some(file) => file.to_string(),
            None => format!("{}.sh", snake_case(&self.name)),
        }
    }
}

/// The contents of a remote's definitions file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtensionDefinitionList {
    #[serde(default)]
    pub extensions: Vec<ExtensionDefinition>,
}

impl ExtensionDefinitionList {
    pub fn parse(yaml: &str) -> crate::error::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}
