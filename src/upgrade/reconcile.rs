//! Phase 1: reconcile the lock against the installed records.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::{Change, UpgradePlan};
use crate::config::{ExtensionConfig, TeamExtensionConfig};
use crate::error::{Error, Result};
use crate::executable::ExecutableExtension;
use crate::extension::{should_queue, ExtensionSpec, When};
use crate::lock::LockIndex;
use crate::store::{ExtensionRecord, ExtensionStore};
use crate::version::{is_upgrade, parse_previous_version, parse_version};

/// One pending node of the depth-first walk.
struct Frame<'a> {
    uuid: String,
    depth: usize,
    /// UUIDs from the top-level extension down to this one's parent.
    path: Vec<String>,
    /// Team configuration of the top-level extension this node descends from.
    root: &'a ExtensionConfig,
}

/// Walks the lock tree and owns every write to the installed map.
pub struct Reconciler<'a> {
    lock: &'a LockIndex,
    team: &'a TeamExtensionConfig,
    store: &'a dyn ExtensionStore,
    installed: HashMap<String, ExtensionRecord>,
    plan: UpgradePlan,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        lock: &'a LockIndex,
        team: &'a TeamExtensionConfig,
        store: &'a dyn ExtensionStore,
        installed: HashMap<String, ExtensionRecord>,
    ) -> Self {
        Self {
            lock,
            team,
            store,
            installed,
            plan: UpgradePlan::default(),
        }
    }

    /// Process every configured extension in team-config order.
    pub fn run(mut self) -> Result<UpgradePlan> {
        if self.team.extensions.is_empty() {
            warn!("No extensions configured; nothing to install or upgrade");
            return Ok(self.plan);
        }

        let team = self.team;
        for configured in &team.extensions {
            let name = configured.fully_qualified_name();
            let roots: Vec<String> = self
                .lock
                .find_by_name(&name)
                .into_iter()
                .map(|spec| spec.uuid.clone())
                .collect();
            if roots.is_empty() {
                warn!(
                    "Extension {} is configured but not present in the extension repository",
                    name
                );
                continue;
            }
            for uuid in roots {
                self.walk(uuid, configured)?;
            }
        }
        Ok(self.plan)
    }

    /// The installed records as they stand after the walk so far.
    pub fn installed(&self) -> &HashMap<String, ExtensionRecord> {
        &self.installed
    }

    /// Depth-first from `uuid`: parent, then each child's subtree in order.
    ///
    /// Every extension in the subtree is bound with `root`'s parameters unless
    /// it is configured in its own right.
    fn walk(&mut self, uuid: String, root: &'a ExtensionConfig) -> Result<()> {
        let mut stack = vec![Frame {
            uuid,
            depth: 0,
            path: Vec::new(),
            root,
        }];

        while let Some(frame) = stack.pop() {
            if frame.path.contains(&frame.uuid) {
                let mut cycle = frame.path.clone();
                cycle.push(frame.uuid);
                return Err(Error::CycleDetected {
                    cycle: cycle.join(" -> "),
                });
            }

            let lock = self.lock;
            let spec = lock.get(&frame.uuid).ok_or_else(|| Error::MissingExtension {
                uuid: frame.uuid.clone(),
            })?;
            self.upsert(spec, frame.depth, frame.root)?;

            let mut path = frame.path;
            path.push(frame.uuid);
            for child in spec.children.iter().rev() {
                stack.push(Frame {
                    uuid: child.clone(),
                    depth: frame.depth + 1,
                    path: path.clone(),
                    root: frame.root,
                });
            }
        }
        Ok(())
    }

    fn upsert(
        &mut self,
        spec: &ExtensionSpec,
        depth: usize,
        root: &'a ExtensionConfig,
    ) -> Result<()> {
        let name = spec.fully_qualified_name();
        let candidate = parse_version(&name, &spec.version)?;
        let prefix = indent(depth);

        let Some(existing) = self.installed.get(&spec.uuid) else {
            return self.install(spec, &prefix, root);
        };

        let current = parse_previous_version(&existing.spec.version);
        if !is_upgrade(current.as_ref(), &candidate) {
            debug!(
                "{}{} is up to date at version {}",
                prefix, name, existing.spec.version
            );
            return Ok(());
        }

        let from = existing.spec.version.clone();
        let mut record = existing.clone();
        record.spec = spec.clone();
        self.store.patch_update(&record)?;
        info!(
            "{}Upgrading {} from version {} to {}",
            prefix, name, from, spec.version
        );
        self.installed.insert(spec.uuid.clone(), record);
        self.plan.changes.push(Change::Upgraded {
            name,
            from,
            to: spec.version.clone(),
        });

        if should_queue(&spec.when, When::Upgrade) {
            self.queue(spec, root);
        }
        Ok(())
    }

    fn install(
        &mut self,
        spec: &ExtensionSpec,
        prefix: &str,
        root: &'a ExtensionConfig,
    ) -> Result<()> {
        let name = spec.fully_qualified_name();
        let record = ExtensionRecord::new(spec.clone());

        if let Some(clash) = self
            .installed
            .values()
            .find(|r| r.resource_name == record.resource_name && r.spec.uuid != spec.uuid)
        {
            return Err(Error::UuidChanged {
                name,
                resource: clash.resource_name.clone(),
                old_uuid: clash.spec.uuid.clone(),
                new_uuid: spec.uuid.clone(),
            });
        }

        self.store.create(&record)?;
        info!("{}Adding {} version {}", prefix, name, spec.version);
        self.installed.insert(spec.uuid.clone(), record);
        self.plan.changes.push(Change::Created {
            name,
            version: spec.version.clone(),
        });

        if should_queue(&spec.when, When::Install) {
            self.queue(spec, root);
        }
        Ok(())
    }

    fn queue(&mut self, spec: &ExtensionSpec, root: &'a ExtensionConfig) {
        let name = spec.fully_qualified_name();
        let team = self.team_config(&name).unwrap_or(root);
        self.plan
            .executables
            .push(ExecutableExtension::new(spec, Some(team)));
    }

    fn team_config(&self, name: &str) -> Option<&'a ExtensionConfig> {
        self.team
            .extensions
            .iter()
            .find(|c| c.fully_qualified_name() == name)
    }
}

/// `""` at the top level, then `└ ` indented two spaces per extra level.
fn indent(depth: usize) -> String {
    if depth == 0 {
        String::new()
    } else {
        format!("{}└ ", "  ".repeat(depth - 1))
    }
}

/// Reconcile `team` against `lock` and the records in `store`.
pub fn execute(
    lock: &LockIndex,
    team: &TeamExtensionConfig,
    store: &dyn ExtensionStore,
) -> Result<UpgradePlan> {
    let installed = store.list_installed()?;
    debug!("{} extension(s) installed", installed.len());
    Reconciler::new(lock, team, store, installed).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterValue;
    use std::cell::RefCell;

    /// Records every store call and keeps records in memory.
    #[derive(Default)]
    struct MemoryStore {
        records: RefCell<HashMap<String, ExtensionRecord>>,
        calls: RefCell<Vec<String>>,
    }

    impl MemoryStore {
        fn with(records: Vec<ExtensionRecord>) -> Self {
            let store = Self::default();
            for record in records {
                store
                    .records
                    .borrow_mut()
                    .insert(record.spec.uuid.clone(), record);
            }
            store
        }
    }

    impl ExtensionStore for MemoryStore {
        fn list_installed(&self) -> Result<HashMap<String, ExtensionRecord>> {
            Ok(self.records.borrow().clone())
        }

        fn create(&self, record: &ExtensionRecord) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("create {}", record.resource_name));
            self.records
                .borrow_mut()
                .insert(record.spec.uuid.clone(), record.clone());
            Ok(())
        }

        fn patch_update(&self, record: &ExtensionRecord) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("patch {}", record.resource_name));
            self.records
                .borrow_mut()
                .insert(record.spec.uuid.clone(), record.clone());
            Ok(())
        }
    }

    fn spec(uuid: &str, name: &str, version: &str, when: &[When], children: &[&str]) -> ExtensionSpec {
        ExtensionSpec {
            name: name.to_string(),
            namespace: "acme".to_string(),
            version: version.to_string(),
            uuid: uuid.to_string(),
            when: when.to_vec(),
            script: format!("echo {}", name),
            children: children.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn team(names: &[&str]) -> TeamExtensionConfig {
        TeamExtensionConfig {
            extensions: names
                .iter()
                .map(|n| ExtensionConfig {
                    name: n.to_string(),
                    namespace: "acme".to_string(),
                    parameters: vec![],
                })
                .collect(),
        }
    }

    fn names(plan: &UpgradePlan) -> Vec<&str> {
        plan.executables.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_parent_then_each_child_subtree() {
        let install = [When::Install];
        let lock = LockIndex::new(&[
            spec("p", "parent", "1.0.0", &install, &["c1", "c2"]),
            spec("c1", "one", "1.0.0", &install, &["g1"]),
            spec("g1", "grandchild", "1.0.0", &install, &[]),
            spec("c2", "two", "1.0.0", &install, &[]),
        ]);
        let store = MemoryStore::default();

        let plan = execute(&lock, &team(&["parent"]), &store).unwrap();

        assert_eq!(
            names(&plan),
            vec!["acme.parent", "acme.one", "acme.grandchild", "acme.two"]
        );
        assert_eq!(store.records.borrow().len(), 4);
    }

    #[test]
    fn test_shared_child_is_created_once() {
        let install = [When::Install];
        let lock = LockIndex::new(&[
            spec("a", "alpha", "1.0.0", &install, &["s"]),
            spec("b", "beta", "1.0.0", &install, &["s"]),
            spec("s", "shared", "1.0.0", &install, &[]),
        ]);
        let store = MemoryStore::default();

        let plan = execute(&lock, &team(&["alpha", "beta"]), &store).unwrap();

        assert_eq!(names(&plan), vec!["acme.alpha", "acme.shared", "acme.beta"]);
        assert_eq!(
            *store.calls.borrow(),
            vec!["create acme.alpha", "create acme.shared", "create acme.beta"]
        );
    }

    #[test]
    fn test_upgrade_patches_and_queues_when_requested() {
        let lock = LockIndex::new(&[spec("a", "cheese", "1.1.0", &[When::Upgrade], &[])]);
        let store = MemoryStore::with(vec![ExtensionRecord::new(spec(
            "a", "cheese", "1.0.0", &[When::Upgrade], &[],
        ))]);

        let plan = execute(&lock, &team(&["cheese"]), &store).unwrap();

        assert_eq!(names(&plan), vec!["acme.cheese"]);
        assert_eq!(*store.calls.borrow(), vec!["patch acme.cheese"]);
        assert_eq!(store.records.borrow()["a"].spec.version, "1.1.0");
        assert_eq!(
            plan.changes,
            vec![Change::Upgraded {
                name: "acme.cheese".to_string(),
                from: "1.0.0".to_string(),
                to: "1.1.0".to_string(),
            }]
        );
    }

    #[test]
    fn test_install_only_extension_is_not_queued_on_upgrade() {
        let lock = LockIndex::new(&[spec("a", "cheese", "1.1.0", &[When::Install], &[])]);
        let store = MemoryStore::with(vec![ExtensionRecord::new(spec(
            "a", "cheese", "1.0.0", &[When::Install], &[],
        ))]);

        let plan = execute(&lock, &team(&["cheese"]), &store).unwrap();

        assert!(plan.executables.is_empty());
        assert_eq!(store.records.borrow()["a"].spec.version, "1.1.0");
    }

    #[test]
    fn test_never_downgrades() {
        let both = [When::Install, When::Upgrade];
        let lock = LockIndex::new(&[spec("a", "cheese", "1.0.0", &both, &[])]);
        let store = MemoryStore::with(vec![ExtensionRecord::new(spec(
            "a", "cheese", "2.0.0", &both, &[],
        ))]);

        let plan = execute(&lock, &team(&["cheese"]), &store).unwrap();

        assert!(plan.is_empty());
        assert!(store.calls.borrow().is_empty());
        assert_eq!(store.records.borrow()["a"].spec.version, "2.0.0");
    }

    #[test]
    fn test_resource_name_collision_fails_without_writing() {
        let lock = LockIndex::new(&[spec("new", "cheese", "1.0.0", &[When::Install], &[])]);
        let store = MemoryStore::with(vec![ExtensionRecord::new(spec(
            "old", "cheese", "1.0.0", &[When::Install], &[],
        ))]);

        let err = execute(&lock, &team(&["cheese"]), &store).unwrap_err();

        match err {
            Error::UuidChanged {
                old_uuid, new_uuid, ..
            } => {
                assert_eq!(old_uuid, "old");
                assert_eq!(new_uuid, "new");
            }
            other => panic!("expected UUID change, got {other}"),
        }
        assert!(store.calls.borrow().is_empty());
        assert_eq!(store.records.borrow().len(), 1);
    }

    #[test]
    fn test_missing_child_is_an_error() {
        let lock = LockIndex::new(&[spec("p", "parent", "1.0.0", &[], &["ghost"])]);
        let store = MemoryStore::default();

        let err = execute(&lock, &team(&["parent"]), &store).unwrap_err();
        assert!(matches!(err, Error::MissingExtension { uuid } if uuid == "ghost"));
    }

    #[test]
    fn test_child_cycle_is_detected() {
        let lock = LockIndex::new(&[
            spec("a", "alpha", "1.0.0", &[], &["b"]),
            spec("b", "beta", "1.0.0", &[], &["a"]),
        ]);
        let store = MemoryStore::default();

        let err = execute(&lock, &team(&["alpha"]), &store).unwrap_err();
        match err {
            Error::CycleDetected { cycle } => assert_eq!(cycle, "a -> b -> a"),
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn test_unknown_and_empty_team_config_do_nothing() {
        let lock = LockIndex::new(&[spec("a", "cheese", "1.0.0", &[When::Install], &[])]);
        let store = MemoryStore::default();

        assert!(execute(&lock, &team(&["nope"]), &store).unwrap().is_empty());
        assert!(execute(&lock, &team(&[]), &store).unwrap().is_empty());
        assert!(store.calls.borrow().is_empty());
    }

    #[test]
    fn test_team_parameters_reach_the_executable() {
        let mut cheese = spec("a", "cheese", "1.0.0", &[When::Install], &[]);
        cheese.parameters = vec![crate::extension::Parameter {
            name: "slackChannel".to_string(),
            description: String::new(),
            default_value: Some("#general".to_string()),
            environment_variable_name: None,
        }];
        let lock = LockIndex::new(&[cheese]);
        let mut config = team(&["cheese"]);
        config.extensions[0].parameters.push(ParameterValue {
            name: "slackChannel".to_string(),
            value: "#cheese".to_string(),
        });
        let store = MemoryStore::default();

        let plan = execute(&lock, &config, &store).unwrap();
        assert_eq!(plan.executables[0].describe_env(), "[ SLACK_CHANNEL=#cheese ]");
    }

    fn with_channel(mut spec: ExtensionSpec) -> ExtensionSpec {
        spec.parameters = vec![crate::extension::Parameter {
            name: "slackChannel".to_string(),
            description: String::new(),
            default_value: Some("#general".to_string()),
            environment_variable_name: None,
        }];
        spec
    }

    fn set_channel(config: &mut TeamExtensionConfig, index: usize, value: &str) {
        config.extensions[index].parameters.push(ParameterValue {
            name: "slackChannel".to_string(),
            value: value.to_string(),
        });
    }

    #[test]
    fn test_children_inherit_the_parent_parameters() {
        let install = [When::Install];
        let lock = LockIndex::new(&[
            spec("p", "parent", "1.0.0", &install, &["c"]),
            with_channel(spec("c", "child", "1.0.0", &install, &["g"])),
            with_channel(spec("g", "grandchild", "1.0.0", &install, &[])),
        ]);
        let mut config = team(&["parent"]);
        set_channel(&mut config, 0, "#team");
        let store = MemoryStore::default();

        let plan = execute(&lock, &config, &store).unwrap();

        assert_eq!(plan.executables[1].name, "acme.child");
        assert_eq!(plan.executables[1].describe_env(), "[ SLACK_CHANNEL=#team ]");
        assert_eq!(plan.executables[2].describe_env(), "[ SLACK_CHANNEL=#team ]");
    }

    #[test]
    fn test_configured_child_keeps_its_own_parameters() {
        let install = [When::Install];
        let lock = LockIndex::new(&[
            spec("p", "parent", "1.0.0", &install, &["c"]),
            with_channel(spec("c", "child", "1.0.0", &install, &[])),
        ]);
        let mut config = team(&["parent", "child"]);
        set_channel(&mut config, 0, "#team");
        set_channel(&mut config, 1, "#child");
        let store = MemoryStore::default();

        let plan = execute(&lock, &config, &store).unwrap();

        assert_eq!(names(&plan), vec!["acme.parent", "acme.child"]);
        assert_eq!(plan.executables[1].describe_env(), "[ SLACK_CHANNEL=#child ]");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(1), "└ ");
        assert_eq!(indent(3), "    └ ");
    }
}
