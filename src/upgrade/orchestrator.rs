//! Orchestrator for the complete upgrade operation

use super::{execute, reconcile, UpgradePlan};
use crate::chart::ChartRepository;
use crate::config::TeamExtensionConfig;
use crate::error::Result;
use crate::executable::ScriptRunner;
use crate::lock::RepositoryLock;
use crate::store::ExtensionStore;

/// Install and upgrade `team`'s extensions from `lock`.
///
/// 1. Reconcile against the records in `store`, writing creates and patches
/// 2. Refresh `charts` (unless `None`) and run the queued scripts in order
///
/// Returns the reconciled plan once every queued script has succeeded.
pub fn execute_upgrade(
    lock: &RepositoryLock,
    team: &TeamExtensionConfig,
    store: &dyn ExtensionStore,
    charts: Option<&dyn ChartRepository>,
    runner: &dyn ScriptRunner,
) -> Result<UpgradePlan> {
    let index = lock.index();

    // Phase 1: Reconcile
    let plan = reconcile::execute(&index, team, store)?;

    // Phase 2: Execute
    execute::execute(&plan.executables, charts, runner)?;

    Ok(plan)
}
