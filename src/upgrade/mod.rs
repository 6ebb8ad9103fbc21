//! Installing and upgrading a team's extensions from a lock.
//!
//! ## Overview
//!
//! An upgrade runs in two phases:
//! 1. Reconcile - walk every extension the team opted into (and its children,
//!    depth-first, parent before children) against the installed records,
//!    creating or patching records and queueing the scripts to run
//! 2. Execute - refresh the chart repository index once, then run the queued
//!    scripts strictly in order
//!
//! All store writes happen in phase 1, so a failing script leaves the records
//! already updated. There is no rollback.

use crate::executable::ExecutableExtension;

pub mod execute;
pub mod orchestrator;
pub mod reconcile;

pub use orchestrator::execute_upgrade;

/// What happened to one extension during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Created { name: String, version: String },
    Upgraded { name: String, from: String, to: String },
}

/// The outcome of the reconcile phase.
#[derive(Debug, Clone, Default)]
pub struct UpgradePlan {
    /// Scripts to run, in execution order.
    pub executables: Vec<ExecutableExtension>,
    /// Record changes already written to the store, in walk order.
    pub changes: Vec<Change>,
}

impl UpgradePlan {
    pub fn is_empty(&self) -> bool {
        self.executables.is_empty() && self.changes.is_empty()
    }
}
