//! # Reference Reconciler
//!
//! Brings the reference containers of one source file up to date.
//!
//! A reconciliation walks `Requested -> Loaded -> Diffed -> Reconciled ->
//! Done`, or ends in `Failed`:
//!
//! - **Loaded**: every requested group is pulled into staging in one read of
//!   the file. A missing file or group fails the whole file before anything
//!   is touched.
//! - **Diffed**: per group, the `__REF<group>` container is found or created
//!   and the names it holds that the group no longer lists are collected.
//! - **Reconciled**: those objects are deleted, then each incoming member is
//!   handed to the identity remapper. An object another group of the same
//!   request still lists only leaves this container.
//! - **Done**: staging is empty again.
//!
//! Each group is all-or-nothing: a failure restores the document to its
//! state before that group started. Groups already reconciled stay
//! committed, and the rest of the file is abandoned.

use crate::document::DocumentModel;
use crate::primitives::reference_container_name;
use crate::remapper::{RemapOutcome, reconcile_object};
use crate::{ContainerId, GroupKey, LinkError, ObjectId};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Where a reconciliation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Requested,
    Loaded,
    Diffed,
    Reconciled,
    Done,
    Failed,
}

/// Counts for one reconciled file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub groups: usize,
    pub containers_created: usize,
    pub objects_added: usize,
    pub objects_updated: usize,
    pub objects_unchanged: usize,
    pub objects_removed: usize,
}

/// One `(file, [group names])` request moving through the state machine.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    path: PathBuf,
    group_names: Vec<String>,
    state: ReconcileState,
    report: ReconcileReport,
}

impl Reconciliation {
    /// Start a reconciliation for the named groups of one absolute file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, group_names: Vec<String>) -> Self {
        Self {
            path: path.into(),
            group_names,
            state: ReconcileState::Requested,
            report: ReconcileReport::default(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Counts so far.
    #[must_use]
    pub fn report(&self) -> ReconcileReport {
        self.report
    }

    /// The file being reconciled.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn transition(&mut self, next: ReconcileState) {
        tracing::debug!(
            file = %self.path.display(),
            from = ?self.state,
            to = ?next,
            "Reconciliation state change"
        );
        self.state = next;
    }

    /// Drive the reconciliation to `Done` or `Failed`.
    pub fn run<D: DocumentModel>(&mut self, doc: &mut D) -> Result<ReconcileReport, LinkError> {
        let groups = match doc.load_groups_from_file(&self.path, &self.group_names) {
            Ok(groups) => groups,
            Err(e) => {
                self.transition(ReconcileState::Failed);
                return Err(e.into());
            }
        };
        self.transition(ReconcileState::Loaded);
        tracing::info!(
            file = %self.path.display(),
            groups = groups.len(),
            "Loaded source file"
        );

        let keys: Vec<GroupKey> = groups.into_iter().map(|g| g.key).collect();
        let requested = staged_names(doc, &keys);
        for (done, key) in keys.iter().enumerate() {
            let checkpoint = doc.checkpoint();
            if let Err(e) = self.reconcile_group(doc, key, &requested) {
                doc.restore(checkpoint);
                for remaining in &keys[done..] {
                    doc.discard_external_group(remaining);
                }
                tracing::warn!(
                    file = %self.path.display(),
                    group = %key.name,
                    error = %e,
                    "Group reconciliation failed, group rolled back"
                );
                self.transition(ReconcileState::Failed);
                return Err(e);
            }
            self.report.groups += 1;
        }

        self.transition(ReconcileState::Done);
        Ok(self.report)
    }

    fn reconcile_group<D: DocumentModel>(
        &mut self,
        doc: &mut D,
        key: &GroupKey,
        requested: &BTreeSet<String>,
    ) -> Result<(), LinkError> {
        let container_name = reference_container_name(&key.name);
        let container = match doc.find_container_by_name(&container_name) {
            Some(container) => container,
            None => {
                tracing::info!(container = %container_name, "Created reference container");
                self.report.containers_created += 1;
                doc.create_container(&container_name)
            }
        };

        let removed = removed_members(doc, container, key)?;
        self.transition(ReconcileState::Diffed);

        for id in removed {
            let name = doc.object(id).map(|o| o.name).unwrap_or_default();
            if requested.contains(&name) {
                doc.remove_from_container(container, id)?;
                tracing::debug!(
                    object = %name,
                    container = %container_name,
                    "Object left container, still requested by another group"
                );
                continue;
            }
            doc.delete_object(id)?;
            tracing::info!(object = %name, container = %container_name, "Removed object");
            self.report.objects_removed += 1;
        }

        // Members are re-read each step: remapping an earlier member may
        // redirect or delete entries of this list.
        let mut seen: BTreeSet<ObjectId> = BTreeSet::new();
        loop {
            let next = doc
                .external_group_members(key)
                .into_iter()
                .find(|m| !seen.contains(m));
            let Some(member) = next else { break };
            seen.insert(member);
            if doc.is_local(member)? {
                // Installed by an earlier group of the same file
                doc.add_to_container(container, member)?;
                self.report.objects_unchanged += 1;
                continue;
            }
            let outcome = reconcile_object(doc, member, container)?;
            seen.insert(outcome.current());
            match outcome {
                RemapOutcome::Adopted(_) => self.report.objects_added += 1,
                RemapOutcome::Updated { .. } => self.report.objects_updated += 1,
                RemapOutcome::Unchanged(_) => self.report.objects_unchanged += 1,
            }
        }
        self.transition(ReconcileState::Reconciled);

        doc.discard_external_group(key);
        Ok(())
    }
}

/// Container members whose names the freshly loaded group no longer lists.
fn removed_members<D: DocumentModel>(
    doc: &D,
    container: ContainerId,
    key: &GroupKey,
) -> Result<Vec<ObjectId>, LinkError> {
    let incoming: BTreeSet<String> = doc
        .external_group_members(key)
        .into_iter()
        .filter_map(|id| doc.object(id).map(|o| o.name))
        .collect();
    Ok(doc
        .container_members(container)?
        .into_iter()
        .filter(|id| {
            doc.object(*id)
                .is_some_and(|o| !incoming.contains(&o.name))
        })
        .collect())
}

/// Names of every member staged for this request, across all its groups.
fn staged_names<D: DocumentModel>(doc: &D, keys: &[GroupKey]) -> BTreeSet<String> {
    keys.iter()
        .flat_map(|key| doc.external_group_members(key))
        .filter_map(|id| doc.object(id).map(|o| o.name))
        .collect()
}

/// Reconcile the named groups of one absolute file.
pub fn reconcile_file<D: DocumentModel>(
    doc: &mut D,
    path: &Path,
    group_names: &[String],
) -> Result<ReconcileReport, LinkError> {
    Reconciliation::new(path, group_names.to_vec()).run(doc)
}

// =============================================================================
// TESTS
// =============================================================================
