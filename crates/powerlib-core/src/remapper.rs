//! # Identity Remapper
//!
//! Installs one freshly loaded object into the document, next to whatever
//! local object already carries its name.
//!
//! Three outcomes:
//! - **Adopted**: no local object has the name. The incoming object is made
//!   local, linked into the scene and added to the reference container.
//! - **Unchanged**: a local object has the name and the same authored
//!   content. Everything pointing at the incoming copy is redirected to the
//!   existing object and the copy is deleted, so the existing handle and its
//!   presentation state survive as they are.
//! - **Updated**: a local object has the name but different content. Every
//!   reference to the old object is redirected to the incoming one, the old
//!   object is retired (renamed, then deleted), the incoming one takes its
//!   name and inherits its visibility and animation.
//!
//! Only local objects are candidates. Linked stand-ins loaded in the same
//! pass may share the incoming name and are never remapped onto, and neither
//! are instancing proxies, which keep their own identity.

use crate::document::DocumentModel;
use crate::primitives::retired_name;
use crate::scene::SceneObject;
use crate::{ContainerId, LinkError, ObjectId};
use std::path::PathBuf;

/// What happened to one incoming object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapOutcome {
    /// First import of this name. The incoming object is now the local one.
    Adopted(ObjectId),
    /// The existing local object had identical content and was kept.
    Unchanged(ObjectId),
    /// The existing local object was replaced by the incoming one.
    Updated {
        retired: ObjectId,
        current: ObjectId,
    },
}

impl RemapOutcome {
    /// The object that carries the name after reconciliation.
    #[must_use]
    pub fn current(self) -> ObjectId {
        match self {
            Self::Adopted(id) | Self::Unchanged(id) => id,
            Self::Updated { current, .. } => current,
        }
    }
}

/// Authored content of an object, with references expressed by name so that
/// a linked copy and its local counterpart compare equal.
#[derive(Debug, PartialEq, Eq)]
struct Fingerprint {
    data: String,
    parent: Option<String>,
    targets: Vec<String>,
    source: Option<PathBuf>,
}

fn fingerprint<D: DocumentModel>(doc: &D, obj: &SceneObject) -> Fingerprint {
    let name_of = |id: ObjectId| doc.object(id).map(|o| o.name);
    let mut targets: Vec<String> = obj.targets.iter().filter_map(|t| name_of(*t)).collect();
    targets.sort();
    Fingerprint {
        data: obj.data.clone(),
        parent: obj.parent.and_then(name_of),
        targets,
        source: obj.library.clone().or_else(|| obj.origin.clone()),
    }
}

/// Reconcile one incoming (linked) object into `container`.
pub fn reconcile_object<D: DocumentModel>(
    doc: &mut D,
    incoming: ObjectId,
    container: ContainerId,
) -> Result<RemapOutcome, LinkError> {
    let new_obj = doc
        .object(incoming)
        .ok_or(LinkError::ObjectNotFound(incoming))?;

    let mut candidates = Vec::new();
    for id in doc.objects_named(&new_obj.name) {
        let is_proxy = doc.object(id).is_some_and(|o| o.instance_of.is_some());
        if id != incoming && !is_proxy && doc.is_local(id)? {
            candidates.push(id);
        }
    }

    let existing = match candidates.as_slice() {
        [] => {
            doc.make_local(incoming)?;
            doc.link_to_scene(incoming)?;
            doc.add_to_container(container, incoming)?;
            tracing::debug!(object = %new_obj.name, "Adopted new object");
            return Ok(RemapOutcome::Adopted(incoming));
        }
        [existing] => *existing,
        _ => {
            return Err(LinkError::RemapInvariantViolation {
                name: new_obj.name,
                candidates,
            });
        }
    };

    let old_obj = doc
        .object(existing)
        .ok_or(LinkError::ObjectNotFound(existing))?;

    if fingerprint(doc, &old_obj) == fingerprint(doc, &new_obj) {
        doc.remap_references(incoming, existing)?;
        doc.delete_object(incoming)?;
        doc.add_to_container(container, existing)?;
        tracing::debug!(object = %old_obj.name, "Object unchanged");
        return Ok(RemapOutcome::Unchanged(existing));
    }

    doc.remap_references(existing, incoming)?;
    doc.rename_object(existing, &retired_name(&old_obj.name))?;
    doc.make_local(incoming)?;
    doc.rename_object(incoming, &old_obj.name)?;

    let animation = old_obj.animation.clone().or(new_obj.animation);
    doc.set_presentation(incoming, old_obj.hidden, animation)?;

    doc.delete_object(existing)?;
    doc.link_to_scene(incoming)?;
    doc.add_to_container(container, incoming)?;

    tracing::debug!(object = %old_obj.name, ?existing, ?incoming, "Object updated");
    Ok(RemapOutcome::Updated {
        retired: existing,
        current: incoming,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::source::{MemorySourceReader, SourceFile, SourceObject};
    use std::path::Path;

    const FILE: &str = "/lib/boris.ext";

    fn load(doc: &mut Document<MemorySourceReader>, file: SourceFile) -> Vec<ObjectId> {
        doc.reader_mut().insert(FILE, file);
        let groups = doc
            .load_groups_from_file(Path::new(FILE), &["Rig".into()])
            .expect("load");
        groups[0].members.clone()
    }

    fn arm(data: &str) -> SourceFile {
        SourceFile::new()
            .with_object("Arm", SourceObject::new(data))
            .with_group("Rig", ["Arm"])
    }

    #[test]
    fn first_import_adopts() {
        let mut doc = Document::new(MemorySourceReader::new());
        let c = doc.create_container("__REFRig");
        let incoming = load(&mut doc, arm("v1"))[0];

        let outcome = reconcile_object(&mut doc, incoming, c).expect("reconcile");

        assert_eq!(outcome, RemapOutcome::Adopted(incoming));
        assert_eq!(doc.is_local(incoming), Ok(true));
        assert!(doc.scene().is_in_scene(incoming));
        assert_eq!(doc.container_members(c).expect("members"), vec![incoming]);
    }

    #[test]
    fn identical_content_keeps_existing_handle() {
        let mut doc = Document::new(MemorySourceReader::new());
        let c = doc.create_container("__REFRig");
        let first = load(&mut doc, arm("v1"))[0];
        reconcile_object(&mut doc, first, c).expect("first");

        let second = load(&mut doc, arm("v1"))[0];
        let outcome = reconcile_object(&mut doc, second, c).expect("second");

        assert_eq!(outcome, RemapOutcome::Unchanged(first));
        assert!(doc.object(second).is_none());
        assert_eq!(doc.objects_named("Arm"), vec![first]);
    }

    #[test]
    fn changed_content_replaces_and_carries_presentation() {
        let mut doc = Document::new(MemorySourceReader::new());
        let c = doc.create_container("__REFRig");
        let old = load(&mut doc, arm("v1"))[0];
        reconcile_object(&mut doc, old, c).expect("first");
        doc.set_presentation(old, true, Some("walk_cycle".into()))
            .expect("presentation");
        let hand = doc.create_object("Hand", "m_hand");
        doc.scene_mut().set_parent(hand, Some(old)).expect("parent");

        let new = load(&mut doc, arm("v2"))[0];
        let outcome = reconcile_object(&mut doc, new, c).expect("second");

        assert_eq!(
            outcome,
            RemapOutcome::Updated {
                retired: old,
                current: new
            }
        );
        assert!(doc.object(old).is_none());
        let new_obj = doc.object(new).expect("new");
        assert_eq!(new_obj.name, "Arm");
        assert_eq!(new_obj.data, "v2");
        assert!(new_obj.hidden);
        assert_eq!(new_obj.animation.as_deref(), Some("walk_cycle"));
        assert_eq!(doc.object(hand).and_then(|o| o.parent), Some(new));
        assert_eq!(doc.objects_named("Arm"), vec![new]);
        assert!(
            doc.scene()
                .objects()
                .all(|o| !o.name.starts_with(crate::primitives::RETIRED_PREFIX))
        );
    }

    #[test]
    fn two_local_candidates_violate_the_invariant() {
        let mut doc = Document::new(MemorySourceReader::new());
        let c = doc.create_container("__REFRig");
        let a = doc.create_object("Arm", "x");
        let b = doc.create_object("Arm.001", "x");
        doc.rename_object(b, "Arm").expect("rename");
        let incoming = load(&mut doc, arm("v1"))[0];

        let err = reconcile_object(&mut doc, incoming, c).expect_err("violation");
        assert_eq!(
            err,
            LinkError::RemapInvariantViolation {
                name: "Arm".into(),
                candidates: vec![a, b],
            }
        );
    }
}
