//! # Document Model
//!
//! The `DocumentModel` trait is the seam between the linker and the host
//! document. The reconciler, remapper and instancing code only ever talk to
//! this trait; `Document` is the implementation backed by the in-memory
//! [`Scene`] arena and a [`SourceReader`].

use crate::scene::{Scene, SceneObject};
use crate::source::SourceReader;
use crate::{ContainerId, GroupKey, LinkError, LoadError, ObjectId};
use std::path::Path;

/// An external group freshly pulled into staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalGroup {
    pub key: GroupKey,
    /// Linked (non-local) member objects, in source order.
    pub members: Vec<ObjectId>,
}

/// Operations the linker needs from the host document.
///
/// Handles are the only identity. Every operation that takes a handle fails
/// with `ObjectNotFound`/`ContainerNotFound` when it is not live.
pub trait DocumentModel {
    /// Opaque snapshot used to undo a partially reconciled group.
    type Checkpoint;

    /// Load the named groups of one source file into staging.
    /// All names are checked before anything is loaded.
    fn load_groups_from_file(
        &mut self,
        path: &Path,
        names: &[String],
    ) -> Result<Vec<ExternalGroup>, LoadError>;

    /// Names of every group in a source file.
    fn group_names_in_file(&self, path: &Path) -> Result<Vec<String>, LoadError>;

    /// Current members of a staged group. Follows remaps and deletions made
    /// since the group was loaded.
    fn external_group_members(&self, key: &GroupKey) -> Vec<ObjectId>;

    /// Drop a staged group together with any member still linked.
    fn discard_external_group(&mut self, key: &GroupKey);

    /// Snapshot of an object.
    fn object(&self, id: ObjectId) -> Option<SceneObject>;

    /// Every object carrying `name`, local or linked.
    fn objects_named(&self, name: &str) -> Vec<ObjectId>;

    /// The local object carrying `name`.
    fn find_object_by_name(&self, name: &str) -> Option<ObjectId>;

    /// Whether the document owns the object.
    fn is_local(&self, id: ObjectId) -> Result<bool, LinkError>;

    /// Find a container by name.
    fn find_container_by_name(&self, name: &str) -> Option<ContainerId>;

    /// Create an empty container.
    fn create_container(&mut self, name: &str) -> ContainerId;

    /// Remove a container, keeping its members.
    fn remove_container(&mut self, id: ContainerId) -> Result<(), LinkError>;

    /// Members of a container.
    fn container_members(&self, id: ContainerId) -> Result<Vec<ObjectId>, LinkError>;

    /// Add an object to a container.
    fn add_to_container(&mut self, id: ContainerId, obj: ObjectId) -> Result<(), LinkError>;

    /// Remove an object from a container.
    fn remove_from_container(&mut self, id: ContainerId, obj: ObjectId)
    -> Result<(), LinkError>;

    /// Turn a linked stand-in into a document-owned object.
    fn make_local(&mut self, id: ObjectId) -> Result<ObjectId, LinkError>;

    /// Redirect every reference from `from` to `to`.
    fn remap_references(&mut self, from: ObjectId, to: ObjectId) -> Result<(), LinkError>;

    /// Rename an object.
    fn rename_object(&mut self, id: ObjectId, name: &str) -> Result<(), LinkError>;

    /// Set visibility and animation assignment.
    fn set_presentation(
        &mut self,
        id: ObjectId,
        hidden: bool,
        animation: Option<String>,
    ) -> Result<(), LinkError>;

    /// Link an object into the active scene.
    fn link_to_scene(&mut self, id: ObjectId) -> Result<(), LinkError>;

    /// Delete an object and every reference to it.
    fn delete_object(&mut self, id: ObjectId) -> Result<(), LinkError>;

    /// Create a proxy that instances a whole external group.
    fn create_instance_proxy(&mut self, key: &GroupKey) -> ObjectId;

    /// Capture the current document state.
    fn checkpoint(&self) -> Self::Checkpoint;

    /// Return to a captured state.
    fn restore(&mut self, checkpoint: Self::Checkpoint);
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// An open document: a scene plus the reader used to open source files.
#[derive(Debug, Clone, Default)]
pub struct Document<R> {
    scene: Scene,
    reader: R,
}

impl<R: SourceReader> Document<R> {
    /// Open an empty document.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            scene: Scene::new(),
            reader,
        }
    }

    /// Open a document over an existing scene.
    #[must_use]
    pub fn with_scene(scene: Scene, reader: R) -> Self {
        Self { scene, reader }
    }

    /// The underlying scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the underlying scene.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Close the document, keeping its scene.
    #[must_use]
    pub fn into_scene(self) -> Scene {
        self.scene
    }

    /// The source reader.
    #[must_use]
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Mutable access to the source reader.
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Create a local object, linked into the scene, with a unique name.
    pub fn create_object(&mut self, name: &str, data: &str) -> ObjectId {
        self.scene.create_object(name, data)
    }
}

impl<R: SourceReader> DocumentModel for Document<R> {
    type Checkpoint = Scene;

    fn load_groups_from_file(
        &mut self,
        path: &Path,
        names: &[String],
    ) -> Result<Vec<ExternalGroup>, LoadError> {
        let file = self.reader.read_source(path)?;
        let staged = self.scene.stage_groups(path, &file, names)?;
        Ok(staged
            .into_iter()
            .map(|(key, members)| ExternalGroup { key, members })
            .collect())
    }

    fn group_names_in_file(&self, path: &Path) -> Result<Vec<String>, LoadError> {
        Ok(self.reader.read_source(path)?.group_names())
    }

    fn external_group_members(&self, key: &GroupKey) -> Vec<ObjectId> {
        self.scene.staged_members(key)
    }

    fn discard_external_group(&mut self, key: &GroupKey) {
        let deleted = self.scene.discard_staged_group(key);
        if deleted > 0 {
            tracing::debug!(group = %key, deleted, "Discarded unused linked objects");
        }
    }

    fn object(&self, id: ObjectId) -> Option<SceneObject> {
        self.scene.object(id).cloned()
    }

    fn objects_named(&self, name: &str) -> Vec<ObjectId> {
        self.scene.objects_named(name)
    }

    fn find_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.scene.local_object_named(name)
    }

    fn is_local(&self, id: ObjectId) -> Result<bool, LinkError> {
        self.scene
            .object(id)
            .map(SceneObject::is_local)
            .ok_or(LinkError::ObjectNotFound(id))
    }

    fn find_container_by_name(&self, name: &str) -> Option<ContainerId> {
        self.scene.container_named(name).map(|c| c.id)
    }

    fn create_container(&mut self, name: &str) -> ContainerId {
        self.scene.create_container(name)
    }

    fn remove_container(&mut self, id: ContainerId) -> Result<(), LinkError> {
        self.scene.remove_container(id).map(|_| ())
    }

    fn container_members(&self, id: ContainerId) -> Result<Vec<ObjectId>, LinkError> {
        self.scene.container_members(id)
    }

    fn add_to_container(&mut self, id: ContainerId, obj: ObjectId) -> Result<(), LinkError> {
        self.scene.add_to_container(id, obj)
    }

    fn remove_from_container(
        &mut self,
        id: ContainerId,
        obj: ObjectId,
    ) -> Result<(), LinkError> {
        self.scene.remove_from_container(id, obj)
    }

    fn make_local(&mut self, id: ObjectId) -> Result<ObjectId, LinkError> {
        self.scene.make_local(id)
    }

    fn remap_references(&mut self, from: ObjectId, to: ObjectId) -> Result<(), LinkError> {
        self.scene.remap_references(from, to)
    }

    fn rename_object(&mut self, id: ObjectId, name: &str) -> Result<(), LinkError> {
        self.scene.rename_object(id, name)
    }

    fn set_presentation(
        &mut self,
        id: ObjectId,
        hidden: bool,
        animation: Option<String>,
    ) -> Result<(), LinkError> {
        let obj = self.scene.object_mut(id)?;
        obj.hidden = hidden;
        obj.animation = animation;
        Ok(())
    }

    fn link_to_scene(&mut self, id: ObjectId) -> Result<(), LinkError> {
        self.scene.link_to_scene(id)
    }

    fn delete_object(&mut self, id: ObjectId) -> Result<(), LinkError> {
        self.scene.delete_object(id).map(|_| ())
    }

    fn create_instance_proxy(&mut self, key: &GroupKey) -> ObjectId {
        self.scene.create_instance_proxy(key)
    }

    fn checkpoint(&self) -> Scene {
        self.scene.clone()
    }

    fn restore(&mut self, checkpoint: Scene) {
        self.scene = checkpoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySourceReader, SourceFile, SourceObject};
    use std::path::PathBuf;

    fn document() -> Document<MemorySourceReader> {
        let mut reader = MemorySourceReader::new();
        reader.insert(
            "/lib/boris.ext",
            SourceFile::new()
                .with_object("Arm", SourceObject::new("m_arm"))
                .with_group("Boris_rig", ["Arm"]),
        );
        Document::new(reader)
    }

    #[test]
    fn loaded_objects_are_linked_until_made_local() {
        let mut doc = document();
        let groups = doc
            .load_groups_from_file(Path::new("/lib/boris.ext"), &["Boris_rig".into()])
            .expect("load");
        let arm = groups[0].members[0];
        assert_eq!(doc.is_local(arm), Ok(false));
        assert_eq!(doc.find_object_by_name("Arm"), None);

        doc.make_local(arm).expect("local");
        assert_eq!(doc.is_local(arm), Ok(true));
        assert_eq!(doc.find_object_by_name("Arm"), Some(arm));
        assert_eq!(
            doc.object(arm).and_then(|o| o.origin),
            Some(PathBuf::from("/lib/boris.ext"))
        );
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let mut doc = document();
        let err = doc
            .load_groups_from_file(Path::new("/lib/none.ext"), &["X".into()])
            .expect_err("missing");
        assert_eq!(err, LoadError::FileMissing(PathBuf::from("/lib/none.ext")));
    }

    #[test]
    fn removing_a_container_keeps_its_members() {
        let mut doc = document();
        let arm = doc.create_object("Arm", "m_arm");
        let body = doc.create_object("Body", "m_body");
        let c = doc.create_container("__REFBoris_rig");
        doc.add_to_container(c, arm).expect("add arm");
        doc.add_to_container(c, body).expect("add body");

        doc.remove_from_container(c, arm).expect("remove arm");
        assert_eq!(doc.container_members(c), Ok(vec![body]));
        assert!(doc.object(arm).is_some());

        doc.remove_container(c).expect("remove container");
        assert_eq!(doc.find_container_by_name("__REFBoris_rig"), None);
        assert!(doc.object(body).is_some());
        assert_eq!(doc.remove_container(c), Err(LinkError::ContainerNotFound(c)));
        assert_eq!(
            doc.remove_from_container(c, body),
            Err(LinkError::ContainerNotFound(c))
        );
    }

    #[test]
    fn restore_undoes_changes_since_checkpoint() {
        let mut doc = document();
        let checkpoint = doc.checkpoint();
        doc.create_object("Temp", "m");
        doc.create_container("__REFTemp");
        doc.restore(checkpoint);
        assert_eq!(doc.scene().object_count(), 0);
        assert_eq!(doc.scene().container_count(), 0);
    }
}
