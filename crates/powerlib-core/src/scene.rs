//! # Scene Arena
//!
//! The document-side state the linker reads and mutates: objects, reference
//! containers, the set of objects linked into the active scene, and the
//! staging area that holds external groups while a file is being linked.
//!
//! Every object and container has a stable handle. References between objects
//! (parenting, constraint targets, container membership, scene links) are
//! stored as handles, so redirecting them is a handle rewrite and never a
//! rename. Names are display data; two objects may share one transiently while
//! a library file is being loaded.
//!
//! All maps are `BTreeMap`/`BTreeSet`, so iteration order is deterministic.

use crate::primitives::unique_name;
use crate::source::SourceFile;
use crate::{ContainerId, GroupKey, LinkError, LoadError, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

// =============================================================================
// OBJECTS & CONTAINERS
// =============================================================================

/// An object in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Stable handle.
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Authored payload (mesh/rig data identity).
    pub data: String,
    /// Parent object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    /// Objects this one points at (constraints, modifiers).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<ObjectId>,
    /// Hidden in the viewport.
    #[serde(default)]
    pub hidden: bool,
    /// Driving animation assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    /// Source file this object is still linked to. `None` means local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
    /// Source file a local object was made local from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<PathBuf>,
    /// Group this object instances, for instancing proxies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_of: Option<GroupKey>,
}

impl SceneObject {
    fn new(id: ObjectId, name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            data: data.into(),
            parent: None,
            targets: Vec::new(),
            hidden: false,
            animation: None,
            library: None,
            origin: None,
            instance_of: None,
        }
    }

    /// Whether the document owns this object (as opposed to a linked stand-in).
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.library.is_none()
    }
}

/// A persistent named set of objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Stable handle.
    pub id: ContainerId,
    /// Display name, unique among containers.
    pub name: String,
    /// Member objects.
    pub members: BTreeSet<ObjectId>,
}

// =============================================================================
// SCENE
// =============================================================================

/// The object arena of one open document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    containers: BTreeMap<ContainerId, Container>,
    scene_links: BTreeSet<ObjectId>,
    staging: BTreeMap<GroupKey, Vec<ObjectId>>,
    next_object_id: u64,
    next_container_id: u64,
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    /// All objects in handle order.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    /// Look an object up by handle.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Whether a handle is live.
    #[must_use]
    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Handles of every object carrying `name`, local or linked.
    #[must_use]
    pub fn objects_named(&self, name: &str) -> Vec<ObjectId> {
        self.objects
            .values()
            .filter(|o| o.name == name)
            .map(|o| o.id)
            .collect()
    }

    /// The local object carrying `name`, if any.
    #[must_use]
    pub fn local_object_named(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .values()
            .find(|o| o.name == name && o.is_local())
            .map(|o| o.id)
    }

    /// All containers in handle order.
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    /// Look a container up by handle.
    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id)
    }

    /// Look a container up by name.
    #[must_use]
    pub fn container_named(&self, name: &str) -> Option<&Container> {
        self.containers.values().find(|c| c.name == name)
    }

    /// Names of a container's members, sorted.
    #[must_use]
    pub fn member_names(&self, id: ContainerId) -> Vec<String> {
        let mut names: Vec<String> = self
            .containers
            .get(&id)
            .into_iter()
            .flat_map(|c| c.members.iter())
            .filter_map(|m| self.objects.get(m))
            .map(|o| o.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Whether an object is linked into the active scene.
    #[must_use]
    pub fn is_in_scene(&self, id: ObjectId) -> bool {
        self.scene_links.contains(&id)
    }

    /// Objects linked into the active scene.
    pub fn scene_links(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.scene_links.iter().copied()
    }

    /// Keys of external groups currently held in staging.
    pub fn staged_groups(&self) -> impl Iterator<Item = &GroupKey> {
        self.staging.keys()
    }

    /// Members of a staged external group.
    #[must_use]
    pub fn staged_members(&self, key: &GroupKey) -> Vec<ObjectId> {
        self.staging.get(key).cloned().unwrap_or_default()
    }

    /// Number of objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    // =========================================================================
    // OBJECT LIFECYCLE
    // =========================================================================

    fn alloc_object_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_object_id);
        self.next_object_id = self.next_object_id.saturating_add(1);
        id
    }

    fn unique_object_name(&self, base: &str) -> String {
        unique_name(base, self.objects.values().map(|o| o.name.as_str()))
    }

    /// Create a local object linked into the scene.
    ///
    /// The name is made unique among existing objects (`Name.001`, ...).
    pub fn create_object(&mut self, name: &str, data: &str) -> ObjectId {
        let name = self.unique_object_name(name);
        let id = self.alloc_object_id();
        self.objects.insert(id, SceneObject::new(id, name, data));
        self.scene_links.insert(id);
        id
    }

    /// Create an instancing proxy for a whole external group.
    ///
    /// Proxies are never deduplicated: each call makes a new one.
    pub fn create_instance_proxy(&mut self, key: &GroupKey) -> ObjectId {
        let name = self.unique_object_name(&key.name);
        let id = self.alloc_object_id();
        let mut proxy = SceneObject::new(id, name, String::new());
        proxy.instance_of = Some(key.clone());
        self.objects.insert(id, proxy);
        self.scene_links.insert(id);
        id
    }

    /// Mutable access to an object's fields.
    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject, LinkError> {
        self.objects.get_mut(&id).ok_or(LinkError::ObjectNotFound(id))
    }

    /// Rename an object. Names are not checked for uniqueness here.
    pub fn rename_object(&mut self, id: ObjectId, name: &str) -> Result<(), LinkError> {
        self.object_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Set a parent-child relation.
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> Result<(), LinkError> {
        if let Some(parent) = parent {
            if !self.objects.contains_key(&parent) {
                return Err(LinkError::ObjectNotFound(parent));
            }
        }
        self.object_mut(child)?.parent = parent;
        Ok(())
    }

    /// Add a constraint/modifier target.
    pub fn add_target(&mut self, object: ObjectId, target: ObjectId) -> Result<(), LinkError> {
        if !self.objects.contains_key(&target) {
            return Err(LinkError::ObjectNotFound(target));
        }
        let obj = self.object_mut(object)?;
        if !obj.targets.contains(&target) {
            obj.targets.push(target);
        }
        Ok(())
    }

    /// Link an object into the active scene.
    pub fn link_to_scene(&mut self, id: ObjectId) -> Result<(), LinkError> {
        if !self.objects.contains_key(&id) {
            return Err(LinkError::ObjectNotFound(id));
        }
        self.scene_links.insert(id);
        Ok(())
    }

    /// Detach an object from its source file.
    pub fn make_local(&mut self, id: ObjectId) -> Result<ObjectId, LinkError> {
        let obj = self.object_mut(id)?;
        if let Some(library) = obj.library.take() {
            obj.origin = Some(library);
        }
        Ok(id)
    }

    /// Delete an object and every reference to it.
    ///
    /// Parent links to it are cleared, it is dropped from target lists,
    /// containers, the scene and staging. Nothing is left dangling.
    pub fn delete_object(&mut self, id: ObjectId) -> Result<SceneObject, LinkError> {
        let removed = self
            .objects
            .remove(&id)
            .ok_or(LinkError::ObjectNotFound(id))?;
        for obj in self.objects.values_mut() {
            if obj.parent == Some(id) {
                obj.parent = None;
            }
            obj.targets.retain(|t| *t != id);
        }
        for container in self.containers.values_mut() {
            container.members.remove(&id);
        }
        self.scene_links.remove(&id);
        for members in self.staging.values_mut() {
            members.retain(|m| *m != id);
        }
        Ok(removed)
    }

    /// Redirect every reference held by document data from `from` to `to`.
    ///
    /// Covers parenting, targets, container membership, scene links and
    /// staging. A redirect that would make `to` reference itself is dropped.
    /// `from` itself is left in place with its own fields untouched.
    pub fn remap_references(&mut self, from: ObjectId, to: ObjectId) -> Result<(), LinkError> {
        if !self.objects.contains_key(&from) {
            return Err(LinkError::ObjectNotFound(from));
        }
        if !self.objects.contains_key(&to) {
            return Err(LinkError::ObjectNotFound(to));
        }
        if from == to {
            return Ok(());
        }

        for obj in self.objects.values_mut() {
            if obj.id == from {
                continue;
            }
            if obj.parent == Some(from) {
                obj.parent = if obj.id == to { None } else { Some(to) };
            }
            if obj.targets.contains(&from) {
                let own = obj.id;
                let mut redirected = Vec::with_capacity(obj.targets.len());
                for target in obj.targets.drain(..) {
                    let target = if target == from { to } else { target };
                    if target != own && !redirected.contains(&target) {
                        redirected.push(target);
                    }
                }
                obj.targets = redirected;
            }
        }

        for container in self.containers.values_mut() {
            if container.members.remove(&from) {
                container.members.insert(to);
            }
        }

        if self.scene_links.remove(&from) {
            self.scene_links.insert(to);
        }

        for members in self.staging.values_mut() {
            if members.contains(&from) {
                let mut redirected = Vec::with_capacity(members.len());
                for member in members.drain(..) {
                    let member = if member == from { to } else { member };
                    if !redirected.contains(&member) {
                        redirected.push(member);
                    }
                }
                *members = redirected;
            }
        }

        Ok(())
    }

    // =========================================================================
    // CONTAINERS
    // =========================================================================

    /// Create an empty container.
    pub fn create_container(&mut self, name: &str) -> ContainerId {
        let id = ContainerId(self.next_container_id);
        self.next_container_id = self.next_container_id.saturating_add(1);
        self.containers.insert(
            id,
            Container {
                id,
                name: name.to_string(),
                members: BTreeSet::new(),
            },
        );
        id
    }

    /// Remove a container. Its members stay in the document.
    pub fn remove_container(&mut self, id: ContainerId) -> Result<Container, LinkError> {
        self.containers
            .remove(&id)
            .ok_or(LinkError::ContainerNotFound(id))
    }

    fn container_mut(&mut self, id: ContainerId) -> Result<&mut Container, LinkError> {
        self.containers
            .get_mut(&id)
            .ok_or(LinkError::ContainerNotFound(id))
    }

    /// Members of a container.
    pub fn container_members(&self, id: ContainerId) -> Result<Vec<ObjectId>, LinkError> {
        self.containers
            .get(&id)
            .map(|c| c.members.iter().copied().collect())
            .ok_or(LinkError::ContainerNotFound(id))
    }

    /// Add an object to a container. Adding a member twice is a no-op.
    pub fn add_to_container(&mut self, id: ContainerId, obj: ObjectId) -> Result<(), LinkError> {
        if !self.objects.contains_key(&obj) {
            return Err(LinkError::ObjectNotFound(obj));
        }
        self.container_mut(id)?.members.insert(obj);
        Ok(())
    }

    /// Remove an object from a container. The object stays in the document.
    pub fn remove_from_container(
        &mut self,
        id: ContainerId,
        obj: ObjectId,
    ) -> Result<(), LinkError> {
        self.container_mut(id)?.members.remove(&obj);
        Ok(())
    }

    // =========================================================================
    // STAGING
    // =========================================================================

    /// Pull the named groups of a source file into staging as linked objects.
    ///
    /// Every requested name is checked before anything is created, so a
    /// missing group leaves the scene untouched. Objects shared by several
    /// requested groups are loaded once. References between loaded objects
    /// are resolved by name; references to objects outside the loaded set
    /// are dropped.
    pub fn stage_groups(
        &mut self,
        path: &Path,
        file: &SourceFile,
        names: &[String],
    ) -> Result<Vec<(GroupKey, Vec<ObjectId>)>, LoadError> {
        let mut requested: Vec<&str> = Vec::new();
        for name in names {
            if file.group(name).is_none() {
                return Err(LoadError::GroupMissing {
                    file: path.to_path_buf(),
                    group: name.clone(),
                });
            }
            if !requested.contains(&name.as_str()) {
                requested.push(name);
            }
        }

        // Member union in request order
        let mut loaded: BTreeMap<String, ObjectId> = BTreeMap::new();
        let mut order: Vec<String> = Vec::new();
        for group in &requested {
            for member in file.group(group).unwrap_or_default() {
                if !loaded.contains_key(member) {
                    let id = self.alloc_object_id();
                    loaded.insert(member.clone(), id);
                    order.push(member.clone());
                }
            }
        }

        for name in &order {
            let Some(&id) = loaded.get(name) else { continue };
            let Some(source) = file.objects.get(name) else {
                return Err(LoadError::ContentInvalid {
                    file: path.to_path_buf(),
                    reason: format!("object '{name}' is listed in a group but not defined"),
                });
            };
            let mut obj = SceneObject::new(id, name.clone(), source.data.clone());
            obj.parent = source.parent.as_ref().and_then(|p| loaded.get(p).copied());
            obj.targets = source
                .targets
                .iter()
                .filter_map(|t| loaded.get(t).copied())
                .collect();
            obj.hidden = source.hidden;
            obj.animation = source.animation.clone();
            obj.library = Some(path.to_path_buf());
            self.objects.insert(id, obj);
        }

        let mut staged = Vec::with_capacity(requested.len());
        for group in requested {
            let key = GroupKey::new(path, group);
            let members: Vec<ObjectId> = file
                .group(group)
                .unwrap_or_default()
                .iter()
                .filter_map(|m| loaded.get(m).copied())
                .collect();
            self.staging.insert(key.clone(), members.clone());
            staged.push((key, members));
        }
        Ok(staged)
    }

    /// Drop a staged group. Members still linked (never made local) and not
    /// held by another staged group are deleted. Returns how many were.
    pub fn discard_staged_group(&mut self, key: &GroupKey) -> usize {
        let Some(members) = self.staging.remove(key) else {
            return 0;
        };
        let still_staged: BTreeSet<ObjectId> =
            self.staging.values().flatten().copied().collect();
        let mut deleted = 0;
        for member in members {
            let linked = self.objects.get(&member).is_some_and(|o| !o.is_local());
            if linked && !still_staged.contains(&member) && self.delete_object(member).is_ok() {
                deleted += 1;
            }
        }
        deleted
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Serializable snapshot of a scene. Staging is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableScene {
    pub objects: Vec<SceneObject>,
    pub containers: Vec<Container>,
    pub scene_links: Vec<ObjectId>,
    pub next_object_id: u64,
    pub next_container_id: u64,
}

impl From<&Scene> for SerializableScene {
    fn from(scene: &Scene) -> Self {
        Self {
            objects: scene.objects.values().cloned().collect(),
            containers: scene.containers.values().cloned().collect(),
            scene_links: scene.scene_links.iter().copied().collect(),
            next_object_id: scene.next_object_id,
            next_container_id: scene.next_container_id,
        }
    }
}

impl From<SerializableScene> for Scene {
    fn from(ss: SerializableScene) -> Self {
        let mut scene = Scene::new();
        for obj in ss.objects {
            scene.next_object_id = scene.next_object_id.max(obj.id.0.saturating_add(1));
            scene.objects.insert(obj.id, obj);
        }
        for container in ss.containers {
            scene.next_container_id = scene
                .next_container_id
                .max(container.id.0.saturating_add(1));
            scene.containers.insert(container.id, container);
        }
        scene.next_object_id = scene.next_object_id.max(ss.next_object_id);
        scene.next_container_id = scene.next_container_id.max(ss.next_container_id);

        // Drop references to handles that did not survive
        let live: BTreeSet<ObjectId> = scene.objects.keys().copied().collect();
        for obj in scene.objects.values_mut() {
            if obj.parent.is_some_and(|p| !live.contains(&p)) {
                obj.parent = None;
            }
            obj.targets.retain(|t| live.contains(t));
        }
        for container in scene.containers.values_mut() {
            container.members.retain(|m| live.contains(m));
        }
        scene.scene_links = ss
            .scene_links
            .into_iter()
            .filter(|id| live.contains(id))
            .collect();
        scene
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceObject;

    fn rig_file() -> SourceFile {
        SourceFile::new()
            .with_object("Body", SourceObject::new("mesh_body"))
            .with_object("Arm", SourceObject::new("mesh_arm").with_parent("Body"))
            .with_object("Prop", SourceObject::new("mesh_prop").with_target("Arm"))
            .with_group("Rig", ["Body", "Arm"])
            .with_group("Props", ["Prop", "Arm"])
    }

    #[test]
    fn create_object_uniquifies_names() {
        let mut scene = Scene::new();
        let a = scene.create_object("Cube", "m");
        let b = scene.create_object("Cube", "m");
        assert_eq!(scene.object(a).map(|o| o.name.as_str()), Some("Cube"));
        assert_eq!(scene.object(b).map(|o| o.name.as_str()), Some("Cube.001"));
        assert!(scene.is_in_scene(a));
    }

    #[test]
    fn delete_object_clears_every_reference() {
        let mut scene = Scene::new();
        let parent = scene.create_object("Body", "m");
        let child = scene.create_object("Arm", "m");
        scene.set_parent(child, Some(parent)).expect("parent");
        scene.add_target(child, parent).expect("target");
        let container = scene.create_container("__REFRig");
        scene.add_to_container(container, parent).expect("add");

        scene.delete_object(parent).expect("delete");

        let child_obj = scene.object(child).expect("child");
        assert_eq!(child_obj.parent, None);
        assert!(child_obj.targets.is_empty());
        assert!(scene.container_members(container).expect("members").is_empty());
        assert!(!scene.is_in_scene(parent));
    }

    #[test]
    fn remap_redirects_handles_not_names() {
        let mut scene = Scene::new();
        let old = scene.create_object("Arm", "v1");
        let new = scene.create_object("Arm.new", "v2");
        let hand = scene.create_object("Hand", "m");
        scene.set_parent(hand, Some(old)).expect("parent");
        let container = scene.create_container("__REFRig");
        scene.add_to_container(container, old).expect("add");

        scene.remap_references(old, new).expect("remap");

        assert_eq!(scene.object(hand).and_then(|o| o.parent), Some(new));
        assert_eq!(scene.container_members(container).expect("members"), vec![new]);
        assert_eq!(scene.object(old).map(|o| o.name.as_str()), Some("Arm"));
    }

    #[test]
    fn remap_never_makes_an_object_its_own_parent() {
        let mut scene = Scene::new();
        let old = scene.create_object("Body", "v1");
        let new = scene.create_object("Body.new", "v2");
        scene.set_parent(new, Some(old)).expect("parent");
        scene.remap_references(old, new).expect("remap");
        assert_eq!(scene.object(new).and_then(|o| o.parent), None);
    }

    #[test]
    fn stage_groups_loads_shared_members_once() {
        let mut scene = Scene::new();
        let path = Path::new("/lib/rig.ext");
        let staged = scene
            .stage_groups(path, &rig_file(), &["Rig".into(), "Props".into()])
            .expect("stage");

        assert_eq!(staged.len(), 2);
        assert_eq!(scene.object_count(), 3);
        let arm = scene.objects_named("Arm");
        assert_eq!(arm.len(), 1);
        let arm_obj = scene.object(arm[0]).expect("arm");
        assert!(!arm_obj.is_local());
        let body = scene.objects_named("Body")[0];
        assert_eq!(arm_obj.parent, Some(body));
    }

    #[test]
    fn stage_groups_checks_names_before_mutating() {
        let mut scene = Scene::new();
        let err = scene
            .stage_groups(
                Path::new("/lib/rig.ext"),
                &rig_file(),
                &["Rig".into(), "Ghost".into()],
            )
            .expect_err("missing");
        assert!(matches!(err, LoadError::GroupMissing { ref group, .. } if group == "Ghost"));
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.staged_groups().count(), 0);
    }

    #[test]
    fn discard_staged_group_deletes_linked_leftovers() {
        let mut scene = Scene::new();
        let path = Path::new("/lib/rig.ext");
        let staged = scene
            .stage_groups(path, &rig_file(), &["Rig".into()])
            .expect("stage");
        let (key, members) = &staged[0];
        scene.make_local(members[0]).expect("local");

        let deleted = scene.discard_staged_group(key);

        assert_eq!(deleted, 1);
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.staged_groups().count(), 0);
    }

    #[test]
    fn serializable_round_trip_preserves_handles() {
        let mut scene = Scene::new();
        let a = scene.create_object("A", "m");
        let b = scene.create_object("B", "m");
        scene.set_parent(b, Some(a)).expect("parent");
        let c = scene.create_container("__REFG");
        scene.add_to_container(c, a).expect("add");

        let restored = Scene::from(SerializableScene::from(&scene));
        assert_eq!(restored, scene);

        let mut restored = restored;
        let next = restored.create_object("C", "m");
        assert!(next > b);
    }
}
