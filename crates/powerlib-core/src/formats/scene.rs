//! # Scene Document Format
//!
//! JSON persistence for a [`Scene`]. The file carries a format tag and
//! version next to the [`SerializableScene`] snapshot; both are checked
//! before the snapshot is used. Staging is never written.

use super::{containing_dir, write_atomically};
use crate::PowerlibError;
use crate::primitives::{MAX_SCENE_FILE_SIZE, SCENE_FORMAT, SCENE_FORMAT_VERSION};
use crate::scene::{Scene, SerializableScene};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct SceneFile {
    format: String,
    version: u8,
    #[serde(flatten)]
    scene: SerializableScene,
}

/// Serialize a scene to pretty JSON.
pub fn scene_to_json(scene: &Scene) -> Result<Vec<u8>, PowerlibError> {
    let file = SceneFile {
        format: SCENE_FORMAT.to_string(),
        version: SCENE_FORMAT_VERSION,
        scene: SerializableScene::from(scene),
    };
    serde_json::to_vec_pretty(&file).map_err(|e| PowerlibError::Document(e.to_string()))
}

/// Parse a scene from JSON, validating the format tag and version.
pub fn scene_from_json(bytes: &[u8]) -> Result<Scene, PowerlibError> {
    let file: SceneFile =
        serde_json::from_slice(bytes).map_err(|e| PowerlibError::Document(e.to_string()))?;
    if file.format != SCENE_FORMAT {
        return Err(PowerlibError::Document(format!(
            "not a scene document (format '{}')",
            file.format
        )));
    }
    if file.version != SCENE_FORMAT_VERSION {
        return Err(PowerlibError::Document(format!(
            "unsupported scene version: {} (expected {})",
            file.version, SCENE_FORMAT_VERSION
        )));
    }
    Ok(Scene::from(file.scene))
}

/// Read a scene document from disk.
pub fn load_scene(path: &Path) -> Result<Scene, PowerlibError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| PowerlibError::Document(format!("{}: {e}", path.display())))?;
    if metadata.len() > MAX_SCENE_FILE_SIZE {
        return Err(PowerlibError::Document(format!(
            "file size {} bytes exceeds maximum {} bytes",
            metadata.len(),
            MAX_SCENE_FILE_SIZE
        )));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| PowerlibError::Document(format!("{}: {e}", path.display())))?;
    scene_from_json(&bytes)
}

/// Write a scene document to disk atomically.
pub fn save_scene(scene: &Scene, path: &Path) -> Result<(), PowerlibError> {
    let dir = containing_dir(path);
    if !dir.is_dir() {
        return Err(PowerlibError::Document(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }
    let bytes = scene_to_json(scene)?;
    write_atomically(path, &bytes)
        .map_err(|e| PowerlibError::Document(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), objects = scene.object_count(), "Scene saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_survives_disk_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shot.json");
        let mut scene = Scene::new();
        let body = scene.create_object("Body", "b");
        let arm = scene.create_object("Arm", "a");
        scene.set_parent(arm, Some(body)).expect("parent");
        let c = scene.create_container("__REFBoris_rig");
        scene.add_to_container(c, arm).expect("add");

        save_scene(&scene, &path).expect("save");
        let loaded = load_scene(&path).expect("load");

        assert_eq!(loaded, scene);
    }

    #[test]
    fn rejects_foreign_format_tag() {
        let json = br#"{"format":"other","version":1,"objects":[],"containers":[],"scene_links":[],"next_object_id":0,"next_container_id":0}"#;
        assert!(matches!(
            scene_from_json(json),
            Err(PowerlibError::Document(_))
        ));
    }

    #[test]
    fn rejects_future_version() {
        let json = br#"{"format":"powerlib-scene","version":99,"objects":[],"containers":[],"scene_links":[],"next_object_id":0,"next_container_id":0}"#;
        assert!(matches!(
            scene_from_json(json),
            Err(PowerlibError::Document(_))
        ));
    }
}
