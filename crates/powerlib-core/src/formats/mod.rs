//! # Formats
//!
//! On-disk formats: the catalog JSON file (`library`) and the scene document
//! file (`scene`). Both are written through a temporary file in the target
//! directory that is persisted over the destination, so a failed write never
//! truncates the previous content.

pub mod library;
pub mod scene;

pub use library::{catalog_from_json, catalog_to_json, load_library, save_library};
pub use scene::{load_scene, save_scene, scene_from_json, scene_to_json};

use std::io::Write;
use std::path::Path;

/// Directory a file path lives in; `.` for bare file names.
pub(crate) fn containing_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Write `bytes` to `path` via a persisted temp file in the same directory.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(containing_dir(path))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
