//! # Source Files
//!
//! External files that assets point into. A source file holds named objects
//! and named groups of those objects; link-in pulls groups out of it.
//!
//! On disk a source file is JSON:
//!
//! ```json
//! {
//!   "objects": {
//!     "Arm":  { "data": "mesh_arm", "parent": "Body" },
//!     "Body": { "data": "mesh_body", "animation": "walk" }
//!   },
//!   "groups": { "Boris_rig": ["Arm", "Body"] }
//! }
//! ```

use crate::LoadError;
use crate::primitives::MAX_SOURCE_FILE_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One authored object in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceObject {
    /// Authored payload (mesh/rig data identity).
    #[serde(default)]
    pub data: String,
    /// Name of the parent object, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Names of objects this one points at (constraints, modifiers).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    /// Hidden in the viewport.
    #[serde(default)]
    pub hidden: bool,
    /// Driving animation assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
}

impl SourceObject {
    /// Create an object with the given data payload.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set the parent by name.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add a target by name.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }
}

/// A parsed external file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceFile {
    /// Objects by name.
    #[serde(default)]
    pub objects: BTreeMap<String, SourceObject>,
    /// Groups by name, each listing member object names.
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl SourceFile {
    /// Create an empty source file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object.
    #[must_use]
    pub fn with_object(mut self, name: impl Into<String>, object: SourceObject) -> Self {
        self.objects.insert(name.into(), object);
        self
    }

    /// Add a group.
    #[must_use]
    pub fn with_group<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.groups
            .insert(name.into(), members.into_iter().map(Into::into).collect());
        self
    }

    /// Names of all groups in the file, sorted.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    /// Member names of a group.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Check that every group member names an object in the file.
    pub fn validate(&self, path: &Path) -> Result<(), LoadError> {
        for (group, members) in &self.groups {
            if let Some(missing) = members.iter().find(|m| !self.objects.contains_key(*m)) {
                return Err(LoadError::ContentInvalid {
                    file: path.to_path_buf(),
                    reason: format!("group '{group}' lists unknown object '{missing}'"),
                });
            }
        }
        Ok(())
    }

    /// Parse and validate a source file.
    pub fn from_json(path: &Path, bytes: &[u8]) -> Result<Self, LoadError> {
        let file: Self = serde_json::from_slice(bytes).map_err(|e| LoadError::ContentInvalid {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        file.validate(path)?;
        Ok(file)
    }
}

// =============================================================================
// READERS
// =============================================================================

/// Reads external source files.
///
/// The reader is the only I/O the linker performs. It is synchronous.
pub trait SourceReader {
    /// Read and parse the file at an absolute path.
    fn read_source(&self, path: &Path) -> Result<SourceFile, LoadError>;
}

impl<R: SourceReader + ?Sized> SourceReader for &R {
    fn read_source(&self, path: &Path) -> Result<SourceFile, LoadError> {
        (**self).read_source(path)
    }
}

/// Reads source files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read_source(&self, path: &Path) -> Result<SourceFile, LoadError> {
        let metadata =
            std::fs::metadata(path).map_err(|_| LoadError::FileMissing(path.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(LoadError::FileMissing(path.to_path_buf()));
        }
        if metadata.len() > MAX_SOURCE_FILE_SIZE {
            return Err(LoadError::ContentInvalid {
                file: path.to_path_buf(),
                reason: format!(
                    "file size {} bytes exceeds maximum {} bytes",
                    metadata.len(),
                    MAX_SOURCE_FILE_SIZE
                ),
            });
        }
        let bytes = std::fs::read(path).map_err(|e| LoadError::ContentInvalid {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        SourceFile::from_json(path, &bytes)
    }
}

/// Serves source files from memory, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceReader {
    files: BTreeMap<PathBuf, SourceFile>,
}

impl MemorySourceReader {
    /// Create an empty reader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<PathBuf>, file: SourceFile) {
        self.files.insert(path.into(), file);
    }

    /// Remove a file.
    pub fn remove(&mut self, path: &Path) -> Option<SourceFile> {
        self.files.remove(path)
    }

    /// Mutable access to a file, for editing between link-ins.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut SourceFile> {
        self.files.get_mut(path)
    }
}

impl SourceReader for MemorySourceReader {
    fn read_source(&self, path: &Path) -> Result<SourceFile, LoadError> {
        let file = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::FileMissing(path.to_path_buf()))?;
        file.validate(path)?;
        Ok(file)
    }
}

// =============================================================================
// TESTS
// =============================================================================
