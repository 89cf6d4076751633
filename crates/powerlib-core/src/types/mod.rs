//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Powerlib core:
//! - Scene handles (`ObjectId`, `ContainerId`) and external group addressing (`GroupKey`)
//! - The closed set of component kinds (`ComponentType`)
//! - Error taxonomies (`ReadFailure`, `WriteFailure`, `PathError`, `LoadError`,
//!   `LinkError`, `CatalogError`) and the umbrella `PowerlibError`
//!
//! ## Identity
//!
//! Scene objects are addressed by stable handles, never by name. Names are
//! display data that may collide transiently while a library file is being
//! linked in; handles never do.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// SCENE HANDLES
// =============================================================================

/// Stable identity of an object in the scene arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Stable identity of a reference container in the scene arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub u64);

/// Address of a group inside an external source file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    /// Absolute path of the source file.
    pub filepath: PathBuf,
    /// Name of the group inside that file.
    pub name: String,
}

impl GroupKey {
    /// Create a new group key.
    #[must_use]
    pub fn new(filepath: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filepath.display(), self.name)
    }
}

// =============================================================================
// COMPONENT TYPE
// =============================================================================

/// The kind of external data a component points at.
///
/// The variant decides how link-in treats the component: instance groups get
/// one proxy per group, group reference objects are unpacked and reconciled
/// member by member. Non-instance groups are a legacy kind that is still
/// stored and saved but no longer linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentType {
    InstanceGroups,
    NonInstanceGroups,
    GroupReferenceObjects,
}

impl ComponentType {
    /// All component types in catalog order.
    pub const ALL: [ComponentType; 3] = [
        ComponentType::InstanceGroups,
        ComponentType::NonInstanceGroups,
        ComponentType::GroupReferenceObjects,
    ];

    /// The key used for this type in the catalog JSON file.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::InstanceGroups => "instance_groups",
            Self::NonInstanceGroups => "noninstance_groups",
            Self::GroupReferenceObjects => "group_reference_objects",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InstanceGroups => "Instance Groups",
            Self::NonInstanceGroups => "Non Instance Groups",
            Self::GroupReferenceObjects => "Group Reference Objects",
        }
    }

    /// Look a type up by its catalog JSON key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ComponentType {
    type Err = CatalogError;

    /// Accepts the JSON key in any case (`instance_groups`, `INSTANCE_GROUPS`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(&s.to_ascii_lowercase())
            .ok_or_else(|| CatalogError::UnknownComponentType(s.to_string()))
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Why a catalog file could not be loaded.
///
/// Always recoverable; the session turns it into a visible library state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadFailure {
    /// No library file is configured.
    #[error("No library file configured")]
    NoFile,

    /// The configured path does not point at a readable file.
    #[error("Library path does not point at a readable file")]
    PathInvalid,

    /// The file is not JSON or does not have the catalog shape.
    #[error("Library file content is not a valid catalog")]
    ContentInvalid,

    /// The file holds a valid but empty catalog.
    #[error("Library file is empty")]
    Empty,
}

/// Why a catalog file could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteFailure {
    /// The target path is empty or its directory does not exist.
    #[error("Library path is not writable: {0}")]
    PathInvalid(String),

    /// Writing or persisting the file failed.
    #[error("I/O error while saving library: {0}")]
    IoError(String),
}

/// A path could not be resolved against the library or the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// No library file is configured, so library-relative paths have no root.
    #[error("No library configured; library-relative paths cannot be resolved")]
    NoLibrary,

    /// The document has no path on disk, so `//` paths have no root.
    #[error("Document has no file path; document-relative paths cannot be resolved")]
    NoDocument,

    /// The path is empty.
    #[error("Empty path")]
    Empty,

    /// The base directory is not absolute.
    #[error("Base directory is not absolute: {0}")]
    RelativeBase(String),

    /// Resolving `..` components walked above the filesystem root.
    #[error("Path escapes the filesystem root: {0}")]
    EscapesRoot(String),
}

/// An external source file or group could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The source file does not exist.
    #[error("Source file not found: {}", .0.display())]
    FileMissing(PathBuf),

    /// The source file exists but does not contain the requested group.
    #[error("Group '{group}' not found in {}", .file.display())]
    GroupMissing { file: PathBuf, group: String },

    /// The source file could not be parsed or is internally inconsistent.
    #[error("Source file {} is invalid: {reason}", .file.display())]
    ContentInvalid { file: PathBuf, reason: String },
}

/// Errors raised while linking an asset into the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// A component path could not be resolved.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A source file or group could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A handle did not resolve to a live object.
    #[error("Object not found: {0:?}")]
    ObjectNotFound(ObjectId),

    /// A handle did not resolve to a live container.
    #[error("Container not found: {0:?}")]
    ContainerNotFound(ContainerId),

    /// More than one local object shares the incoming object's name.
    ///
    /// Local names are unique in a consistent document, so this is a logic
    /// fault rather than a user-facing condition.
    #[error("Remap invariant violated: {} local objects named '{name}'", .candidates.len())]
    RemapInvariantViolation {
        name: String,
        candidates: Vec<ObjectId>,
    },
}

/// Catalog edit rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Names must be non-empty.
    #[error("Name must not be empty")]
    EmptyName,

    /// A collection with this name already exists.
    #[error("Collection '{0}' already exists")]
    DuplicateCollection(String),

    /// An asset with this name already exists in the collection.
    #[error("Asset '{asset}' already exists in collection '{collection}'")]
    DuplicateAsset { collection: String, asset: String },

    /// No collection with this name.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// No asset with this name in the collection.
    #[error("Asset '{asset}' not found in collection '{collection}'")]
    AssetNotFound { collection: String, asset: String },

    /// No component at this index.
    #[error("No {component_type} component at index {index} in asset '{asset}'")]
    ComponentNotFound {
        asset: String,
        component_type: ComponentType,
        index: usize,
    },

    /// The component type key is not recognised.
    #[error("Component type not supported: {0}")]
    UnknownComponentType(String),
}

/// Umbrella error for callers that handle every failure in one place.
#[derive(Debug, Error)]
pub enum PowerlibError {
    #[error(transparent)]
    Read(#[from] ReadFailure),

    #[error(transparent)]
    Write(#[from] WriteFailure),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The scene document file could not be read or written.
    #[error("Document error: {0}")]
    Document(String),

    /// Configuration could not be read or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_keys_round_trip() {
        for ty in ComponentType::ALL {
            assert_eq!(ComponentType::from_key(ty.key()), Some(ty));
        }
        assert_eq!(ComponentType::from_key("scripts"), None);
    }

    #[test]
    fn component_type_parses_upper_case() {
        let ty: ComponentType = "GROUP_REFERENCE_OBJECTS".parse().expect("parse");
        assert_eq!(ty, ComponentType::GroupReferenceObjects);
        assert!(matches!(
            "bogus".parse::<ComponentType>(),
            Err(CatalogError::UnknownComponentType(_))
        ));
    }

    #[test]
    fn component_type_order_is_catalog_order() {
        let mut types = vec![
            ComponentType::GroupReferenceObjects,
            ComponentType::InstanceGroups,
            ComponentType::NonInstanceGroups,
        ];
        types.sort();
        assert_eq!(types, ComponentType::ALL.to_vec());
    }

    #[test]
    fn link_error_wraps_load_error() {
        let err: LinkError = LoadError::FileMissing(PathBuf::from("/lib/a.ext")).into();
        assert_eq!(err.to_string(), "Source file not found: /lib/a.ext");
    }
}
