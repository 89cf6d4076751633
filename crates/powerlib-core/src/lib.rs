//! # powerlib-core
//!
//! The asset-library engine for Powerlib.
//!
//! This crate holds the catalog of reusable assets (collections of assets,
//! each made of typed components pointing at groups in external files) and
//! the reconciliation engine that links an asset's groups into an open scene
//! document, updating previously linked copies in place.
//!
//! ## Layout
//!
//! - `catalog`, `formats::library`: the catalog model and its JSON file
//! - `paths`: library-relative, document-relative and absolute paths
//! - `source`: external source files and how they are read
//! - `scene`, `document`: the scene arena and the `DocumentModel` seam
//! - `aggregator`, `reconciler`, `remapper`, `instancing`, `linking`: link-in
//! - `session`: a catalog attached to one open document
//!
//! ## Architectural Constraints
//!
//! - Synchronous: a link-in runs to completion on the caller's thread
//! - Deterministic: ordered maps wherever output reaches disk
//! - No ambient state: everything hangs off an explicit session value

// =============================================================================
// MODULES
// =============================================================================

pub mod aggregator;
pub mod catalog;
pub mod document;
pub mod formats;
pub mod instancing;
pub mod linking;
pub mod paths;
pub mod primitives;
pub mod reconciler;
pub mod remapper;
pub mod scene;
pub mod session;
pub mod source;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CatalogError, ComponentType, ContainerId, GroupKey, LinkError, LoadError, ObjectId,
    PathError, PowerlibError, ReadFailure, WriteFailure,
};

// =============================================================================
// RE-EXPORTS: Catalog & Linking
// =============================================================================

pub use aggregator::{FileRequests, LinkRequests, aggregate_requests};
pub use catalog::{
    Asset, Catalog, CatalogEvent, Collection, Component, ComponentGroup, ComponentLocation,
};
pub use document::{Document, DocumentModel, ExternalGroup};
pub use instancing::instance_groups;
pub use linking::{LinkReport, link_in_asset};
pub use paths::{PathBase, PathResolver};
pub use reconciler::{ReconcileReport, ReconcileState, Reconciliation, reconcile_file};
pub use remapper::{RemapOutcome, reconcile_object};
pub use scene::{Container, Scene, SceneObject, SerializableScene};
pub use session::{LibraryStatus, LibrarySession};
pub use source::{FsSourceReader, MemorySourceReader, SourceFile, SourceObject, SourceReader};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    catalog_from_json, catalog_to_json, load_library, load_scene, save_library, save_scene,
    scene_from_json, scene_to_json,
};
