//! # Library Session
//!
//! Owns everything one open document needs to work with a library: the
//! catalog, the path resolver, the document itself, the catalog's load
//! status and the queue of catalog events.
//!
//! There is no ambient state. Every operation goes through a session value
//! that the host creates and passes around.
//!
//! ## Events
//!
//! Edits that need follow-up work (a component's file path changing) post a
//! [`CatalogEvent`] instead of doing the work mid-edit. `process_events`
//! drains the queue; `link_in_asset` drains it first, so a link-in never
//! sees a half-normalised catalog.

use crate::catalog::{Catalog, CatalogEvent, ComponentLocation};
use crate::document::DocumentModel;
use crate::formats::{load_library, save_library};
use crate::linking::{LinkReport, link_in_asset};
use crate::paths::{PathBase, PathResolver};
use crate::{CatalogError, PowerlibError, ReadFailure, WriteFailure};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

/// Outcome of the last catalog load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryStatus {
    /// The catalog file was read and holds at least one collection.
    Loaded,
    /// The catalog could not be loaded; the in-memory catalog is empty.
    Failed(ReadFailure),
}

impl LibraryStatus {
    /// Whether the catalog was loaded successfully.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }

    /// Short state name for display.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded => "Loaded",
            Self::Failed(ReadFailure::NoFile) => "NoFile",
            Self::Failed(ReadFailure::PathInvalid) => "PathInvalid",
            Self::Failed(ReadFailure::ContentInvalid) => "ContentInvalid",
            Self::Failed(ReadFailure::Empty) => "Empty",
        }
    }

    /// Whether saving over the library file could lose data that was never
    /// loaded.
    #[must_use]
    pub fn is_unsafe_to_save(&self) -> bool {
        matches!(self, Self::Failed(ReadFailure::ContentInvalid))
    }
}

/// A library attached to one open document.
#[derive(Debug)]
pub struct LibrarySession<D> {
    catalog: Catalog,
    resolver: PathResolver,
    document: D,
    status: LibraryStatus,
    events: VecDeque<CatalogEvent>,
    group_cache: BTreeMap<PathBuf, Vec<String>>,
}

impl<D: DocumentModel> LibrarySession<D> {
    /// Open a session and load the catalog the resolver points at.
    pub fn open(resolver: PathResolver, document: D) -> Self {
        let mut session = Self {
            catalog: Catalog::new(),
            resolver,
            document,
            status: LibraryStatus::Failed(ReadFailure::NoFile),
            events: VecDeque::new(),
            group_cache: BTreeMap::new(),
        };
        session.reload();
        session
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Mutable access for catalog CRUD.
    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// The path resolver.
    #[must_use]
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// The open document.
    #[must_use]
    pub fn document(&self) -> &D {
        &self.document
    }

    /// Mutable access to the open document.
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Close the session, keeping the document.
    #[must_use]
    pub fn into_document(self) -> D {
        self.document
    }

    /// Outcome of the last load.
    #[must_use]
    pub fn status(&self) -> &LibraryStatus {
        &self.status
    }

    // =========================================================================
    // LOAD / SAVE
    // =========================================================================

    /// Re-read the catalog file. Failures become the session status.
    pub fn reload(&mut self) -> &LibraryStatus {
        match load_library(self.resolver.library_file()) {
            Ok(catalog) => {
                self.catalog = catalog;
                self.status = LibraryStatus::Loaded;
            }
            Err(failure) => {
                if failure != ReadFailure::Empty {
                    tracing::warn!(error = %failure, "Library not loaded");
                }
                self.catalog = Catalog::new();
                self.status = LibraryStatus::Failed(failure);
            }
        }
        self.events.clear();
        self.group_cache.clear();
        &self.status
    }

    /// Write the catalog to the configured library file.
    pub fn save(&self) -> Result<(), WriteFailure> {
        let path = self
            .resolver
            .library_file()
            .ok_or_else(|| WriteFailure::PathInvalid("no library file configured".to_string()))?;
        save_library(&self.catalog, path)
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Store a component's file path as entered and queue its normalisation.
    pub fn set_component_filepath(
        &mut self,
        location: &ComponentLocation,
        filepath: &str,
    ) -> Result<(), CatalogError> {
        let event = self.catalog.set_component_filepath(location, filepath)?;
        self.events.push_back(event);
        Ok(())
    }

    /// Queue an event for the next `process_events`.
    pub fn post_event(&mut self, event: CatalogEvent) {
        self.events.push_back(event);
    }

    /// Number of events waiting.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Handle every queued event.
    ///
    /// A failing event is logged and dropped; the rest still run. Returns the
    /// number handled, or the first failure once the queue is empty.
    pub fn process_events(&mut self) -> Result<usize, PowerlibError> {
        let mut handled = 0;
        let mut first_error = None;
        while let Some(event) = self.events.pop_front() {
            match self.handle_event(&event) {
                Ok(()) => handled += 1,
                Err(e) => {
                    tracing::warn!(event = ?event, error = %e, "Catalog event failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(handled),
        }
    }

    fn handle_event(&mut self, event: &CatalogEvent) -> Result<(), PowerlibError> {
        match event {
            CatalogEvent::ComponentFileChanged(location) => {
                let raw = self.catalog.component(location)?.filepath.clone();
                let relative = self.resolver.to_library_relative(&raw)?;
                if relative != raw {
                    tracing::debug!(from = %raw, to = %relative, "Normalised component path");
                    // The returned event would only re-normalise an already relative path
                    let _ = self.catalog.set_component_filepath(location, &relative)?;
                }
                let absolute = self.resolver.to_absolute(&relative, PathBase::Library)?;
                self.refresh_groups(&absolute);
                Ok(())
            }
        }
    }

    fn refresh_groups(&mut self, absolute: &Path) {
        match self.document.group_names_in_file(absolute) {
            Ok(names) => {
                self.group_cache.insert(absolute.to_path_buf(), names);
            }
            Err(e) => {
                tracing::debug!(file = %absolute.display(), error = %e, "No groups available");
                self.group_cache.remove(absolute);
            }
        }
    }

    /// Group names last discovered in a source file, for pickers.
    #[must_use]
    pub fn cached_groups(&self, absolute: &Path) -> Option<&[String]> {
        self.group_cache.get(absolute).map(Vec::as_slice)
    }

    // =========================================================================
    // LINK-IN
    // =========================================================================

    /// Link an asset of the catalog into the document.
    pub fn link_in_asset(
        &mut self,
        collection: &str,
        asset: &str,
    ) -> Result<LinkReport, PowerlibError> {
        self.process_events()?;
        let asset = self.catalog.asset(collection, asset)?;
        Ok(link_in_asset(asset, &self.resolver, &mut self.document)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentType;
    use crate::catalog::Component;
    use crate::document::Document;
    use crate::source::{MemorySourceReader, SourceFile, SourceObject};

    fn session_in(dir: &Path, json: Option<&str>) -> LibrarySession<Document<MemorySourceReader>> {
        let library = dir.join("library.json");
        if let Some(json) = json {
            std::fs::write(&library, json).expect("write");
        }
        let mut reader = MemorySourceReader::new();
        reader.insert(
            dir.join("characters/boris.ext"),
            SourceFile::new()
                .with_object("Arm", SourceObject::new("a"))
                .with_group("Boris_rig", ["Arm"]),
        );
        LibrarySession::open(
            PathResolver::new(Some(library), Some(dir.join("shots/shot.json"))),
            Document::new(reader),
        )
    }

    #[test]
    fn open_reports_load_failures_as_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session_in(dir.path(), None);
        assert_eq!(
            session.status(),
            &LibraryStatus::Failed(ReadFailure::PathInvalid)
        );
        assert!(session.catalog().is_empty());

        let session = session_in(dir.path(), Some("{not json"));
        assert_eq!(session.status().label(), "ContentInvalid");
        assert!(session.status().is_unsafe_to_save());
    }

    #[test]
    fn file_change_event_normalises_and_caches_groups() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_in(dir.path(), Some(r#"{"Characters":{"Boris":{}}}"#));
        session
            .catalog_mut()
            .add_component(
                "Characters",
                "Boris",
                ComponentType::GroupReferenceObjects,
                Component::new("", "Boris_rig"),
            )
            .expect("add");
        let location = ComponentLocation {
            collection: "Characters".into(),
            asset: "Boris".into(),
            component_type: ComponentType::GroupReferenceObjects,
            index: 0,
        };
        let absolute = dir.path().join("characters/boris.ext");

        session
            .set_component_filepath(&location, &absolute.to_string_lossy())
            .expect("set");
        assert_eq!(session.pending_events(), 1);
        assert_eq!(session.process_events().expect("process"), 1);

        let component = session.catalog().component(&location).expect("component");
        assert_eq!(component.filepath, "characters/boris.ext");
        assert_eq!(
            session.cached_groups(&absolute),
            Some(&["Boris_rig".to_string()][..])
        );
    }

    #[test]
    fn posted_events_run_past_a_failing_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = r#"{"Characters":{"Boris":{"group_reference_objects":[["characters/boris.ext","Boris_rig"]]}}}"#;
        let mut session = session_in(dir.path(), Some(json));
        let location = |index| ComponentLocation {
            collection: "Characters".into(),
            asset: "Boris".into(),
            component_type: ComponentType::GroupReferenceObjects,
            index,
        };

        session.post_event(CatalogEvent::ComponentFileChanged(location(3)));
        session.post_event(CatalogEvent::ComponentFileChanged(location(0)));
        assert_eq!(session.pending_events(), 2);

        let err = session.process_events().expect_err("missing component");
        assert!(matches!(
            err,
            PowerlibError::Catalog(CatalogError::ComponentNotFound { index: 3, .. })
        ));
        assert_eq!(session.pending_events(), 0);
        assert_eq!(
            session.cached_groups(&dir.path().join("characters/boris.ext")),
            Some(&["Boris_rig".to_string()][..])
        );
        assert_eq!(session.process_events().expect("empty queue"), 0);
    }

    #[test]
    fn link_in_asset_goes_through_the_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json = r#"{"Characters":{"Boris":{"group_reference_objects":[["characters/boris.ext","Boris_rig"]]}}}"#;
        let mut session = session_in(dir.path(), Some(json));
        assert!(session.status().is_loaded());

        let report = session.link_in_asset("Characters", "Boris").expect("link");

        assert_eq!(report.objects_added, 1);
        assert!(
            session
                .document()
                .find_container_by_name("__REFBoris_rig")
                .is_some()
        );
        assert!(matches!(
            session.link_in_asset("Characters", "Nobody"),
            Err(PowerlibError::Catalog(CatalogError::AssetNotFound { .. }))
        ));
    }

    #[test]
    fn save_writes_to_configured_library() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_in(dir.path(), None);
        session.catalog_mut().add_collection("Props").expect("add");
        session.save().expect("save");
        assert_eq!(session.reload(), &LibraryStatus::Loaded);
        assert!(session.catalog().collection("Props").is_some());
    }
}
