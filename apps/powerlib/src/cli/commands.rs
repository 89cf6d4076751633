//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Edits load the library, apply one change, process the resulting catalog
//! events and save. A library whose file could not be parsed is never saved
//! over.

use super::{AssetCommand, CollectionCommand, ComponentCommand};
use crate::config::Config;
use powerlib_core::{
    Catalog, Component, ComponentLocation, Document, DocumentModel, FsSourceReader,
    LibrarySession, PathBase, PowerlibError, ReadFailure, Scene, load_scene, save_library,
    save_scene,
};
use std::path::Path;

type Session = LibrarySession<Document<FsSourceReader>>;

// =============================================================================
// SESSION HELPERS
// =============================================================================

/// Open the configured library over the configured document.
///
/// A document path that does not exist yet opens an empty scene.
fn open_session(config: &Config) -> Result<Session, PowerlibError> {
    let scene = match &config.document {
        Some(path) if path.exists() => load_scene(path)?,
        _ => Scene::new(),
    };
    Ok(LibrarySession::open(
        config.resolver(),
        Document::with_scene(scene, FsSourceReader),
    ))
}

/// Refuse to edit a library whose file exists but could not be read.
fn ensure_editable(session: &Session) -> Result<(), PowerlibError> {
    if session.status().is_unsafe_to_save() {
        return Err(PowerlibError::Read(ReadFailure::ContentInvalid));
    }
    Ok(())
}

/// Process pending events and write the catalog back.
fn commit(session: &mut Session) -> Result<(), PowerlibError> {
    session.process_events()?;
    session.save()?;
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not configured)".to_string())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show library and document status.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), PowerlibError> {
    let session = open_session(config)?;
    let catalog = session.catalog();
    let scene = session.document().scene();

    if json_mode {
        print_json(&serde_json::json!({
            "library": config.library,
            "library_status": session.status().label(),
            "collections": catalog.collection_count(),
            "assets": catalog.asset_count(),
            "components": catalog.component_count(),
            "document": config.document,
            "objects": scene.object_count(),
            "containers": scene.container_count(),
        }));
        return Ok(());
    }

    println!("Powerlib Status");
    println!("===============");
    println!("Library:  {}", display_path(config.library.as_deref()));
    println!("State:    {}", session.status().label());
    println!("Document: {}", display_path(config.document.as_deref()));
    println!();
    println!("Collections: {}", catalog.collection_count());
    println!("Assets:      {}", catalog.asset_count());
    println!("Components:  {}", catalog.component_count());
    println!("Objects:     {}", scene.object_count());
    println!("Containers:  {}", scene.container_count());

    Ok(())
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List collections, assets and components.
pub fn cmd_list(
    config: &Config,
    json_mode: bool,
    only: Option<&str>,
) -> Result<(), PowerlibError> {
    let session = open_session(config)?;
    let catalog = session.catalog();
    if let Some(name) = only {
        if catalog.collection(name).is_none() {
            return Err(powerlib_core::CatalogError::CollectionNotFound(name.to_string()).into());
        }
    }
    let collections = catalog
        .collections()
        .filter(|c| only.is_none_or(|name| c.name() == name));

    if json_mode {
        let mut out = serde_json::Map::new();
        for collection in collections {
            let mut assets = serde_json::Map::new();
            for asset in collection.assets() {
                let mut groups = serde_json::Map::new();
                for (ty, group) in asset.groups() {
                    let components: Vec<_> = group
                        .components()
                        .iter()
                        .map(|c| serde_json::json!([c.filepath, c.id]))
                        .collect();
                    groups.insert(ty.key().to_string(), components.into());
                }
                assets.insert(asset.name().to_string(), groups.into());
            }
            out.insert(collection.name().to_string(), assets.into());
        }
        print_json(&out.into());
        return Ok(());
    }

    for collection in collections {
        println!("{}", collection.name());
        for asset in collection.assets() {
            println!("  {}", asset.name());
            for (ty, group) in asset.groups() {
                for (index, c) in group.components().iter().enumerate() {
                    println!("    [{}:{}] {} :: {}", ty.key(), index, c.filepath, c.id);
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// EDIT COMMANDS
// =============================================================================

/// Add, rename or remove a collection.
pub fn cmd_collection(
    config: &Config,
    json_mode: bool,
    command: CollectionCommand,
) -> Result<(), PowerlibError> {
    let mut session = open_session(config)?;
    ensure_editable(&session)?;
    let message = match command {
        CollectionCommand::Add { name } => {
            session.catalog_mut().add_collection(&name)?;
            format!("Added collection '{name}'")
        }
        CollectionCommand::Rename { old, new } => {
            session.catalog_mut().rename_collection(&old, &new)?;
            format!("Renamed collection '{old}' to '{new}'")
        }
        CollectionCommand::Remove { name } => {
            let removed = session.catalog_mut().remove_collection(&name)?;
            format!("Removed collection '{name}' ({} assets)", removed.len())
        }
    };
    commit(&mut session)?;
    report(json_mode, &message);
    Ok(())
}

/// Add, rename or remove an asset.
pub fn cmd_asset(
    config: &Config,
    json_mode: bool,
    command: AssetCommand,
) -> Result<(), PowerlibError> {
    let mut session = open_session(config)?;
    ensure_editable(&session)?;
    let message = match command {
        AssetCommand::Add { collection, name } => {
            let added = session
                .catalog_mut()
                .add_asset(&collection, name.as_deref())?;
            format!("Added asset '{added}' to '{collection}'")
        }
        AssetCommand::Rename {
            collection,
            old,
            new,
        } => {
            session.catalog_mut().rename_asset(&collection, &old, &new)?;
            format!("Renamed asset '{old}' to '{new}' in '{collection}'")
        }
        AssetCommand::Remove { collection, name } => {
            session.catalog_mut().remove_asset(&collection, &name)?;
            format!("Removed asset '{name}' from '{collection}'")
        }
    };
    commit(&mut session)?;
    report(json_mode, &message);
    Ok(())
}

/// Add, remove or repoint a component.
///
/// File paths go through the file-changed event, so they are stored
/// library-relative whatever form they were given in.
pub fn cmd_component(
    config: &Config,
    json_mode: bool,
    command: ComponentCommand,
) -> Result<(), PowerlibError> {
    let mut session = open_session(config)?;
    ensure_editable(&session)?;
    let message = match command {
        ComponentCommand::Add {
            collection,
            asset,
            component_type,
            filepath,
            id,
        } => {
            let index = session
                .catalog()
                .asset(&collection, &asset)?
                .components(component_type)
                .len();
            session.catalog_mut().add_component(
                &collection,
                &asset,
                component_type,
                Component::new("", id.as_str()),
            )?;
            let location = ComponentLocation {
                collection,
                asset,
                component_type,
                index,
            };
            session.set_component_filepath(&location, &filepath)?;
            format!("Added {component_type} component '{id}' at index {index}")
        }
        ComponentCommand::Remove {
            collection,
            asset,
            component_type,
            index,
        } => {
            let removed =
                session
                    .catalog_mut()
                    .remove_component(&collection, &asset, component_type, index)?;
            format!("Removed {component_type} component '{}'", removed.id)
        }
        ComponentCommand::SetFile {
            collection,
            asset,
            component_type,
            index,
            filepath,
        } => {
            let location = ComponentLocation {
                collection,
                asset,
                component_type,
                index,
            };
            session.set_component_filepath(&location, &filepath)?;
            format!("Updated {component_type} component {index}")
        }
    };
    commit(&mut session)?;
    report(json_mode, &message);
    Ok(())
}

fn report(json_mode: bool, message: &str) {
    if json_mode {
        print_json(&serde_json::json!({ "ok": true, "message": message }));
    } else {
        println!("{message}");
    }
}

// =============================================================================
// GROUPS COMMAND
// =============================================================================

/// List the groups in a source file.
pub fn cmd_groups(config: &Config, json_mode: bool, file: &str) -> Result<(), PowerlibError> {
    let session = open_session(config)?;
    let path = session.resolver().to_absolute(file, PathBase::Library)?;
    let groups = session.document().group_names_in_file(&path)?;

    if json_mode {
        print_json(&serde_json::json!({
            "file": path,
            "groups": groups,
        }));
        return Ok(());
    }

    println!("{}", path.display());
    for group in groups {
        println!("  {group}");
    }
    Ok(())
}

// =============================================================================
// LINK COMMAND
// =============================================================================

/// Link an asset into the scene document and save the document.
pub fn cmd_link(
    config: &Config,
    json_mode: bool,
    collection: &str,
    asset: &str,
) -> Result<(), PowerlibError> {
    let document_path = config
        .document
        .clone()
        .ok_or_else(|| PowerlibError::Config("no scene document configured".to_string()))?;
    let mut session = open_session(config)?;
    if let powerlib_core::LibraryStatus::Failed(failure) = session.status() {
        if *failure != ReadFailure::Empty {
            return Err(PowerlibError::Read(failure.clone()));
        }
    }

    let result = session.link_in_asset(collection, asset);
    // Files reconciled before a failure stay committed, so save either way
    save_scene(session.document().scene(), &document_path)?;
    let report = result?;

    if json_mode {
        print_json(&serde_json::json!({
            "collection": collection,
            "asset": asset,
            "report": report,
        }));
        return Ok(());
    }

    println!("Linked {collection}/{asset}");
    println!("  Files:              {}", report.files);
    println!("  Containers created: {}", report.containers_created);
    println!("  Objects added:      {}", report.objects_added);
    println!("  Objects updated:    {}", report.objects_updated);
    println!("  Objects unchanged:  {}", report.objects_unchanged);
    println!("  Objects removed:    {}", report.objects_removed);
    println!("  Proxies created:    {}", report.proxies_created);
    if report.skipped_components > 0 {
        println!("  Skipped (legacy):   {}", report.skipped_components);
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write an empty library file.
pub fn cmd_init(config: &Config, json_mode: bool, force: bool) -> Result<(), PowerlibError> {
    let path = config
        .library
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(PowerlibError::Read(ReadFailure::NoFile))?;
    if path.exists() && !force {
        return Err(PowerlibError::Config(format!(
            "library already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }
    save_library(&Catalog::new(), path)?;
    report(
        json_mode,
        &format!("Initialized empty library at {}", path.display()),
    );
    Ok(())
}
