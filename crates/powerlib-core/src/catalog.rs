//! # Catalog Model
//!
//! The in-memory asset catalog: `Catalog` → `Collection` → `Asset` →
//! `ComponentGroup` (one per `ComponentType`) → `Component`.
//!
//! Collections and assets are keyed by name in `BTreeMap`s, so iteration
//! order is always sorted and names are unique within their parent by
//! construction. Active-selection state is transient: it is ignored by
//! equality and never reaches the catalog file.

use crate::paths::{PathBase, PathResolver};
use crate::primitives::{DEFAULT_ASSET_NAME, unique_name};
use crate::source::SourceReader;
use crate::{CatalogError, ComponentType, LinkError, PathError};
use std::collections::BTreeMap;
use std::path::PathBuf;

// =============================================================================
// COMPONENT
// =============================================================================

/// A single pointer to a group in an external file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Component {
    /// Name of the group in the external file.
    pub id: String,
    /// Path of the external file, relative to the library root.
    pub filepath: String,
}

impl Component {
    /// Create a new component.
    #[must_use]
    pub fn new(filepath: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filepath: filepath.into(),
        }
    }

    /// Absolute path of the referenced file.
    pub fn absolute_filepath(&self, resolver: &PathResolver) -> Result<PathBuf, PathError> {
        resolver.to_absolute(&self.filepath, PathBase::Library)
    }

    /// Path of the referenced file relative to the open document (`//...`).
    pub fn filepath_rel_to_document(&self, resolver: &PathResolver) -> Result<String, PathError> {
        let absolute = self.absolute_filepath(resolver)?;
        resolver.to_document_relative(&absolute.to_string_lossy())
    }

    /// Group names available in the referenced file, for pickers.
    pub fn available_groups<R: SourceReader>(
        &self,
        resolver: &PathResolver,
        reader: &R,
    ) -> Result<Vec<String>, LinkError> {
        let absolute = self.absolute_filepath(resolver)?;
        let source = reader.read_source(&absolute)?;
        Ok(source.group_names())
    }
}

// =============================================================================
// COMPONENT GROUP
// =============================================================================

/// The ordered components of one type within an asset.
#[derive(Debug, Clone, Default)]
pub struct ComponentGroup {
    components: Vec<Component>,
    active_index: usize,
}

impl PartialEq for ComponentGroup {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for ComponentGroup {}

impl ComponentGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The components in insertion order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the group has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Append a component and make it the active one.
    pub fn push(&mut self, component: Component) {
        self.components.push(component);
        self.active_index = self.components.len() - 1;
    }

    /// Remove the component at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Component> {
        if index >= self.components.len() {
            return None;
        }
        let removed = self.components.remove(index);
        self.active_index = self.active_index.min(self.components.len().saturating_sub(1));
        Some(removed)
    }

    /// Mutable access to the component at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.components.get_mut(index)
    }

    /// Index of the selected component in the UI list.
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Select a component, clamped to the list bounds.
    pub fn set_active_index(&mut self, index: usize) {
        self.active_index = index.min(self.components.len().saturating_sub(1));
    }
}

// =============================================================================
// ASSET
// =============================================================================

/// A named asset: its components bucketed by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    name: String,
    groups: BTreeMap<ComponentType, ComponentGroup>,
}

impl Asset {
    /// Create an asset with no components.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: BTreeMap::new(),
        }
    }

    /// The asset's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The component group of one type, if the asset has one.
    #[must_use]
    pub fn group(&self, ty: ComponentType) -> Option<&ComponentGroup> {
        self.groups.get(&ty)
    }

    /// All component groups in type order.
    pub fn groups(&self) -> impl Iterator<Item = (ComponentType, &ComponentGroup)> {
        self.groups.iter().map(|(ty, group)| (*ty, group))
    }

    /// Components of one type (empty when the asset has none).
    #[must_use]
    pub fn components(&self, ty: ComponentType) -> &[Component] {
        self.groups
            .get(&ty)
            .map(ComponentGroup::components)
            .unwrap_or(&[])
    }

    /// Total number of components across all types.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.groups.values().map(ComponentGroup::len).sum()
    }

    /// Ensure a (possibly empty) group of this type exists.
    pub fn ensure_group(&mut self, ty: ComponentType) -> &mut ComponentGroup {
        self.groups.entry(ty).or_default()
    }

    /// Append a component to the group of its type.
    pub fn add_component(&mut self, ty: ComponentType, component: Component) {
        self.ensure_group(ty).push(component);
    }

    /// Remove a component. The group itself stays, even when emptied.
    pub fn remove_component(
        &mut self,
        ty: ComponentType,
        index: usize,
    ) -> Result<Component, CatalogError> {
        self.groups
            .get_mut(&ty)
            .and_then(|group| group.remove(index))
            .ok_or_else(|| CatalogError::ComponentNotFound {
                asset: self.name.clone(),
                component_type: ty,
                index,
            })
    }
}

// =============================================================================
// COLLECTION
// =============================================================================

/// A named set of assets.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    assets: BTreeMap<String, Asset>,
    active_asset: Option<String>,
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.assets == other.assets
    }
}

impl Eq for Collection {}

impl Collection {
    /// Create an empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assets: BTreeMap::new(),
            active_asset: None,
        }
    }

    /// The collection's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assets in name order.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Look an asset up by name.
    #[must_use]
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.get(name)
    }

    /// Number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the collection has no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Name of the selected asset in the UI list.
    #[must_use]
    pub fn active_asset(&self) -> Option<&str> {
        self.active_asset.as_deref()
    }

    /// Insert an asset, replacing any asset of the same name.
    pub(crate) fn insert_asset(&mut self, asset: Asset) {
        self.assets.insert(asset.name.clone(), asset);
    }

    fn asset_mut(&mut self, name: &str) -> Result<&mut Asset, CatalogError> {
        let collection = self.name.clone();
        self.assets
            .get_mut(name)
            .ok_or_else(|| CatalogError::AssetNotFound {
                collection,
                asset: name.to_string(),
            })
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// Where a component lives in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLocation {
    pub collection: String,
    pub asset: String,
    pub component_type: ComponentType,
    pub index: usize,
}

/// Posted after an edit completes; handled before the next edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// A component's file path was edited.
    ComponentFileChanged(ComponentLocation),
}

/// The whole asset library.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    collections: BTreeMap<String, Collection>,
    active_collection: Option<String>,
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.collections == other.collections
    }
}

impl Eq for Catalog {}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::EmptyName);
    }
    Ok(())
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collections in name order.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    /// Look a collection up by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Whether the catalog has no collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Number of collections.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Number of assets across all collections.
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.collections.values().map(Collection::len).sum()
    }

    /// Number of components across all assets.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.collections
            .values()
            .flat_map(Collection::assets)
            .map(Asset::component_count)
            .sum()
    }

    /// Name of the selected collection.
    #[must_use]
    pub fn active_collection(&self) -> Option<&str> {
        self.active_collection.as_deref()
    }

    /// Select a collection.
    pub fn set_active_collection(&mut self, name: &str) -> Result<(), CatalogError> {
        if !self.collections.contains_key(name) {
            return Err(CatalogError::CollectionNotFound(name.to_string()));
        }
        self.active_collection = Some(name.to_string());
        Ok(())
    }

    /// Look an asset up by collection and asset name.
    pub fn asset(&self, collection: &str, asset: &str) -> Result<&Asset, CatalogError> {
        self.collection_ref(collection)?
            .asset(asset)
            .ok_or_else(|| CatalogError::AssetNotFound {
                collection: collection.to_string(),
                asset: asset.to_string(),
            })
    }

    /// Look a component up by location.
    pub fn component(&self, location: &ComponentLocation) -> Result<&Component, CatalogError> {
        self.asset(&location.collection, &location.asset)?
            .components(location.component_type)
            .get(location.index)
            .ok_or_else(|| CatalogError::ComponentNotFound {
                asset: location.asset.clone(),
                component_type: location.component_type,
                index: location.index,
            })
    }

    fn collection_ref(&self, name: &str) -> Result<&Collection, CatalogError> {
        self.collections
            .get(name)
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut Collection, CatalogError> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))
    }

    pub(crate) fn insert_collection(&mut self, collection: Collection) {
        self.collections.insert(collection.name.clone(), collection);
    }

    // =========================================================================
    // COLLECTION EDITS
    // =========================================================================

    /// Add an empty collection and select it.
    pub fn add_collection(&mut self, name: &str) -> Result<(), CatalogError> {
        validate_name(name)?;
        if self.collections.contains_key(name) {
            return Err(CatalogError::DuplicateCollection(name.to_string()));
        }
        self.insert_collection(Collection::new(name));
        self.active_collection = Some(name.to_string());
        Ok(())
    }

    /// Rename a collection, keeping it selected if it was.
    pub fn rename_collection(&mut self, old: &str, new: &str) -> Result<(), CatalogError> {
        validate_name(new)?;
        if old == new {
            return self.collection_ref(old).map(|_| ());
        }
        if self.collections.contains_key(new) {
            return Err(CatalogError::DuplicateCollection(new.to_string()));
        }
        let mut collection = self
            .collections
            .remove(old)
            .ok_or_else(|| CatalogError::CollectionNotFound(old.to_string()))?;
        collection.name = new.to_string();
        self.insert_collection(collection);
        if self.active_collection.as_deref() == Some(old) {
            self.active_collection = Some(new.to_string());
        }
        Ok(())
    }

    /// Remove a collection and everything in it. If it was selected, the
    /// selection moves to the collection now at the same position, or the
    /// last one.
    pub fn remove_collection(&mut self, name: &str) -> Result<Collection, CatalogError> {
        let position = self.collections.keys().position(|k| k == name);
        let removed = self
            .collections
            .remove(name)
            .ok_or_else(|| CatalogError::CollectionNotFound(name.to_string()))?;
        if self.active_collection.as_deref() == Some(name) {
            self.active_collection = self
                .collections
                .keys()
                .nth(position.unwrap_or(0))
                .or_else(|| self.collections.keys().next_back())
                .cloned();
        }
        Ok(removed)
    }

    // =========================================================================
    // ASSET EDITS
    // =========================================================================

    /// Add an empty asset and select it. Returns the name used.
    ///
    /// Without a name, picks `NewAsset`, `NewAsset.001`, ... whichever is free.
    pub fn add_asset(
        &mut self,
        collection: &str,
        name: Option<&str>,
    ) -> Result<String, CatalogError> {
        let col = self.collection_mut(collection)?;
        let name = match name {
            Some(name) => {
                validate_name(name)?;
                if col.assets.contains_key(name) {
                    return Err(CatalogError::DuplicateAsset {
                        collection: collection.to_string(),
                        asset: name.to_string(),
                    });
                }
                name.to_string()
            }
            None => unique_name(DEFAULT_ASSET_NAME, col.assets.keys().map(String::as_str)),
        };
        col.insert_asset(Asset::new(name.clone()));
        col.active_asset = Some(name.clone());
        Ok(name)
    }

    /// Rename an asset within its collection.
    pub fn rename_asset(
        &mut self,
        collection: &str,
        old: &str,
        new: &str,
    ) -> Result<(), CatalogError> {
        validate_name(new)?;
        let col = self.collection_mut(collection)?;
        if old == new {
            return col.asset_mut(old).map(|_| ());
        }
        if col.assets.contains_key(new) {
            return Err(CatalogError::DuplicateAsset {
                collection: collection.to_string(),
                asset: new.to_string(),
            });
        }
        let mut asset = col
            .assets
            .remove(old)
            .ok_or_else(|| CatalogError::AssetNotFound {
                collection: collection.to_string(),
                asset: old.to_string(),
            })?;
        asset.name = new.to_string();
        col.insert_asset(asset);
        if col.active_asset.as_deref() == Some(old) {
            col.active_asset = Some(new.to_string());
        }
        Ok(())
    }

    /// Remove an asset. If it was selected, the selection moves to the asset
    /// now at the same position, or the last one.
    pub fn remove_asset(&mut self, collection: &str, name: &str) -> Result<Asset, CatalogError> {
        let col = self.collection_mut(collection)?;
        let position = col.assets.keys().position(|k| k == name);
        let removed = col
            .assets
            .remove(name)
            .ok_or_else(|| CatalogError::AssetNotFound {
                collection: collection.to_string(),
                asset: name.to_string(),
            })?;
        if col.active_asset.as_deref() == Some(name) {
            let position = position.unwrap_or(0);
            col.active_asset = col
                .assets
                .keys()
                .nth(position)
                .or_else(|| col.assets.keys().next_back())
                .cloned();
        }
        Ok(removed)
    }

    // =========================================================================
    // COMPONENT EDITS
    // =========================================================================

    /// Append a component to an asset.
    pub fn add_component(
        &mut self,
        collection: &str,
        asset: &str,
        ty: ComponentType,
        component: Component,
    ) -> Result<(), CatalogError> {
        self.collection_mut(collection)?
            .asset_mut(asset)?
            .add_component(ty, component);
        Ok(())
    }

    /// Remove a component from an asset.
    pub fn remove_component(
        &mut self,
        collection: &str,
        asset: &str,
        ty: ComponentType,
        index: usize,
    ) -> Result<Component, CatalogError> {
        self.collection_mut(collection)?
            .asset_mut(asset)?
            .remove_component(ty, index)
    }

    /// Store a new file path on a component exactly as entered.
    ///
    /// Returns the event the caller must queue; normalisation to a
    /// library-relative path happens when that event is processed.
    pub fn set_component_filepath(
        &mut self,
        location: &ComponentLocation,
        filepath: &str,
    ) -> Result<CatalogEvent, CatalogError> {
        let component = self
            .collection_mut(&location.collection)?
            .asset_mut(&location.asset)?
            .groups
            .get_mut(&location.component_type)
            .and_then(|group| group.get_mut(location.index))
            .ok_or_else(|| CatalogError::ComponentNotFound {
                asset: location.asset.clone(),
                component_type: location.component_type,
                index: location.index,
            })?;
        component.filepath = filepath.to_string();
        Ok(CatalogEvent::ComponentFileChanged(location.clone()))
    }

    /// Set a component's group id.
    pub fn set_component_id(
        &mut self,
        location: &ComponentLocation,
        id: &str,
    ) -> Result<(), CatalogError> {
        validate_name(id)?;
        let component = self
            .collection_mut(&location.collection)?
            .asset_mut(&location.asset)?
            .groups
            .get_mut(&location.component_type)
            .and_then(|group| group.get_mut(location.index))
            .ok_or_else(|| CatalogError::ComponentNotFound {
                asset: location.asset.clone(),
                component_type: location.component_type,
                index: location.index,
            })?;
        component.id = id.to_string();
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
