//! # Catalog Store
//!
//! Maps a [`Catalog`] to and from its JSON file:
//!
//! ```json
//! {
//!     "Characters": {
//!         "Boris": {
//!             "group_reference_objects": [
//!                 ["characters/boris.ext", "Boris_rig"]
//!             ]
//!         }
//!     }
//! }
//! ```
//!
//! Loading accepts any key order and any subset of component keys. Saving
//! always emits collections, assets and component keys sorted by name with
//! 4-space indentation and no trailing newline, so saving the same catalog
//! twice produces identical bytes. Non-ASCII characters are written as
//! lowercase `\uXXXX` escapes (UTF-16 surrogate pairs above the BMP), so the
//! file itself is always plain ASCII.

use super::{containing_dir, write_atomically};
use crate::catalog::{Asset, Catalog, Collection, Component};
use crate::primitives::{LIBRARY_JSON_INDENT, MAX_LIBRARY_FILE_SIZE};
use crate::{ComponentType, ReadFailure, WriteFailure};
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// `{collection -> {asset -> {component key -> [[filepath, id], ...]}}}`
type RawCatalog = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<(String, String)>>>>;

// =============================================================================
// LOAD
// =============================================================================

/// Parse catalog JSON.
///
/// Non-JSON input, a non-object top level, a wrongly shaped entry or an
/// unknown component key is `ContentInvalid`. An empty top-level object is
/// `Empty`.
pub fn catalog_from_json(bytes: &[u8]) -> Result<Catalog, ReadFailure> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|_| ReadFailure::ContentInvalid)?;
    match value.as_object() {
        None => return Err(ReadFailure::ContentInvalid),
        Some(top) if top.is_empty() => return Err(ReadFailure::Empty),
        Some(_) => {}
    }
    let raw: RawCatalog =
        serde_json::from_value(value).map_err(|_| ReadFailure::ContentInvalid)?;

    let mut catalog = Catalog::new();
    for (collection_name, assets) in raw {
        let mut collection = Collection::new(collection_name);
        for (asset_name, groups) in assets {
            let mut asset = Asset::new(asset_name);
            for (key, components) in groups {
                let Some(ty) = ComponentType::from_key(&key) else {
                    tracing::warn!(key = %key, "Unknown component type in library file");
                    return Err(ReadFailure::ContentInvalid);
                };
                let group = asset.ensure_group(ty);
                for (filepath, id) in components {
                    group.push(Component::new(filepath, id));
                }
            }
            collection.insert_asset(asset);
        }
        catalog.insert_collection(collection);
    }
    Ok(catalog)
}

/// Load the catalog file at `path`.
///
/// `None` or an empty path is `NoFile`; a path that is not a readable file
/// is `PathInvalid`.
pub fn load_library(path: Option<&Path>) -> Result<Catalog, ReadFailure> {
    let path = path
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ReadFailure::NoFile)?;
    let metadata = std::fs::metadata(path).map_err(|_| ReadFailure::PathInvalid)?;
    if !metadata.is_file() {
        return Err(ReadFailure::PathInvalid);
    }
    if metadata.len() > MAX_LIBRARY_FILE_SIZE {
        tracing::warn!(
            path = %path.display(),
            size = metadata.len(),
            max = MAX_LIBRARY_FILE_SIZE,
            "Library file too large"
        );
        return Err(ReadFailure::ContentInvalid);
    }
    let bytes = std::fs::read(path).map_err(|_| ReadFailure::PathInvalid)?;
    let catalog = catalog_from_json(&bytes)?;
    tracing::info!(
        path = %path.display(),
        collections = catalog.collection_count(),
        assets = catalog.asset_count(),
        "Library loaded"
    );
    Ok(catalog)
}

// =============================================================================
// SAVE
// =============================================================================

#[derive(Serialize)]
struct RawComponent<'a>(&'a str, &'a str);

/// Serialize a catalog to canonical JSON bytes.
pub fn catalog_to_json(catalog: &Catalog) -> Result<Vec<u8>, WriteFailure> {
    let mut raw: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, Vec<RawComponent<'_>>>>> =
        BTreeMap::new();
    for collection in catalog.collections() {
        let assets = raw.entry(collection.name()).or_default();
        for asset in collection.assets() {
            let groups = assets.entry(asset.name()).or_default();
            for (ty, group) in asset.groups() {
                groups.insert(
                    ty.key(),
                    group
                        .components()
                        .iter()
                        .map(|c| RawComponent(&c.filepath, &c.id))
                        .collect(),
                );
            }
        }
    }

    let mut out = Vec::new();
    let formatter = AsciiFormatter(PrettyFormatter::with_indent(LIBRARY_JSON_INDENT));
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    raw.serialize(&mut serializer)
        .map_err(|e| WriteFailure::IoError(e.to_string()))?;
    Ok(out)
}

/// Pretty printing with every non-ASCII character escaped.
struct AsciiFormatter<'a>(PrettyFormatter<'a>);

impl Formatter for AsciiFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut bytes = [0u8; 4];
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(ch.encode_utf8(&mut bytes).as_bytes())?;
                continue;
            }
            for unit in &*ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
        }
        Ok(())
    }
}

/// Save a catalog to `path`, replacing the file atomically.
pub fn save_library(catalog: &Catalog, path: &Path) -> Result<(), WriteFailure> {
    if path.as_os_str().is_empty() {
        return Err(WriteFailure::PathInvalid("empty path".to_string()));
    }
    let dir = containing_dir(path);
    if !dir.is_dir() {
        return Err(WriteFailure::PathInvalid(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }
    let bytes = catalog_to_json(catalog)?;
    write_atomically(path, &bytes).map_err(|e| WriteFailure::IoError(e.to_string()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Library saved");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const BORIS: &str = r#"{
    "Characters": {
        "Boris": {
            "group_reference_objects": [
                [
                    "characters/boris.ext",
                    "Boris_rig"
                ]
            ]
        }
    }
}"#;

    #[test]
    fn canonical_file_round_trips_byte_identical() {
        let catalog = catalog_from_json(BORIS.as_bytes()).expect("load");
        let bytes = catalog_to_json(&catalog).expect("save");
        assert_eq!(String::from_utf8(bytes).expect("utf8"), BORIS);
    }

    #[test]
    fn save_sorts_names_and_keys() {
        let json = r#"{"Z":{"b":{"instance_groups":[["z.ext","Z"]],"group_reference_objects":[]}},"A":{}}"#;
        let catalog = catalog_from_json(json.as_bytes()).expect("load");
        let out = String::from_utf8(catalog_to_json(&catalog).expect("save")).expect("utf8");
        let a = out.find("\"A\"").expect("A");
        let z = out.find("\"Z\"").expect("Z");
        let gro = out.find("group_reference_objects").expect("gro");
        let ig = out.find("instance_groups").expect("ig");
        assert!(a < z);
        assert!(gro < ig);
        assert!(out.contains("\"group_reference_objects\": []"));
    }

    #[test]
    fn non_ascii_names_are_escaped_on_save() {
        let escaped = "{\n    \"Caf\\u00e9\": {}\n}";
        let catalog = catalog_from_json(escaped.as_bytes()).expect("load");
        assert!(catalog.collection("Café").is_some());
        let bytes = catalog_to_json(&catalog).expect("save");
        assert_eq!(String::from_utf8(bytes).expect("utf8"), escaped);

        let mut catalog = Catalog::new();
        catalog.add_collection("Props 🎩").expect("add");
        let out = String::from_utf8(catalog_to_json(&catalog).expect("save")).expect("utf8");
        assert!(out.is_ascii());
        assert!(out.contains(r#""Props \ud83c\udfa9""#));
    }

    #[test]
    fn empty_object_is_empty() {
        assert_eq!(catalog_from_json(b"{}"), Err(ReadFailure::Empty));
    }

    #[test]
    fn malformed_json_is_content_invalid() {
        assert_eq!(
            catalog_from_json(b"{not json"),
            Err(ReadFailure::ContentInvalid)
        );
        assert_eq!(catalog_from_json(b"[1, 2]"), Err(ReadFailure::ContentInvalid));
        assert_eq!(
            catalog_from_json(br#"{"C":{"A":{"instance_groups":[["only-one"]]}}}"#),
            Err(ReadFailure::ContentInvalid)
        );
    }

    #[test]
    fn unknown_component_key_is_content_invalid() {
        assert_eq!(
            catalog_from_json(br#"{"C":{"A":{"scripts":[]}}}"#),
            Err(ReadFailure::ContentInvalid)
        );
    }

    #[test]
    fn load_reports_missing_and_unset_paths() {
        assert_eq!(load_library(None), Err(ReadFailure::NoFile));
        assert_eq!(load_library(Some(Path::new(""))), Err(ReadFailure::NoFile));
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            load_library(Some(&dir.path().join("missing.json"))),
            Err(ReadFailure::PathInvalid)
        );
        assert_eq!(load_library(Some(dir.path())), Err(ReadFailure::PathInvalid));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("library.json");
        let catalog = catalog_from_json(BORIS.as_bytes()).expect("parse");

        save_library(&catalog, &path).expect("save");
        let loaded = load_library(Some(&path)).expect("load");

        assert_eq!(loaded, catalog);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), BORIS);
    }

    #[test]
    fn save_into_missing_directory_is_path_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope").join("library.json");
        let err = save_library(&Catalog::new(), &path).expect_err("invalid");
        assert!(matches!(err, WriteFailure::PathInvalid(_)));
        assert!(matches!(
            save_library(&Catalog::new(), Path::new("")),
            Err(WriteFailure::PathInvalid(_))
        ));
    }
}
