//! # Primitives
//!
//! Fixed naming rules and limits shared by the catalog and the linker.
//!
//! These are compiled in and immutable at runtime. Changing any naming
//! constant changes how existing documents are recognised, so treat them as
//! part of the document format.

/// Prefix of the persistent container that holds one external group's
/// current members: `"__REF" + group_name`.
pub const REFERENCE_CONTAINER_PREFIX: &str = "__REF";

/// Prefix given to a local object while it is being retired by a remap.
///
/// The renamed object is deleted within the same remap, so the prefix is only
/// ever observable to code running mid-reconciliation.
pub const RETIRED_PREFIX: &str = "(RETIRED LOCAL) ";

/// Prefix the host uses for document-relative paths.
pub const DOCUMENT_RELATIVE_PREFIX: &str = "//";

/// Name given to a new asset when the caller does not supply one.
pub const DEFAULT_ASSET_NAME: &str = "NewAsset";

/// Maximum size of an external source file (64 MB).
pub const MAX_SOURCE_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum size of a catalog file (16 MB).
pub const MAX_LIBRARY_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Indentation used when writing catalog JSON.
pub const LIBRARY_JSON_INDENT: &[u8] = b"    ";

/// Format tag written at the top of a scene document file.
pub const SCENE_FORMAT: &str = "powerlib-scene";

/// Scene document format version.
pub const SCENE_FORMAT_VERSION: u8 = 1;

/// Maximum size of a scene document file (256 MB).
pub const MAX_SCENE_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Name of the reference container for an external group.
#[must_use]
pub fn reference_container_name(group_name: &str) -> String {
    format!("{REFERENCE_CONTAINER_PREFIX}{group_name}")
}

/// Name a local object carries while it is being retired.
#[must_use]
pub fn retired_name(name: &str) -> String {
    format!("{RETIRED_PREFIX}{name}")
}

/// Pick a name that does not collide with any of `existing`.
///
/// Returns `base` when it is free. Otherwise returns `base.NNN` with the
/// smallest index `>= 1` not already taken, zero padded to three digits.
/// Gaps left by deleted entries are reused.
#[must_use]
pub fn unique_name<'a>(base: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let mut base_taken = false;
    let mut indices = Vec::new();
    let dotted = format!("{base}.");

    for name in existing {
        if name == base {
            base_taken = true;
        } else if let Some(suffix) = name.strip_prefix(&dotted) {
            if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(index) = suffix.parse::<u64>() {
                    indices.push(index);
                }
            }
        }
    }

    if !base_taken {
        return base.to_string();
    }

    indices.sort_unstable();
    indices.dedup();

    let mut candidate = 1u64;
    for index in indices {
        if index > candidate {
            break;
        }
        if index == candidate {
            candidate = candidate.saturating_add(1);
        }
    }

    format!("{base}.{candidate:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_container_name_is_prefixed() {
        assert_eq!(reference_container_name("Boris_rig"), "__REFBoris_rig");
    }

    #[test]
    fn unique_name_prefers_base() {
        assert_eq!(unique_name("NewAsset", ["Other"]), "NewAsset");
    }

    #[test]
    fn unique_name_fills_first_gap() {
        let existing = ["NewAsset", "NewAsset.001", "NewAsset.003"];
        assert_eq!(unique_name("NewAsset", existing), "NewAsset.002");
    }

    #[test]
    fn unique_name_appends_after_run() {
        let existing = ["NewAsset", "NewAsset.002", "NewAsset.001"];
        assert_eq!(unique_name("NewAsset", existing), "NewAsset.003");
    }

    #[test]
    fn unique_name_ignores_non_numeric_suffixes() {
        let existing = ["NewAsset", "NewAsset.old", "NewAsset."];
        assert_eq!(unique_name("NewAsset", existing), "NewAsset.001");
    }
}
