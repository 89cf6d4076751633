//! # Instance Groups
//!
//! Instance-group components are not unpacked. Each requested group gets one
//! proxy object that instances the group as a whole and is linked into the
//! scene. Proxies are never deduplicated: linking the same asset twice
//! leaves two proxies.

use crate::document::DocumentModel;
use crate::{GroupKey, LinkError, LoadError, ObjectId};
use std::path::Path;

/// Create one instancing proxy per named group of an absolute file.
///
/// Every name is checked against the file first; a missing file or group
/// fails before any proxy is created.
pub fn instance_groups<D: DocumentModel>(
    doc: &mut D,
    path: &Path,
    group_names: &[String],
) -> Result<Vec<ObjectId>, LinkError> {
    let available = doc.group_names_in_file(path)?;
    if let Some(missing) = group_names.iter().find(|n| !available.contains(*n)) {
        return Err(LoadError::GroupMissing {
            file: path.to_path_buf(),
            group: missing.clone(),
        }
        .into());
    }

    let proxies: Vec<ObjectId> = group_names
        .iter()
        .map(|name| doc.create_instance_proxy(&GroupKey::new(path, name.as_str())))
        .collect();
    tracing::info!(
        file = %path.display(),
        proxies = proxies.len(),
        "Created instance proxies"
    );
    Ok(proxies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::source::{MemorySourceReader, SourceFile, SourceObject};

    const FILE: &str = "/lib/sets/street.ext";

    fn doc() -> Document<MemorySourceReader> {
        let mut reader = MemorySourceReader::new();
        reader.insert(
            FILE,
            SourceFile::new()
                .with_object("Post", SourceObject::new("m_post"))
                .with_group("Lamp", ["Post"]),
        );
        Document::new(reader)
    }

    #[test]
    fn each_call_creates_a_new_proxy() {
        let mut doc = doc();
        let first = instance_groups(&mut doc, Path::new(FILE), &["Lamp".into()]).expect("first");
        let second = instance_groups(&mut doc, Path::new(FILE), &["Lamp".into()]).expect("second");

        assert_ne!(first, second);
        let names: Vec<String> = doc.scene().objects().map(|o| o.name.clone()).collect();
        assert_eq!(names, vec!["Lamp", "Lamp.001"]);
        let proxy = doc.object(first[0]).expect("proxy");
        assert_eq!(proxy.instance_of, Some(GroupKey::new(FILE, "Lamp")));
        assert!(doc.scene().is_in_scene(first[0]));
        assert_eq!(doc.scene().container_count(), 0);
    }

    #[test]
    fn missing_group_creates_nothing() {
        let mut doc = doc();
        let err = instance_groups(&mut doc, Path::new(FILE), &["Lamp".into(), "Bench".into()])
            .expect_err("missing");
        assert!(matches!(
            err,
            LinkError::Load(LoadError::GroupMissing { ref group, .. }) if group == "Bench"
        ));
        assert_eq!(doc.scene().object_count(), 0);
    }
}
