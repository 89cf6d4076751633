//! # Link-In
//!
//! `link_in_asset` is the single entry point behind "import this asset":
//! aggregate the asset's components per file, then dispatch on component
//! type. Group reference objects go through the reconciler, instance groups
//! through the instancing path, legacy non-instance groups are skipped.
//!
//! Files are processed one at a time. The first failing file stops the
//! link-in; files finished before it stay committed.

use crate::aggregator::aggregate_requests;
use crate::catalog::Asset;
use crate::document::DocumentModel;
use crate::instancing::instance_groups;
use crate::paths::PathResolver;
use crate::reconciler::{ReconcileReport, Reconciliation};
use crate::{ComponentType, LinkError};
use serde::Serialize;

/// What one link-in did to the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub files: usize,
    pub containers_created: usize,
    pub objects_added: usize,
    pub objects_updated: usize,
    pub objects_unchanged: usize,
    pub objects_removed: usize,
    pub proxies_created: usize,
    pub skipped_components: usize,
}

impl LinkReport {
    fn absorb(&mut self, file: ReconcileReport) {
        self.containers_created += file.containers_created;
        self.objects_added += file.objects_added;
        self.objects_updated += file.objects_updated;
        self.objects_unchanged += file.objects_unchanged;
        self.objects_removed += file.objects_removed;
    }
}

/// Link every component of `asset` into the document.
pub fn link_in_asset<D: DocumentModel>(
    asset: &Asset,
    resolver: &PathResolver,
    doc: &mut D,
) -> Result<LinkReport, LinkError> {
    let requests = aggregate_requests(asset, resolver)?;
    let mut report = LinkReport::default();

    for (ty, files) in &requests {
        for (path, group_ids) in files {
            let result = match ty {
                ComponentType::GroupReferenceObjects => Reconciliation::new(path, group_ids.clone())
                    .run(doc)
                    .map(|file| report.absorb(file)),
                ComponentType::InstanceGroups => instance_groups(doc, path, group_ids)
                    .map(|proxies| report.proxies_created += proxies.len()),
                ComponentType::NonInstanceGroups => {
                    tracing::warn!(
                        asset = %asset.name(),
                        file = %path.display(),
                        groups = group_ids.len(),
                        "Non-instance groups are no longer linked, skipping"
                    );
                    report.skipped_components += group_ids.len();
                    continue;
                }
            };
            if let Err(e) = result {
                tracing::warn!(
                    asset = %asset.name(),
                    file = %path.display(),
                    files_committed = report.files,
                    error = %e,
                    "Link-in stopped"
                );
                return Err(e);
            }
            report.files += 1;
        }
    }

    tracing::info!(
        asset = %asset.name(),
        files = report.files,
        added = report.objects_added,
        updated = report.objects_updated,
        unchanged = report.objects_unchanged,
        removed = report.objects_removed,
        proxies = report.proxies_created,
        "Asset linked"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Component;
    use crate::document::Document;
    use crate::source::{MemorySourceReader, SourceFile, SourceObject};
    use std::path::PathBuf;

    fn resolver() -> PathResolver {
        PathResolver::new(Some(PathBuf::from("/lib/library.json")), None)
    }

    fn reader() -> MemorySourceReader {
        let mut reader = MemorySourceReader::new();
        reader.insert(
            "/lib/characters/boris.ext",
            SourceFile::new()
                .with_object("Arm", SourceObject::new("a"))
                .with_object("Body", SourceObject::new("b"))
                .with_group("Boris_rig", ["Arm", "Body"]),
        );
        reader.insert(
            "/lib/sets/street.ext",
            SourceFile::new()
                .with_object("Post", SourceObject::new("p"))
                .with_group("Lamp", ["Post"]),
        );
        reader
    }

    #[test]
    fn dispatches_by_component_type() {
        let mut asset = Asset::new("Boris");
        asset.add_component(
            ComponentType::GroupReferenceObjects,
            Component::new("characters/boris.ext", "Boris_rig"),
        );
        asset.add_component(
            ComponentType::InstanceGroups,
            Component::new("sets/street.ext", "Lamp"),
        );
        asset.add_component(
            ComponentType::NonInstanceGroups,
            Component::new("sets/street.ext", "Lamp"),
        );
        let mut doc = Document::new(reader());

        let report = link_in_asset(&asset, &resolver(), &mut doc).expect("link");

        assert_eq!(report.files, 2);
        assert_eq!(report.containers_created, 1);
        assert_eq!(report.objects_added, 2);
        assert_eq!(report.proxies_created, 1);
        assert_eq!(report.skipped_components, 1);
    }

    #[test]
    fn earlier_files_stay_committed_after_a_failure() {
        let mut asset = Asset::new("Boris");
        asset.add_component(
            ComponentType::GroupReferenceObjects,
            Component::new("characters/boris.ext", "Boris_rig"),
        );
        asset.add_component(
            ComponentType::GroupReferenceObjects,
            Component::new("props/missing.ext", "Hat"),
        );
        let mut doc = Document::new(reader());

        let err = link_in_asset(&asset, &resolver(), &mut doc).expect_err("missing file");

        assert!(matches!(err, LinkError::Load(crate::LoadError::FileMissing(_))));
        assert!(doc.find_container_by_name("__REFBoris_rig").is_some());
        assert_eq!(doc.scene().staged_groups().count(), 0);
    }

    #[test]
    fn instancing_proxy_survives_objects_of_the_same_name() {
        let mut reader = MemorySourceReader::new();
        reader.insert(
            "/lib/sets/lamp.ext",
            SourceFile::new()
                .with_object("Lamp", SourceObject::new("l"))
                .with_group("Lamp", ["Lamp"]),
        );
        let mut asset = Asset::new("Lamp");
        asset.add_component(
            ComponentType::InstanceGroups,
            Component::new("sets/lamp.ext", "Lamp"),
        );
        asset.add_component(
            ComponentType::GroupReferenceObjects,
            Component::new("sets/lamp.ext", "Lamp"),
        );
        let mut doc = Document::new(reader);

        let first = link_in_asset(&asset, &resolver(), &mut doc).expect("first");
        assert_eq!(first.proxies_created, 1);
        assert_eq!(first.objects_added, 1);
        let proxy = doc
            .scene()
            .objects()
            .find(|o| o.instance_of.is_some())
            .map(|o| o.id)
            .expect("proxy");
        let mesh = doc
            .scene()
            .objects()
            .find(|o| o.name == "Lamp" && o.instance_of.is_none())
            .map(|o| o.id)
            .expect("mesh");

        let second = link_in_asset(&asset, &resolver(), &mut doc).expect("second");

        assert_eq!(second.objects_unchanged, 1);
        assert_eq!(second.objects_removed, 0);
        assert!(doc.object(proxy).is_some_and(|o| o.instance_of.is_some()));
        assert!(doc.object(mesh).is_some());
        let container = doc.find_container_by_name("__REFLamp").expect("container");
        assert_eq!(doc.container_members(container).expect("members"), vec![mesh]);
        assert_eq!(
            doc.scene()
                .objects()
                .filter(|o| o.instance_of.is_some())
                .count(),
            2
        );
    }
}
