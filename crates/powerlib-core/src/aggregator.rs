//! # Request Aggregator
//!
//! Buckets an asset's components by type and resolved source file so that
//! each file is opened once per link-in, with every group it contributes.

use crate::catalog::Asset;
use crate::paths::PathResolver;
use crate::{ComponentType, PathError};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Group ids to load, per absolute source file.
pub type FileRequests = BTreeMap<PathBuf, Vec<String>>;

/// `{component type -> {absolute file -> [group ids]}}`.
pub type LinkRequests = BTreeMap<ComponentType, FileRequests>;

/// Build the load requests for one asset.
///
/// Group ids keep catalog order within a file; a group listed twice for the
/// same file is requested once. Empty component groups contribute nothing.
pub fn aggregate_requests(
    asset: &Asset,
    resolver: &PathResolver,
) -> Result<LinkRequests, PathError> {
    let mut requests = LinkRequests::new();
    for (ty, group) in asset.groups() {
        for component in group.components() {
            let path = component.absolute_filepath(resolver)?;
            let ids = requests.entry(ty).or_default().entry(path).or_default();
            if !ids.contains(&component.id) {
                ids.push(component.id.clone());
            }
        }
    }
    Ok(requests)
}
