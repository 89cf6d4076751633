//! # Path Resolver
//!
//! Converts between the three path spaces the library deals in:
//! - library-relative (`characters/boris.ext`), how the catalog stores paths
//! - document-relative (`//../lib/characters/boris.ext`), the host's form
//! - absolute filesystem paths, what the source reader opens
//!
//! All conversions are lexical. Nothing here touches the filesystem, so
//! results are the same whether or not the files exist yet.

use crate::PathError;
use crate::primitives::DOCUMENT_RELATIVE_PREFIX;
use std::path::{Component as PathComponent, Path, PathBuf};

/// Which root a relative path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathBase {
    /// The directory holding the catalog file.
    Library,
    /// The directory holding the open document.
    Document,
}

/// Resolves paths against the configured library and the open document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathResolver {
    library_file: Option<PathBuf>,
    document_file: Option<PathBuf>,
}

impl PathResolver {
    /// Create a resolver. Empty paths count as "not configured".
    #[must_use]
    pub fn new(library_file: Option<PathBuf>, document_file: Option<PathBuf>) -> Self {
        let non_empty = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty());
        Self {
            library_file: non_empty(library_file),
            document_file: non_empty(document_file),
        }
    }

    /// The configured catalog file, if any.
    #[must_use]
    pub fn library_file(&self) -> Option<&Path> {
        self.library_file.as_deref()
    }

    /// The open document's file, if it has one.
    #[must_use]
    pub fn document_file(&self) -> Option<&Path> {
        self.document_file.as_deref()
    }

    /// Point the resolver at a (new) document location.
    pub fn set_document_file(&mut self, document_file: Option<PathBuf>) {
        self.document_file = document_file.filter(|p| !p.as_os_str().is_empty());
    }

    /// Directory that library-relative paths are relative to.
    pub fn library_root(&self) -> Result<PathBuf, PathError> {
        let file = self.library_file.as_deref().ok_or(PathError::NoLibrary)?;
        parent_dir(file)
    }

    /// Directory that document-relative paths are relative to.
    pub fn document_dir(&self) -> Result<PathBuf, PathError> {
        let file = self.document_file.as_deref().ok_or(PathError::NoDocument)?;
        parent_dir(file)
    }

    /// Root directory for a base.
    pub fn base_dir(&self, base: PathBase) -> Result<PathBuf, PathError> {
        match base {
            PathBase::Library => self.library_root(),
            PathBase::Document => self.document_dir(),
        }
    }

    /// Resolve any accepted path form to an absolute path.
    ///
    /// `//`-prefixed paths are always document-relative, absolute paths are
    /// normalised as given, anything else is relative to `base`.
    pub fn to_absolute(&self, path: &str, base: PathBase) -> Result<PathBuf, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(rest) = path.strip_prefix(DOCUMENT_RELATIVE_PREFIX) {
            return join_normalized(&self.document_dir()?, rest);
        }
        let as_path = Path::new(path);
        if as_path.is_absolute() {
            return normalize(as_path);
        }
        join_normalized(&self.base_dir(base)?, path)
    }

    /// Express a path relative to the library root, `/`-separated.
    ///
    /// Plain relative input is taken to be library-relative already and is
    /// only normalised.
    pub fn to_library_relative(&self, path: &str) -> Result<String, PathError> {
        let absolute = self.to_absolute(path, PathBase::Library)?;
        Ok(relative_to(&absolute, &self.library_root()?))
    }

    /// Express a path relative to the document, in `//` form.
    ///
    /// Plain relative input is taken to be library-relative.
    pub fn to_document_relative(&self, path: &str) -> Result<String, PathError> {
        let absolute = self.to_absolute(path, PathBase::Library)?;
        let relative = relative_to(&absolute, &self.document_dir()?);
        Ok(format!("{DOCUMENT_RELATIVE_PREFIX}{relative}"))
    }
}

fn parent_dir(file: &Path) -> Result<PathBuf, PathError> {
    if !file.is_absolute() {
        return Err(PathError::RelativeBase(file.display().to_string()));
    }
    let normalized = normalize(file)?;
    let parent = normalized.parent().map(Path::to_path_buf);
    Ok(parent.unwrap_or(normalized))
}

/// Lexically normalise a path: drop `.`, fold `..` into its parent.
///
/// Fails when an absolute path would climb above its root.
pub fn normalize(path: &Path) -> Result<PathBuf, PathError> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            PathComponent::Prefix(_) | PathComponent::RootDir => {
                out.push(component.as_os_str());
            }
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if path.is_absolute() {
                    return Err(PathError::EscapesRoot(path.display().to_string()));
                } else {
                    out.push("..");
                }
            }
            PathComponent::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Ok(out)
}

/// Join a relative path onto an absolute base and normalise the result.
///
/// Explicit `..` components may climb out of `base`, for sources stored
/// beside the library rather than under it. Only climbing above the
/// filesystem root is an error.
pub fn join_normalized(base: &Path, relative: &str) -> Result<PathBuf, PathError> {
    if !base.is_absolute() {
        return Err(PathError::RelativeBase(base.display().to_string()));
    }
    if relative.is_empty() {
        return Err(PathError::Empty);
    }
    let relative = Path::new(relative);
    if relative.is_absolute() {
        return Err(PathError::EscapesRoot(relative.display().to_string()));
    }
    let joined = normalize(&base.join(relative))?;
    if !joined.starts_with(base) {
        tracing::debug!(
            base = %base.display(),
            path = %relative.display(),
            resolved = %joined.display(),
            "Relative path resolves outside its base"
        );
    }
    Ok(joined)
}

/// Express `target` relative to `base`, both absolute and normalised.
///
/// Uses `..` to climb out of `base` where needed; returns `.` when equal.
#[must_use]
pub fn relative_to(target: &Path, base: &Path) -> String {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

// =============================================================================
// TESTS
// =============================================================================
