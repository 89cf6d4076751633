//! Configuration precedence tests: flags over environment over file.

#![allow(clippy::unwrap_used, clippy::panic)]

use powerlib::config::{
    Config, ENV_DOCUMENT, ENV_LIBRARY, ENV_LOG_FORMAT, LogFormat, Overrides,
};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("powerlib.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
    let map: BTreeMap<String, OsString> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), OsString::from(v)))
        .collect();
    move |key| map.get(key).cloned()
}

// =============================================================================
// FILE
// =============================================================================

#[test]
fn test_file_paths_are_relative_to_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "library = \"lib/library.json\"\ndocument = \"shots/010.json\"\nlog_format = \"json\"\n",
    );
    let overrides = Overrides {
        config: Some(path.clone()),
        ..Overrides::default()
    };

    let config = Config::load_with_env(&overrides, env_of(&[])).unwrap();

    assert_eq!(config.library, Some(dir.path().join("lib/library.json")));
    assert_eq!(config.document, Some(dir.path().join("shots/010.json")));
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.source, Some(path));
}

#[test]
fn test_unknown_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "libary = \"typo.json\"\n");
    let overrides = Overrides {
        config: Some(path),
        ..Overrides::default()
    };

    assert!(Config::load_with_env(&overrides, env_of(&[])).is_err());
}

#[test]
fn test_malformed_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "library = [\n");
    let overrides = Overrides {
        config: Some(path),
        ..Overrides::default()
    };

    assert!(Config::load_with_env(&overrides, env_of(&[])).is_err());
}

// =============================================================================
// PRECEDENCE
// =============================================================================

#[test]
fn test_environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "library = \"from_file.json\"\ndocument = \"doc_from_file.json\"\n",
    );
    let overrides = Overrides {
        config: Some(path),
        ..Overrides::default()
    };
    let env = env_of(&[
        (ENV_LIBRARY, "/env/library.json"),
        (ENV_LOG_FORMAT, "json"),
    ]);

    let config = Config::load_with_env(&overrides, env).unwrap();

    assert_eq!(config.library, Some(PathBuf::from("/env/library.json")));
    assert_eq!(config.document, Some(dir.path().join("doc_from_file.json")));
    assert_eq!(config.log_format, LogFormat::Json);
}

#[test]
fn test_flags_override_environment() {
    let overrides = Overrides {
        config: None,
        library: Some(PathBuf::from("/flag/library.json")),
        document: Some(PathBuf::from("/flag/doc.json")),
    };
    let env = env_of(&[
        (ENV_LIBRARY, "/env/library.json"),
        (ENV_DOCUMENT, "/env/doc.json"),
    ]);

    let config = Config::load_with_env(&overrides, env).unwrap();

    assert_eq!(config.library, Some(PathBuf::from("/flag/library.json")));
    assert_eq!(config.document, Some(PathBuf::from("/flag/doc.json")));
}

#[test]
fn test_empty_environment_value_is_ignored() {
    let overrides = Overrides {
        library: Some(PathBuf::from("/flag/library.json")),
        ..Overrides::default()
    };
    let env = env_of(&[(ENV_DOCUMENT, "")]);

    let config = Config::load_with_env(&overrides, env).unwrap();

    assert_eq!(config.document, None);
}

#[test]
fn test_resolver_uses_configured_paths() {
    let config = Config {
        library: Some(PathBuf::from("/lib/library.json")),
        document: Some(PathBuf::from("/shots/010.json")),
        ..Config::default()
    };

    let resolver = config.resolver();

    assert_eq!(resolver.library_root(), Ok(PathBuf::from("/lib")));
}
