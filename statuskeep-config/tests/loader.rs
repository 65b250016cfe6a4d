use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use statuskeep_config::{ConfigLoadError, ConfigLoader, ConfigSource};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_when_nothing_is_configured() {
    let dir = tempfile::tempdir().unwrap();
    let load = ConfigLoader::new()
        .with_search_dir(dir.path())
        .load_with_env(env(&[]))
        .unwrap();

    assert_eq!(load.source, ConfigSource::Default);
    assert_eq!(
        load.config.settings.storage_root,
        PathBuf::from("/storage/emulated/0")
    );
    assert!(load.config.installed_packages.is_none());
    assert!(!load.config.manage_all_files);
    assert!(load.warnings.is_empty());
}

#[test]
fn default_file_is_found_in_search_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("statuskeep.toml"),
        "storage_root = \"/mnt/phone\"\nlog_filter = \"debug\"\n",
    )
    .unwrap();

    let load = ConfigLoader::new()
        .with_search_dir(dir.path())
        .load_with_env(env(&[]))
        .unwrap();

    assert_eq!(
        load.source,
        ConfigSource::File(dir.path().join("statuskeep.toml"))
    );
    assert_eq!(load.config.settings.storage_root, PathBuf::from("/mnt/phone"));
    assert_eq!(load.config.log_filter.as_deref(), Some("debug"));
}

#[test]
fn env_path_beats_inline_json_and_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let named = dir.path().join("custom.json");
    fs::write(&named, r#"{ "storage_root": "/from/path" }"#).unwrap();
    fs::write(dir.path().join("statuskeep.toml"), "storage_root = \"/x\"")
        .unwrap();
    let named_str = named.to_string_lossy().into_owned();

    let load = ConfigLoader::new()
        .with_search_dir(dir.path())
        .load_with_env(env(&[
            ("STATUSKEEP_CONFIG_PATH", named_str.as_str()),
            ("STATUSKEEP_CONFIG_JSON", r#"{ "storage_root": "/inline" }"#),
        ]))
        .unwrap();

    assert_eq!(load.source, ConfigSource::EnvPath(named));
    assert_eq!(load.config.settings.storage_root, PathBuf::from("/from/path"));
}

#[test]
fn inline_json_and_overrides_apply() {
    let dir = tempfile::tempdir().unwrap();
    let load = ConfigLoader::new()
        .with_search_dir(dir.path())
        .load_with_env(env(&[
            (
                "STATUSKEEP_CONFIG_JSON",
                r#"{ "installed_packages": ["com.whatsapp.w4b"] }"#,
            ),
            ("STATUSKEEP_STORAGE_ROOT", "/override"),
            ("STATUSKEEP_MANAGE_ALL_FILES", "yes"),
        ]))
        .unwrap();

    assert_eq!(load.source, ConfigSource::EnvInline);
    assert_eq!(load.config.settings.storage_root, PathBuf::from("/override"));
    assert!(load.config.manage_all_files);
    assert_eq!(
        load.config.installed_packages,
        Some(vec!["com.whatsapp.w4b".to_owned()])
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::new()
        .with_config_path(dir.path().join("absent.toml"))
        .load_with_env(env(&[]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::MissingConfig { .. }));
}

#[test]
fn malformed_file_and_flag_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "storage_root = [").unwrap();
    let err = ConfigLoader::new()
        .with_config_path(&broken)
        .load_with_env(env(&[]))
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::Parse { .. }));

    let err = ConfigLoader::new()
        .with_search_dir(dir.path().join("empty"))
        .load_with_env(env(&[("STATUSKEEP_MANAGE_ALL_FILES", "maybe")]))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigLoadError::InvalidOverride {
            key: "STATUSKEEP_MANAGE_ALL_FILES",
            ..
        }
    ));
}

#[test]
fn missing_env_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let load = ConfigLoader::new()
        .with_env_file(dir.path().join(".env"))
        .with_search_dir(dir.path())
        .load()
        .unwrap();
    assert!(!load.env_file_loaded);
}
