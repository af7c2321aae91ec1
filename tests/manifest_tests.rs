//! Tests for manifest loading, mutation and persistence
//!
//! These tests verify:
//! - Registry presence before and after adding
//! - Idempotent dependency upserts
//! - Version satisfaction checks
//! - Round-trips that keep unrelated keys intact

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use setup_wizard::manifest::{Manifest, ManifestStore, RegistryChange, RegistrySource};
use setup_wizard::SetupError;

const UNITY_MANIFEST: &str = r#"{
  "dependencies": {
    "com.unity.collab-proxy": "2.5.2",
    "com.unity.feature.development": "1.0.2",
    "com.unity.modules.ai": "1.0.0"
  },
  "enableLockFile": true,
  "resolutionStrategy": "highestMinor",
  "testables": [
    "com.unity.modules.ai"
  ]
}
"#;

fn manifest_file(text: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("manifest.json");
    fs::write(&path, text).expect("write manifest");
    (dir, path)
}

fn sdk_registry() -> RegistrySource {
    RegistrySource::new(
        "Vket Cloud SDK Install Wizard",
        "https://registry.npmjs.com",
        ["com.hikky.vketcloudsdk-install-wizard"],
    )
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_missing_manifest_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let err = ManifestStore::load(dir.path().join("Packages/manifest.json")).unwrap_err();
    assert!(matches!(err, SetupError::ManifestNotFound { .. }));
    assert!(err.is_terminal());
}

#[test]
fn test_load_invalid_json_is_parse_error() {
    let (_dir, path) = manifest_file("{ \"dependencies\": { ");
    let err = ManifestStore::load(&path).unwrap_err();
    assert!(matches!(err, SetupError::ManifestParse { .. }));
    assert!(err.to_string().contains("manifest.json"));
}

// =============================================================================
// Registries
// =============================================================================

#[test]
fn test_has_registry_false_then_true_after_add() {
    let (_dir, path) = manifest_file(UNITY_MANIFEST);
    let mut store = ManifestStore::load(&path).expect("load");
    let entry = sdk_registry();

    assert!(!store.has_registry(&entry.name));
    store.add_registry(&entry).expect("add registry");
    assert!(store.has_registry(&entry.name));

    let reloaded = ManifestStore::load(&path).expect("reload");
    assert!(reloaded.has_registry(&entry.name));
    assert_eq!(reloaded.manifest().registries(), vec![entry]);
}

#[test]
fn test_add_registry_appends_unconditionally() {
    let (_dir, path) = manifest_file(UNITY_MANIFEST);
    let mut store = ManifestStore::load(&path).expect("load");
    let entry = sdk_registry();
    store.add_registry(&entry).expect("first add");
    store.add_registry(&entry).expect("second add");
    assert_eq!(store.manifest().registries().len(), 2);
}

#[test]
fn test_ensure_registry_skips_existing_name() {
    let (_dir, path) = manifest_file(UNITY_MANIFEST);
    let mut store = ManifestStore::load(&path).expect("load");
    assert_eq!(store.ensure_registry(&sdk_registry()).expect("add"), RegistryChange::Added);

    let before = fs::read_to_string(&path).expect("read");
    let mut other_url = sdk_registry();
    other_url.url = "https://mirror.example.com".to_string();
    assert_eq!(
        store.ensure_registry(&other_url).expect("ensure"),
        RegistryChange::AlreadyPresent
    );
    assert_eq!(fs::read_to_string(&path).expect("read"), before);
}

// =============================================================================
// Dependencies
// =============================================================================

#[test]
fn test_upsert_twice_equals_once() {
    let (_dir_a, path_a) = manifest_file(UNITY_MANIFEST);
    let (_dir_b, path_b) = manifest_file(UNITY_MANIFEST);

    let mut once = ManifestStore::load(&path_a).expect("load");
    once.upsert_dependency("pkg", "1.0.0").expect("upsert");

    let mut twice = ManifestStore::load(&path_b).expect("load");
    twice.upsert_dependency("pkg", "1.0.0").expect("upsert");
    twice.upsert_dependency("pkg", "1.0.0").expect("upsert again");

    assert_eq!(
        once.manifest().as_object().get("dependencies"),
        twice.manifest().as_object().get("dependencies")
    );
    assert_eq!(
        fs::read_to_string(&path_a).expect("read"),
        fs::read_to_string(&path_b).expect("read")
    );
}

#[test]
fn test_dependency_satisfaction() {
    let (_dir, path) = manifest_file(UNITY_MANIFEST);
    let mut store = ManifestStore::load(&path).expect("load");

    assert!(!store.is_dependency_satisfied("pkg", "2.0.0"));

    store.upsert_dependency("pkg", "1.9.0").expect("upsert");
    assert!(!store.is_dependency_satisfied("pkg", "2.0.0"));

    store.upsert_dependency("pkg", "2.0.0").expect("upsert");
    assert!(store.is_dependency_satisfied("pkg", "2.0.0"));

    store.upsert_dependency("pkg", "2.0.1").expect("upsert");
    assert!(store.is_dependency_satisfied("pkg", "2.0.0"));

    store.upsert_dependency("pkg", "file:../local-pkg").expect("upsert");
    assert!(!store.is_dependency_satisfied("pkg", "2.0.0"));
}

#[test]
fn test_upsert_without_dependencies_section_writes_nothing() {
    let (_dir, path) = manifest_file(r#"{"scopedRegistries": []}"#);
    let mut store = ManifestStore::load(&path).expect("load");
    let err = store.upsert_dependency("pkg", "1.0.0").unwrap_err();
    assert!(matches!(err, SetupError::MissingSection { .. }));
    assert_eq!(
        fs::read_to_string(&path).expect("read"),
        r#"{"scopedRegistries": []}"#
    );
}

// =============================================================================
// Round-trip
// =============================================================================

#[test]
fn test_persist_without_mutation_is_equivalent() {
    let (_dir, path) = manifest_file(UNITY_MANIFEST);
    let mut store = ManifestStore::load(&path).expect("load");
    store.persist().expect("persist");

    let original: serde_json::Value = serde_json::from_str(UNITY_MANIFEST).expect("parse");
    let rewritten: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(original, rewritten);
    // Two-space indentation is kept, so an untouched manifest is byte-identical
    assert_eq!(fs::read_to_string(&path).expect("read"), UNITY_MANIFEST);
}

#[test]
fn test_mutation_preserves_unrelated_keys() {
    let (_dir, path) = manifest_file(UNITY_MANIFEST);
    let mut store = ManifestStore::load(&path).expect("load");
    store.add_registry(&sdk_registry()).expect("add");
    store
        .upsert_dependency("com.hikky.vketcloudsdk-install-wizard", "1.0.0")
        .expect("upsert");

    let text = fs::read_to_string(&path).expect("read");
    let reparsed = Manifest::parse(&text, &path).expect("reparse");
    let root = reparsed.as_object();
    assert_eq!(root.get("enableLockFile"), Some(&serde_json::json!(true)));
    assert_eq!(root.get("resolutionStrategy"), Some(&serde_json::json!("highestMinor")));
    assert_eq!(root.get("testables"), Some(&serde_json::json!(["com.unity.modules.ai"])));
    assert_eq!(
        root.keys().collect::<Vec<_>>(),
        vec![
            "dependencies",
            "enableLockFile",
            "resolutionStrategy",
            "testables",
            "scopedRegistries"
        ]
    );
    assert_eq!(
        reparsed
            .dependency_version("com.unity.collab-proxy")
            .as_deref(),
        Some("2.5.2")
    );
}

// =============================================================================
// Loosely-typed sections
// =============================================================================

#[test]
fn test_null_registries_are_replaced_on_add() {
    let (_dir, path) = manifest_file(r#"{"dependencies": {}, "scopedRegistries": null}"#);
    let mut store = ManifestStore::load(&path).expect("load");
    assert!(!store.has_registry("Vket Cloud SDK Install Wizard"));

    store.ensure_registry(&sdk_registry()).expect("add");
    let reloaded = ManifestStore::load(&path).expect("reload");
    assert_eq!(reloaded.manifest().registries(), vec![sdk_registry()]);
}

#[test]
fn test_null_dependencies_read_as_missing_section() {
    let (_dir, path) = manifest_file(r#"{"dependencies": null}"#);
    let mut store = ManifestStore::load(&path).expect("load");
    assert!(!store.manifest().has_dependencies_section());
    let err = store.upsert_dependency("pkg", "1.0.0").unwrap_err();
    assert!(matches!(err, SetupError::MissingSection { .. }));
    assert_eq!(fs::read_to_string(&path).expect("read"), r#"{"dependencies": null}"#);
}
