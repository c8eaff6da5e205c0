//! Configuration Tests
//!
//! Loading engine configuration from files and fragment directories.

use std::fs;
use std::path::Path;

use atom_patch::config::DuplicatePolicy;
use atom_patch::{Catalog, EngineConfig, PatchError, VersionId};

fn fixtures_path() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").leak()
}

#[test]
fn test_fixtures_build_catalogs() {
    for name in ["widget.toml", "medical.toml"] {
        let content = fs::read_to_string(fixtures_path().join(name)).unwrap();
        let config = EngineConfig::from_toml_str(&content).unwrap();
        Catalog::from_config(&config).unwrap();
    }
}

#[test]
fn test_load_directory_merges_fragments() {
    let dir = tempfile::tempdir().unwrap();
    fs::copy(fixtures_path().join("medical.toml"), dir.path().join("a_medical.toml")).unwrap();

    fs::create_dir(dir.path().join("extra")).unwrap();
    fs::write(
        dir.path().join("extra/b_widget.json"),
        r#"{
            "classes": [{ "classname": "Widget", "versions": ["1", "2"] }],
            "contexts": [{
                "name": "MedicalData",
                "versions": [{
                    "name": "V3",
                    "classes": [
                        { "classname": "MedPatient", "version": "1" },
                        { "classname": "Study", "version": "2" },
                        { "classname": "Widget", "version": "2" }
                    ]
                }]
            }]
        }"#,
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "not a fragment").unwrap();

    let config = EngineConfig::load_directory(dir.path()).unwrap();
    assert_eq!(config.classes.len(), 4);
    assert_eq!(config.contexts.len(), 1);
    assert_eq!(config.contexts[0].versions.len(), 3);
    assert_eq!(config.engine.default_context.as_deref(), Some("MedicalData"));

    let catalog = Catalog::from_config(&config).unwrap();
    assert_eq!(
        catalog.versions().structural_version("MedicalData", "V3", "Widget"),
        Some(VersionId::new("Widget", "2"))
    );
}

#[test]
fn test_load_directory_reports_bad_fragment() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.toml"), "[[classes]\nclassname = ").unwrap();

    let err = EngineConfig::load_directory(dir.path()).unwrap_err();
    match err {
        PatchError::InvalidConfig(message) => assert!(message.contains("broken.toml")),
        other => panic!("Expected InvalidConfig, got {:?}", other),
    }
}

#[test]
fn test_load_directory_requires_directory() {
    let file = fixtures_path().join("widget.toml");
    assert!(matches!(
        EngineConfig::load_directory(&file),
        Err(PatchError::InvalidConfig(_))
    ));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atom-patch.toml");
    fs::write(
        &path,
        r#"
[engine]
duplicate_policy = "replace"

[[classes]]
classname = "Widget"
versions = ["1", "2"]
"#,
    )
    .unwrap();

    let config = EngineConfig::load_from(path.to_str()).unwrap();
    assert_eq!(config.engine.duplicate_policy(), DuplicatePolicy::Replace);
    assert_eq!(config.classes[0].versions, vec!["1", "2"]);
}

#[test]
fn test_link_table_with_unknown_version_fails() {
    let config = EngineConfig::from_toml_str(
        r#"
[[classes]]
classname = "Study"
versions = ["1"]

[[contexts]]
name = "MedicalData"

[[contexts.versions]]
name = "V1"
classes = [{ classname = "Study", version = "7" }]
"#,
    )
    .unwrap();

    let err = Catalog::from_config(&config).err().unwrap();
    assert!(matches!(
        err,
        PatchError::UnknownStructuralVersion { ref classname, ref version }
            if classname == "Study" && version == "7"
    ));
}
