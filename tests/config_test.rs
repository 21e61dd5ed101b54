//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global → Local: field-wise REPLACE where the overlay sets a value
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! These tests pass explicit file locations to `Settings::load_from`, so a
//! global config on the test machine does not leak in.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use shepherd::config::{local_config_path, Settings};

#[test]
fn given_no_config_files_when_load_then_uses_defaults() {
    let settings = Settings::load_from(None, None).expect("load settings");

    assert_eq!(settings.hierarchy.max_fan_out, 9);
    assert_eq!(settings.hierarchy.root_role, "Counsel");
    assert_eq!(settings.hierarchy.root_label, "Pastor");
}

#[test]
fn given_global_and_local_config_when_load_then_local_wins_per_field() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let global = temp.path().join("shepherd.toml");
    fs::write(
        &global,
        r#"
roster_file = "/srv/church/roster.json"

[hierarchy]
max_fan_out = 12
root_label = "Senior Pastor"
"#,
    )
    .unwrap();
    let local = local_config_path(temp.path());
    fs::write(
        &local,
        r#"
[hierarchy]
max_fan_out = 5
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_from(Some(&global), Some(&local)).expect("load settings");

    // Assert
    assert_eq!(settings.hierarchy.max_fan_out, 5);
    assert_eq!(settings.hierarchy.root_label, "Senior Pastor");
    assert_eq!(settings.hierarchy.root_role, "Counsel");
    assert_eq!(
        settings.roster_file,
        PathBuf::from("/srv/church/roster.json")
    );
    assert_eq!(settings.hierarchy.policy().max_fan_out, 5);
}

#[test]
fn given_zero_fan_out_when_load_then_config_error() {
    let temp = TempDir::new().unwrap();
    let local = local_config_path(temp.path());
    fs::write(&local, "[hierarchy]\nmax_fan_out = 0\n").unwrap();

    let err = Settings::load_from(None, Some(&local)).unwrap_err();

    assert!(err.to_string().contains("max_fan_out"), "{}", err);
}

#[test]
fn given_malformed_toml_when_load_then_config_error_names_file() {
    let temp = TempDir::new().unwrap();
    let local = local_config_path(temp.path());
    fs::write(&local, "[hierarchy\nmax_fan_out = ").unwrap();

    let err = Settings::load_from(None, Some(&local)).unwrap_err();

    assert!(err.to_string().contains(".shepherd.toml"), "{}", err);
}

#[test]
fn given_settings_when_to_toml_then_round_trips() {
    let settings = Settings::load_from(None, None).unwrap();

    let text = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&text).unwrap();

    assert_eq!(parsed, settings);
}
