//! Configuration loading: shipped file, environment precedence, validation.

mod common;

use common::write_config;
use landfall_camera::config::{Settings, DEFAULT_CONFIG_PATH};
use landfall_camera::drivers::SimulatedOptions;
use landfall_camera::logging::LogFormat;
use landfall_camera::{CameraError, CameraParameter};
use serial_test::serial;
use std::path::PathBuf;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH)
}

#[test]
#[serial]
fn shipped_config_is_valid() {
    let settings = Settings::load_from(shipped_config()).unwrap();
    assert_eq!(settings.cameras.len(), 2);
    assert_eq!(settings.enabled_cameras().len(), 2);

    let b = settings.camera("b-cam").unwrap();
    let options = SimulatedOptions::from_table(&b.options).unwrap();
    assert!(!options.supports_metadata);
    assert!(!options.supported_parameters.contains(&CameraParameter::Iris));
    assert_eq!(options.battery_volts, 14.4);
}

#[test]
#[serial]
fn environment_wins_over_file() {
    let file = write_config(
        r#"
        [application]
        name = "File Name"
        log_level = "info"
        "#,
    );

    std::env::set_var("LANDFALL_APPLICATION__NAME", "Env Name");
    std::env::set_var("LANDFALL_APPLICATION__LOG_FORMAT", "json");
    let result = Settings::load_from(file.path());
    std::env::remove_var("LANDFALL_APPLICATION__NAME");
    std::env::remove_var("LANDFALL_APPLICATION__LOG_FORMAT");

    let settings = result.unwrap();
    assert_eq!(settings.application.name, "Env Name");
    assert_eq!(settings.application.log_level, "info");
    assert_eq!(settings.log_format(), LogFormat::Json);
}

#[test]
#[serial]
fn invalid_env_override_fails_validation() {
    let file = write_config("");
    std::env::set_var("LANDFALL_APPLICATION__LOG_LEVEL", "loud");
    let result = Settings::load_from(file.path());
    std::env::remove_var("LANDFALL_APPLICATION__LOG_LEVEL");

    assert!(matches!(result, Err(CameraError::Configuration(_))));
}

#[test]
fn validation_rejects_bad_cameras() {
    let duplicate = r#"
        [[cameras]]
        id = "a"
        identifier = "10.0.0.1"
        [[cameras]]
        id = "a"
        identifier = "10.0.0.2"
    "#;
    assert!(Settings::from_toml_str(duplicate).is_err());

    let empty_identifier = r#"
        [[cameras]]
        id = "a"
        identifier = ""
    "#;
    assert!(Settings::from_toml_str(empty_identifier).is_err());

    let bad_retry = r#"
        [[cameras]]
        id = "a"
        identifier = "10.0.0.1"
        [cameras.retry]
        initial_backoff_ms = 9000
        max_backoff_ms = 100
    "#;
    assert!(Settings::from_toml_str(bad_retry).is_err());
}

#[test]
fn missing_required_field_is_a_load_error() {
    let result = Settings::from_toml_str(
        r#"
        [[cameras]]
        id = "a"
        "#,
    );
    assert!(matches!(result, Err(CameraError::Config(_))));
}
