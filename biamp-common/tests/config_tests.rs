//! Integration tests for configuration resolution
//!
//! Covers the priority order (CLI > environment > platform default >
//! compiled defaults) and graceful handling of partial files.

use biamp_common::config::SinkConfig;
use biamp_common::Error;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
fn cli_path_takes_priority() {
    let file = write_config(
        r#"
        [audio]
        mid_device = "hw:CARD=mids"

        [controls]
        poll_interval_ms = 20
        "#,
    );

    let config = SinkConfig::resolve(Some(file.path())).unwrap();
    assert_eq!(config.audio.mid_device.as_deref(), Some("hw:CARD=mids"));
    assert_eq!(config.controls.poll_interval_ms, 20);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let result = SinkConfig::resolve(Some(std::path::Path::new(
        "/nonexistent/biamp/config.toml",
    )));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn malformed_file_is_an_error() {
    let file = write_config("this is not toml [");
    let result = SinkConfig::resolve(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn empty_file_yields_defaults() {
    let file = write_config("");
    let config = SinkConfig::resolve(Some(file.path())).unwrap();

    assert!(config.audio.bass_device.is_none());
    assert!(config.controls.button_line.is_none());
    assert_eq!(config.controls.click_timeout_ms, 400);
    assert_eq!(config.controls.long_press_ms, 3000);
}

#[test]
fn control_lines_parse_as_paths() {
    let file = write_config(
        r#"
        [controls]
        encoder_line_a = "/sys/class/gpio/gpio17/value"
        encoder_line_b = "/sys/class/gpio/gpio27/value"
        button_line = "/sys/class/gpio/gpio19/value"
        relay_line = "/sys/class/gpio/gpio18/value"
        "#,
    );

    let config = SinkConfig::resolve(Some(file.path())).unwrap();
    let a = config.controls.encoder_line_a.unwrap();
    assert_eq!(a.to_str().unwrap(), "/sys/class/gpio/gpio17/value");
    assert!(config.controls.party_led_line.is_none());
}
