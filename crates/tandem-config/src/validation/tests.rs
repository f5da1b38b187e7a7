//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    assert!(validate(&TandemConfig::default()).is_ok());
}

#[test]
fn catches_zero_code_attempts() {
    let mut config = TandemConfig::default();
    config.sessions.code_attempts = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("sessions.code_attempts"));
}

#[test]
fn catches_weak_password_iterations() {
    let mut config = TandemConfig::default();
    config.sessions.password_iterations = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("sessions.password_iterations"));
}

#[test]
fn catches_heartbeat_interval_out_of_range() {
    let mut config = TandemConfig::default();
    config.devices.heartbeat_interval_secs = 3600;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("devices.heartbeat_interval_secs"));
}

#[test]
fn catches_tiny_channel_capacity() {
    let mut config = TandemConfig::default();
    config.channel.capacity = 1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("channel.capacity"));
}

#[test]
fn catches_privileged_port_and_empty_bind() {
    let mut config = TandemConfig::default();
    config.relay.port = 80;
    config.relay.bind = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.port"));
    assert!(err.contains("relay.bind"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = TandemConfig::default();
    config.sessions.code_attempts = 0;
    config.relay.hello_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("; "));
}
