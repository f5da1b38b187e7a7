//! Relay listener validation.

use crate::schema::TandemConfig;

use super::helpers::validate_range;

/// Validate the listen address and handshake timeout.
pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &TandemConfig) {
    validate_range(
        errors,
        "relay.port",
        u64::from(config.relay.port),
        1024,
        65_535,
    );
    validate_range(
        errors,
        "relay.hello_timeout_secs",
        config.relay.hello_timeout_secs,
        1,
        120,
    );
    if config.relay.bind.trim().is_empty() {
        errors.push("relay.bind must not be empty".into());
    }
}
