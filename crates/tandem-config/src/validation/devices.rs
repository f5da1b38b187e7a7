//! Device link validation.

use crate::schema::TandemConfig;

use super::helpers::validate_range;

/// Validate heartbeat cadence and device code generation.
pub(crate) fn validate_devices(errors: &mut Vec<String>, config: &TandemConfig) {
    validate_range(
        errors,
        "devices.heartbeat_interval_secs",
        config.devices.heartbeat_interval_secs,
        5,
        300,
    );
    validate_range(
        errors,
        "devices.code_attempts",
        u64::from(config.devices.code_attempts),
        1,
        1000,
    );
}
