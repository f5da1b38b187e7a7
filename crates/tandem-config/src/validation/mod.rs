//! Full configuration validation.
//!
//! Each section has its own validator; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod channel;
mod devices;
mod helpers;
mod relay;
mod sessions;

#[cfg(test)]
mod tests;

use crate::schema::TandemConfig;
use tandem_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TandemConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sessions::validate_sessions(&mut errors, config);
    devices::validate_devices(&mut errors, config);
    channel::validate_channel(&mut errors, config);
    relay::validate_relay(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
