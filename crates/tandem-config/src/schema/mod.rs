//! Configuration schema types for Tandem.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod relay;
mod sync;
mod system;

pub use relay::*;
pub use sync::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Tandem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TandemConfig {
    pub sessions: SessionsConfig,
    pub devices: DevicesConfig,
    pub channel: ChannelConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}
