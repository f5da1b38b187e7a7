//! Device links: lightweight 1:1 pairings for remote control.
//!
//! A presentation client generates a link and shares its 9-character
//! code out of band. A remote client connects with that code and from
//! then on sends commands through [`crate::CommandRelay`]. Links have no
//! expiry; they stay active until the owner tears them down.

mod heartbeat;
mod registry;
mod types;

pub use heartbeat::HeartbeatTask;
pub use registry::DeviceLinkRegistry;
pub use types::DeviceLink;
