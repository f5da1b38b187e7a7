//! Per-session participants: roles, follow preference, and presence.
//!
//! A participant sits on two independent axes. Role is Leader (fixed at
//! creation), CoLeader (granted by the leader) or Member. Mode is
//! Following, where leader snapshots overwrite local state, or
//! Independent, where the participant navigates on its own.

mod registry;
mod types;

pub use registry::ParticipantRegistry;
pub use types::{ConnectionStatus, DeviceInfo, DeviceType, FollowMode, Participant, Role};
