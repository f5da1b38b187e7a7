//! Shared navigation sync and remote-control relay.
//!
//! A leader drives which document and position a group session shows;
//! followers mirror it over a publish/subscribe channel. Separately, a
//! presentation client exposes a short device code that a remote control
//! uses to send it point-to-point commands.
//!
//! Storage and transport are seams: [`Store`] stands in for the durable
//! store and [`Channel`] for the realtime propagation layer. The bundled
//! [`MemoryStore`] and [`LocalChannel`] run everything in-process.

pub mod activity;
pub mod broadcast;
pub mod channel;
pub mod codes;
pub mod command;
pub mod credential;
pub mod device;
pub mod pairing;
pub mod participant;
pub mod service;
pub mod session;
pub mod store;

pub use activity::{ActivityAction, ActivityLog, ActivityLogEntry, ActivitySink};
pub use broadcast::{Follower, FollowerEvent, StateBroadcaster, StateDelta, StateSnapshot};
pub use channel::{Channel, ChannelMessage, LocalChannel, Received, Subscription};
pub use codes::{DeviceCode, SessionCode};
pub use command::{
    Command, CommandHandler, CommandMessage, CommandReceiver, CommandRelay, RemoteCommand,
};
pub use credential::PasswordHash;
pub use device::{DeviceLink, DeviceLinkRegistry, HeartbeatTask};
pub use pairing::PairingPayload;
pub use participant::{
    ConnectionStatus, DeviceInfo, DeviceType, FollowMode, Participant, ParticipantRegistry, Role,
};
pub use service::SyncService;
pub use session::{CreatedSession, JoinedSession, Session, SessionRegistry, SessionSnapshot};
pub use store::{MemoryStore, Store};
