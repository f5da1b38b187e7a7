//! The durable store seam.
//!
//! Registries hold only access and authorization logic; every record
//! lives behind [`Store`]. Uniqueness of active codes is enforced here,
//! at insert time, so two creators can never both claim a code.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use tandem_common::{ParticipantId, SessionId, SyncError};

use crate::broadcast::StateDelta;
use crate::codes::{DeviceCode, SessionCode};
use crate::command::Command;
use crate::device::DeviceLink;
use crate::participant::Participant;
use crate::session::Session;

#[async_trait]
pub trait Store: Send + Sync {
    // -- sessions -----------------------------------------------------------

    /// Fails with `Conflict` if an active session already holds the code.
    async fn insert_session(&self, session: Session) -> Result<(), SyncError>;

    async fn session(&self, id: &SessionId) -> Result<Option<Session>, SyncError>;

    async fn active_session_by_code(
        &self,
        code: &SessionCode,
    ) -> Result<Option<Session>, SyncError>;

    /// Overwrite an existing record. Fails with `NotFound` if absent.
    async fn update_session(&self, session: &Session) -> Result<(), SyncError>;

    /// Apply a delta to an active session and bump its sequence number in
    /// one step, returning the updated record.
    async fn apply_state(&self, id: &SessionId, delta: &StateDelta)
        -> Result<Session, SyncError>;

    // -- participants -------------------------------------------------------

    async fn insert_participant(&self, participant: Participant) -> Result<(), SyncError>;

    async fn participant(&self, id: &ParticipantId) -> Result<Option<Participant>, SyncError>;

    async fn participant_by_user(
        &self,
        session_id: &SessionId,
        user_id: &str,
    ) -> Result<Option<Participant>, SyncError>;

    /// Participants of a session in join order.
    async fn participants(&self, session_id: &SessionId) -> Result<Vec<Participant>, SyncError>;

    async fn update_participant(&self, participant: &Participant) -> Result<(), SyncError>;

    /// Returns whether a row was deleted.
    async fn delete_participant(&self, id: &ParticipantId) -> Result<bool, SyncError>;

    // -- device links -------------------------------------------------------

    /// Fails with `Conflict` if an active link already holds the code.
    async fn insert_device_link(&self, link: DeviceLink) -> Result<(), SyncError>;

    async fn device_link(&self, code: &DeviceCode) -> Result<Option<DeviceLink>, SyncError>;

    async fn update_device_link(&self, link: &DeviceLink) -> Result<(), SyncError>;

    // -- commands -----------------------------------------------------------

    async fn insert_command(&self, command: Command) -> Result<(), SyncError>;

    async fn command(&self, id: &str) -> Result<Option<Command>, SyncError>;

    /// Commands addressed to a device, oldest first.
    async fn commands_for(&self, code: &DeviceCode) -> Result<Vec<Command>, SyncError>;

    /// Flip `executed` to true. Returns false if it already was.
    async fn mark_command_executed(&self, id: &str) -> Result<bool, SyncError>;
}
