//! Write side of state propagation.

use std::sync::Arc;

use tandem_common::{SessionId, SyncError, TopicKey};
use tracing::debug;

use super::types::{StateDelta, StateSnapshot};
use crate::activity::ActivityAction;
use crate::channel::{Channel, ChannelMessage};
use crate::participant::ParticipantRegistry;
use crate::session::SessionRegistry;
use crate::store::Store;

#[derive(Clone)]
pub struct StateBroadcaster {
    sessions: SessionRegistry,
    participants: ParticipantRegistry,
    store: Arc<dyn Store>,
    channel: Arc<dyn Channel>,
}

impl StateBroadcaster {
    pub fn new(
        sessions: SessionRegistry,
        participants: ParticipantRegistry,
        store: Arc<dyn Store>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            sessions,
            participants,
            store,
            channel,
        }
    }

    /// Apply a leader or co-leader change and publish the new snapshot.
    ///
    /// No version check: concurrent writers race and the last persisted
    /// write wins. Each accepted write gets the next sequence number so
    /// followers can drop whatever arrives out of order.
    pub async fn update_state(
        &self,
        session_id: &SessionId,
        caller_id: &str,
        delta: StateDelta,
    ) -> Result<StateSnapshot, SyncError> {
        delta.validate()?;
        let session = self.sessions.active_session(session_id).await?;
        let role = self.participants.authorize_writer(&session, caller_id).await?;

        let session = self.store.apply_state(session_id, &delta).await?;
        let snapshot = session.state();

        let topic = TopicKey::session(session_id);
        let receivers = self
            .channel
            .publish(&topic, ChannelMessage::State(snapshot.clone()))
            .await;

        self.sessions
            .log()
            .record(
                Some(session_id),
                caller_id,
                ActivityAction::StateChanged {
                    delta: delta.clone(),
                    seq: snapshot.seq,
                },
            )
            .await;
        debug!(
            session = %session_id,
            caller = caller_id,
            role = ?role,
            change = delta.name(),
            seq = snapshot.seq,
            receivers,
            "State published"
        );
        Ok(snapshot)
    }
}
