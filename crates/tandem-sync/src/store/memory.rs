//! In-process [`Store`] and [`ActivitySink`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tandem_common::{ParticipantId, SessionId, SyncError};
use tokio::sync::RwLock;

use super::Store;
use crate::activity::{ActivityLogEntry, ActivitySink};
use crate::broadcast::StateDelta;
use crate::codes::{DeviceCode, SessionCode};
use crate::command::Command;
use crate::device::DeviceLink;
use crate::participant::Participant;
use crate::session::Session;

/// All tables live under one `RwLock` so cross-table checks (such as
/// code uniqueness) see a consistent view.
#[derive(Default)]
struct StoreState {
    sessions: HashMap<SessionId, Session>,
    /// Kept in insertion order; listing is by join order.
    participants: Vec<Participant>,
    device_links: HashMap<DeviceCode, DeviceLink>,
    commands: Vec<Command>,
    activity: Vec<ActivityLogEntry>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_session(&self, session: Session) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        if state
            .sessions
            .values()
            .any(|s| s.is_active && s.code == session.code)
        {
            return Err(SyncError::Conflict(format!(
                "session code {} is in use",
                session.code
            )));
        }
        state.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn session(&self, id: &SessionId) -> Result<Option<Session>, SyncError> {
        Ok(self.state.read().await.sessions.get(id).cloned())
    }

    async fn active_session_by_code(
        &self,
        code: &SessionCode,
    ) -> Result<Option<Session>, SyncError> {
        Ok(self
            .state
            .read()
            .await
            .sessions
            .values()
            .find(|s| s.is_active && &s.code == code)
            .cloned())
    }

    async fn update_session(&self, session: &Session) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        let slot = state
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| SyncError::NotFound(format!("session {}", session.id)))?;
        *slot = session.clone();
        Ok(())
    }

    async fn apply_state(
        &self,
        id: &SessionId,
        delta: &StateDelta,
    ) -> Result<Session, SyncError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .get_mut(id)
            .filter(|s| s.is_active)
            .ok_or_else(|| SyncError::NotFound(format!("session {id}")))?;
        delta.apply(session);
        session.seq += 1;
        Ok(session.clone())
    }

    async fn insert_participant(&self, participant: Participant) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        if !state.sessions.contains_key(&participant.session_id) {
            return Err(SyncError::NotFound(format!(
                "session {}",
                participant.session_id
            )));
        }
        state.participants.push(participant);
        Ok(())
    }

    async fn participant(&self, id: &ParticipantId) -> Result<Option<Participant>, SyncError> {
        Ok(self
            .state
            .read()
            .await
            .participants
            .iter()
            .find(|p| &p.id == id)
            .cloned())
    }

    async fn participant_by_user(
        &self,
        session_id: &SessionId,
        user_id: &str,
    ) -> Result<Option<Participant>, SyncError> {
        Ok(self
            .state
            .read()
            .await
            .participants
            .iter()
            .find(|p| &p.session_id == session_id && p.user_id == user_id)
            .cloned())
    }

    async fn participants(&self, session_id: &SessionId) -> Result<Vec<Participant>, SyncError> {
        Ok(self
            .state
            .read()
            .await
            .participants
            .iter()
            .filter(|p| &p.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn update_participant(&self, participant: &Participant) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        let slot = state
            .participants
            .iter_mut()
            .find(|p| p.id == participant.id)
            .ok_or_else(|| SyncError::NotFound(format!("participant {}", participant.id)))?;
        *slot = participant.clone();
        Ok(())
    }

    async fn delete_participant(&self, id: &ParticipantId) -> Result<bool, SyncError> {
        let mut state = self.state.write().await;
        let before = state.participants.len();
        state.participants.retain(|p| &p.id != id);
        Ok(state.participants.len() != before)
    }

    async fn insert_device_link(&self, link: DeviceLink) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        if state
            .device_links
            .get(&link.code)
            .is_some_and(|existing| existing.is_active)
        {
            return Err(SyncError::Conflict(format!(
                "device code {} is in use",
                link.code
            )));
        }
        // An inactive link with the same code is recycled.
        state.device_links.insert(link.code.clone(), link);
        Ok(())
    }

    async fn device_link(&self, code: &DeviceCode) -> Result<Option<DeviceLink>, SyncError> {
        Ok(self.state.read().await.device_links.get(code).cloned())
    }

    async fn update_device_link(&self, link: &DeviceLink) -> Result<(), SyncError> {
        let mut state = self.state.write().await;
        let slot = state
            .device_links
            .get_mut(&link.code)
            .ok_or_else(|| SyncError::NotFound(format!("device link {}", link.code)))?;
        *slot = link.clone();
        Ok(())
    }

    async fn insert_command(&self, command: Command) -> Result<(), SyncError> {
        self.state.write().await.commands.push(command);
        Ok(())
    }

    async fn command(&self, id: &str) -> Result<Option<Command>, SyncError> {
        Ok(self
            .state
            .read()
            .await
            .commands
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn commands_for(&self, code: &DeviceCode) -> Result<Vec<Command>, SyncError> {
        Ok(self
            .state
            .read()
            .await
            .commands
            .iter()
            .filter(|c| &c.device_code == code)
            .cloned()
            .collect())
    }

    async fn mark_command_executed(&self, id: &str) -> Result<bool, SyncError> {
        let mut state = self.state.write().await;
        let command = state
            .commands
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| SyncError::NotFound(format!("command {id}")))?;
        if command.executed {
            return Ok(false);
        }
        command.executed = true;
        command.executed_at = Some(Utc::now());
        Ok(true)
    }
}

#[async_trait]
impl ActivitySink for MemoryStore {
    async fn append_activity(&self, entry: ActivityLogEntry) -> Result<(), SyncError> {
        self.state.write().await.activity.push(entry);
        Ok(())
    }

    async fn activity(
        &self,
        session_id: Option<&SessionId>,
    ) -> Result<Vec<ActivityLogEntry>, SyncError> {
        let state = self.state.read().await;
        Ok(state
            .activity
            .iter()
            .filter(|e| session_id.is_none() || e.session_id.as_ref() == session_id)
            .cloned()
            .collect())
    }
}
