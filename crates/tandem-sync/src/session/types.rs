//! Session records and the views handed to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_common::SessionId;

use crate::broadcast::StateSnapshot;
use crate::codes::SessionCode;
use crate::credential::PasswordHash;
use crate::participant::Participant;

/// The authoritative session record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub code: SessionCode,
    pub leader_id: String,
    pub title: String,
    pub description: String,
    pub password: Option<PasswordHash>,
    pub current_document_id: Option<String>,
    pub current_position: u32,
    pub is_playing: bool,
    pub is_active: bool,
    /// Bumped on every accepted state write.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn state(&self) -> StateSnapshot {
        StateSnapshot {
            document_id: self.current_document_id.clone(),
            position: self.current_position,
            is_playing: self.is_playing,
            seq: self.seq,
        }
    }

    /// Client-facing view; never carries password material.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            code: self.code.clone(),
            leader_id: self.leader_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            has_password: self.password.is_some(),
            is_active: self.is_active,
            state: self.state(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub code: SessionCode,
    pub leader_id: String,
    pub title: String,
    pub description: String,
    pub has_password: bool,
    pub is_active: bool,
    pub state: StateSnapshot,
    pub created_at: DateTime<Utc>,
}

/// Result of `create_session`: the session plus the leader's own row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session: SessionSnapshot,
    pub participant: Participant,
}

/// Result of `join_session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedSession {
    pub session: SessionSnapshot,
    pub participant: Participant,
}
