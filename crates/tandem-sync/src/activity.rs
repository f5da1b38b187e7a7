//! Append-only audit trail of session and device actions.
//!
//! Recording is best-effort. A sink failure is logged and counted but
//! never returned to the operation that triggered it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_common::{new_id, ParticipantId, SessionId, SyncError};
use tracing::warn;

use crate::broadcast::StateDelta;
use crate::command::RemoteCommand;
use crate::codes::{DeviceCode, SessionCode};

/// Durable destination for log entries.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn append_activity(&self, entry: ActivityLogEntry) -> Result<(), SyncError>;

    /// Entries for one session, or every entry when `session_id` is `None`,
    /// oldest first.
    async fn activity(
        &self,
        session_id: Option<&SessionId>,
    ) -> Result<Vec<ActivityLogEntry>, SyncError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: String,
    /// `None` for device-link actions, which belong to no session.
    pub session_id: Option<SessionId>,
    pub user_id: String,
    pub action_type: String,
    pub action_data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Every mutating action the registries record.
#[derive(Debug, Clone)]
pub enum ActivityAction {
    SessionCreated { code: SessionCode },
    Joined { participant_id: ParticipantId, rejoin: bool },
    Left { was_leader: bool },
    SessionClosed,
    StateChanged { delta: StateDelta, seq: u64 },
    Promoted { participant_id: ParticipantId },
    Removed { participant_id: ParticipantId },
    FollowToggled { following: bool },
    DeviceLinked { code: DeviceCode },
    DeviceConnected { code: DeviceCode },
    DeviceTornDown { code: DeviceCode },
    CommandSent { code: DeviceCode, command_id: String, command: RemoteCommand },
}

impl ActivityAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            ActivityAction::SessionCreated { .. } => "session_created",
            ActivityAction::Joined { .. } => "joined",
            ActivityAction::Left { .. } => "left",
            ActivityAction::SessionClosed => "session_closed",
            ActivityAction::StateChanged { .. } => "state_changed",
            ActivityAction::Promoted { .. } => "promoted",
            ActivityAction::Removed { .. } => "removed",
            ActivityAction::FollowToggled { .. } => "follow_toggled",
            ActivityAction::DeviceLinked { .. } => "device_linked",
            ActivityAction::DeviceConnected { .. } => "device_connected",
            ActivityAction::DeviceTornDown { .. } => "device_torn_down",
            ActivityAction::CommandSent { .. } => "command_sent",
        }
    }

    pub fn data(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            ActivityAction::SessionCreated { code } => json!({ "code": code }),
            ActivityAction::Joined {
                participant_id,
                rejoin,
            } => json!({ "participantId": participant_id, "rejoin": rejoin }),
            ActivityAction::Left { was_leader } => json!({ "wasLeader": was_leader }),
            ActivityAction::SessionClosed => serde_json::Value::Null,
            ActivityAction::StateChanged { delta, seq } => json!({ "delta": delta, "seq": seq }),
            ActivityAction::Promoted { participant_id }
            | ActivityAction::Removed { participant_id } => {
                json!({ "participantId": participant_id })
            }
            ActivityAction::FollowToggled { following } => json!({ "following": following }),
            ActivityAction::DeviceLinked { code }
            | ActivityAction::DeviceConnected { code }
            | ActivityAction::DeviceTornDown { code } => json!({ "code": code }),
            ActivityAction::CommandSent {
                code,
                command_id,
                command,
            } => json!({ "code": code, "commandId": command_id, "command": command }),
        }
    }
}

pub struct ActivityLog {
    sink: Arc<dyn ActivitySink>,
    failures: AtomicU64,
}

impl ActivityLog {
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self {
            sink,
            failures: AtomicU64::new(0),
        }
    }

    /// Append one entry. Never fails the caller.
    pub async fn record(
        &self,
        session_id: Option<&SessionId>,
        user_id: &str,
        action: ActivityAction,
    ) {
        let entry = ActivityLogEntry {
            id: new_id(),
            session_id: session_id.cloned(),
            user_id: user_id.to_string(),
            action_type: action.action_type().to_string(),
            action_data: action.data(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.sink.append_activity(entry).await {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                action = action.action_type(),
                error = %e,
                "Activity log write failed"
            );
        }
    }

    /// Entries recorded against a session, oldest first.
    pub async fn entries(&self, session_id: &SessionId) -> Result<Vec<ActivityLogEntry>, SyncError> {
        self.sink.activity(Some(session_id)).await
    }

    /// Every entry, including device-link actions.
    pub async fn all_entries(&self) -> Result<Vec<ActivityLogEntry>, SyncError> {
        self.sink.activity(None).await
    }

    /// Number of writes the sink rejected since startup.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
