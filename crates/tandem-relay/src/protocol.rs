//! Relay wire protocol: one JSON object per text frame, tagged by `type`.
//!
//! The first frame must be `hello`. Every later request gets exactly one
//! reply; channel traffic from an active subscription arrives interleaved
//! as `event` frames.

use serde::{Deserialize, Serialize};
use tandem_common::{ParticipantId, SessionId, SyncError};
use tandem_sync::{
    ActivityLogEntry, ChannelMessage, Command, DeviceInfo, DeviceLink, Participant, RemoteCommand,
    SessionSnapshot, StateDelta, StateSnapshot,
};

/// First message: who this connection acts for.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Hello {
    Hello { user_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    CreateSession {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        device: DeviceInfo,
    },
    JoinSession {
        code: String,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        device: DeviceInfo,
    },
    LeaveSession { session_id: SessionId },
    CloseSession { session_id: SessionId },
    GetSession { session_id: SessionId },
    ListParticipants { session_id: SessionId },
    PromoteToCoLeader {
        session_id: SessionId,
        participant_id: ParticipantId,
    },
    RemoveParticipant {
        session_id: SessionId,
        participant_id: ParticipantId,
    },
    ToggleFollowLeader { session_id: SessionId },
    Heartbeat { session_id: SessionId },
    UpdateState {
        session_id: SessionId,
        change: StateDelta,
    },
    Activity { session_id: SessionId },
    SubscribeSession { session_id: SessionId },

    GenerateDeviceLink {
        #[serde(default)]
        device_name: String,
    },
    ConnectDevice { code: String },
    DeviceHeartbeat { code: String },
    TeardownDevice { code: String },
    SendCommand { code: String, command: RemoteCommand },
    MarkExecuted { code: String, command_id: String },
    PendingCommands { code: String },
    SubscribeDevice { code: String },

    Unsubscribe,
}

impl ClientRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ClientRequest::CreateSession { .. } => "create_session",
            ClientRequest::JoinSession { .. } => "join_session",
            ClientRequest::LeaveSession { .. } => "leave_session",
            ClientRequest::CloseSession { .. } => "close_session",
            ClientRequest::GetSession { .. } => "get_session",
            ClientRequest::ListParticipants { .. } => "list_participants",
            ClientRequest::PromoteToCoLeader { .. } => "promote_to_co_leader",
            ClientRequest::RemoveParticipant { .. } => "remove_participant",
            ClientRequest::ToggleFollowLeader { .. } => "toggle_follow_leader",
            ClientRequest::Heartbeat { .. } => "heartbeat",
            ClientRequest::UpdateState { .. } => "update_state",
            ClientRequest::Activity { .. } => "activity",
            ClientRequest::SubscribeSession { .. } => "subscribe_session",
            ClientRequest::GenerateDeviceLink { .. } => "generate_device_link",
            ClientRequest::ConnectDevice { .. } => "connect_device",
            ClientRequest::DeviceHeartbeat { .. } => "device_heartbeat",
            ClientRequest::TeardownDevice { .. } => "teardown_device",
            ClientRequest::SendCommand { .. } => "send_command",
            ClientRequest::MarkExecuted { .. } => "mark_executed",
            ClientRequest::PendingCommands { .. } => "pending_commands",
            ClientRequest::SubscribeDevice { .. } => "subscribe_device",
            ClientRequest::Unsubscribe => "unsubscribe",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerResponse {
    Ready { user_id: String },
    SessionCreated {
        session: SessionSnapshot,
        participant: Participant,
        pairing: String,
    },
    SessionJoined {
        session: SessionSnapshot,
        participant: Participant,
    },
    Session { session: SessionSnapshot },
    Participants { participants: Vec<Participant> },
    Participant { participant: Participant },
    Following { following: bool },
    State { state: StateSnapshot },
    Activity { entries: Vec<ActivityLogEntry> },
    DeviceLinked { link: DeviceLink, pairing: String },
    DeviceConnected { link: DeviceLink },
    CommandQueued { command_id: String },
    Executed { changed: bool },
    Commands { commands: Vec<Command> },
    Subscribed { topic: String },
    Ok,
    /// Traffic forwarded from the active subscription.
    Event { topic: String, message: ChannelMessage },
    /// The subscription fell behind and dropped `skipped` events. Re-fetch
    /// with `get_session` or `pending_commands`.
    Lagged { topic: String, skipped: u64 },
    Error { kind: String, message: String },
}

impl ServerResponse {
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        ServerResponse::Error {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

impl From<SyncError> for ServerResponse {
    fn from(e: SyncError) -> Self {
        ServerResponse::error(e.kind(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hello() {
        let Hello::Hello { user_id } =
            serde_json::from_str(r#"{"type":"hello","user_id":"alice"}"#).unwrap();
        assert_eq!(user_id, "alice");
    }

    #[test]
    fn parses_update_state_with_nested_change() {
        let req: ClientRequest = serde_json::from_str(
            r#"{"type":"update_state","session_id":"s1","change":{"type":"positionChanged","position":2}}"#,
        )
        .unwrap();
        match req {
            ClientRequest::UpdateState { session_id, change } => {
                assert_eq!(session_id.as_str(), "s1");
                assert_eq!(change, StateDelta::PositionChanged { position: 2 });
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn create_session_fields_default() {
        let req: ClientRequest =
            serde_json::from_str(r#"{"type":"create_session","title":"Set"}"#).unwrap();
        assert_eq!(req.name(), "create_session");
        let req: ClientRequest = serde_json::from_str(r#"{"type":"unsubscribe"}"#).unwrap();
        assert_eq!(req.name(), "unsubscribe");
    }

    #[test]
    fn parses_send_command() {
        let req: ClientRequest = serde_json::from_str(
            r#"{"type":"send_command","code":"AB3X7K9QZ","command":{"type":"togglePlay"}}"#,
        )
        .unwrap();
        assert!(matches!(
            req,
            ClientRequest::SendCommand { command: RemoteCommand::TogglePlay, .. }
        ));
    }

    #[test]
    fn lag_notice_names_topic() {
        let json = serde_json::to_value(ServerResponse::Lagged {
            topic: "remote-AB3X7K9QZ".into(),
            skipped: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "lagged");
        assert_eq!(json["topic"], "remote-AB3X7K9QZ");
        assert_eq!(json["skipped"], 3);
    }

    #[test]
    fn errors_carry_kind() {
        let json = serde_json::to_value(ServerResponse::from(SyncError::Unauthorized(
            "nope".into(),
        )))
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["kind"], "unauthorized");
    }
}
