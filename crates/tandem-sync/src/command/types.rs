use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_common::{new_id, SyncError};

use crate::codes::DeviceCode;

/// Command payload, `{type, data}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RemoteCommand {
    SelectDocument { id: String },
    GoToPosition { number: u32 },
    NextPosition,
    PreviousPosition,
    TogglePlay,
}

impl RemoteCommand {
    pub fn validate(&self) -> Result<(), SyncError> {
        match self {
            RemoteCommand::SelectDocument { id } if id.trim().is_empty() => Err(
                SyncError::Validation("selectDocument needs a document id".into()),
            ),
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RemoteCommand::SelectDocument { .. } => "selectDocument",
            RemoteCommand::GoToPosition { .. } => "goToPosition",
            RemoteCommand::NextPosition => "nextPosition",
            RemoteCommand::PreviousPosition => "previousPosition",
            RemoteCommand::TogglePlay => "togglePlay",
        }
    }
}

/// A persisted command row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: String,
    pub device_code: DeviceCode,
    pub command: RemoteCommand,
    /// Only ever goes from false to true.
    pub executed: bool,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Command {
    pub fn new(device_code: DeviceCode, command: RemoteCommand) -> Self {
        Self {
            id: new_id(),
            device_code,
            command,
            executed: false,
            created_at: Utc::now(),
            executed_at: None,
        }
    }

    pub fn message(&self) -> CommandMessage {
        CommandMessage {
            id: self.id.clone(),
            command: self.command.clone(),
        }
    }
}

/// What travels on the remote topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub id: String,
    pub command: RemoteCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_format() {
        let json = serde_json::to_value(RemoteCommand::GoToPosition { number: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "goToPosition", "data": {"number": 4}}));

        let json = serde_json::to_value(RemoteCommand::SelectDocument { id: "d1".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "selectDocument", "data": {"id": "d1"}}));
    }

    #[test]
    fn unit_commands_parse_without_data() {
        let cmd: RemoteCommand = serde_json::from_str(r#"{"type":"togglePlay"}"#).unwrap();
        assert_eq!(cmd, RemoteCommand::TogglePlay);
        let cmd: RemoteCommand = serde_json::from_str(r#"{"type":"previousPosition"}"#).unwrap();
        assert_eq!(cmd.name(), "previousPosition");
    }

    #[test]
    fn unknown_command_type_is_rejected() {
        assert!(serde_json::from_str::<RemoteCommand>(r#"{"type":"selfDestruct"}"#).is_err());
    }

    #[test]
    fn select_document_requires_id() {
        let cmd = RemoteCommand::SelectDocument { id: String::new() };
        assert!(matches!(cmd.validate(), Err(SyncError::Validation(_))));
    }

    #[test]
    fn new_command_is_unexecuted() {
        let code = DeviceCode::parse("AB3X7K9QZ").unwrap();
        let cmd = Command::new(code, RemoteCommand::NextPosition);
        assert!(!cmd.executed);
        assert!(cmd.executed_at.is_none());
        assert_eq!(cmd.message().id, cmd.id);
    }
}
