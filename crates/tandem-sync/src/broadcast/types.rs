use serde::{Deserialize, Serialize};
use tandem_common::SyncError;

use crate::session::Session;

/// Broadcast payload on `session-<id>`: `{documentId, position, isPlaying}`
/// plus the sequence number followers use to drop stale snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub document_id: Option<String>,
    pub position: u32,
    pub is_playing: bool,
    #[serde(default)]
    pub seq: u64,
}

/// One leader-side change. Applying it is a plain overwrite of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateDelta {
    DocumentChanged {
        #[serde(rename = "documentId")]
        document_id: String,
    },
    PositionChanged {
        position: u32,
    },
    PlayStateChanged {
        #[serde(rename = "isPlaying")]
        is_playing: bool,
    },
}

impl StateDelta {
    pub fn validate(&self) -> Result<(), SyncError> {
        match self {
            StateDelta::DocumentChanged { document_id } if document_id.trim().is_empty() => Err(
                SyncError::Validation("document id must not be empty".into()),
            ),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, session: &mut Session) {
        match self {
            StateDelta::DocumentChanged { document_id } => {
                session.current_document_id = Some(document_id.clone());
            }
            StateDelta::PositionChanged { position } => session.current_position = *position,
            StateDelta::PlayStateChanged { is_playing } => session.is_playing = *is_playing,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StateDelta::DocumentChanged { .. } => "documentChanged",
            StateDelta::PositionChanged { .. } => "positionChanged",
            StateDelta::PlayStateChanged { .. } => "playStateChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_wire_format() {
        let delta: StateDelta =
            serde_json::from_str(r#"{"type":"positionChanged","position":2}"#).unwrap();
        assert_eq!(delta, StateDelta::PositionChanged { position: 2 });

        let json = serde_json::to_value(StateDelta::DocumentChanged {
            document_id: "doc-7".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "documentChanged");
        assert_eq!(json["documentId"], "doc-7");
    }

    #[test]
    fn snapshot_wire_format() {
        let snapshot = StateSnapshot {
            document_id: Some("doc-7".into()),
            position: 3,
            is_playing: true,
            seq: 9,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["documentId"], "doc-7");
        assert_eq!(json["position"], 3);
        assert_eq!(json["isPlaying"], true);
    }

    #[test]
    fn blank_document_is_rejected() {
        let delta = StateDelta::DocumentChanged {
            document_id: "  ".into(),
        };
        assert!(matches!(delta.validate(), Err(SyncError::Validation(_))));
        assert!(StateDelta::PlayStateChanged { is_playing: false }
            .validate()
            .is_ok());
    }
}
