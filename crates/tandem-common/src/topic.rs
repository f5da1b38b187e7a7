//! Typed topic keys for the publish/subscribe channel.
//!
//! A topic is `{kind, id}` rather than an interpolated string so session
//! and remote-control traffic can never share a name. The string form
//! (`session-<id>` / `remote-<code>`) exists only for the wire and logs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SyncError;
use crate::id::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    /// Leader state snapshots for one group session.
    Session,
    /// Commands addressed to one paired presentation client.
    Remote,
}

impl TopicKind {
    fn prefix(self) -> &'static str {
        match self {
            TopicKind::Session => "session",
            TopicKind::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicKey {
    pub kind: TopicKind,
    pub id: String,
}

impl TopicKey {
    pub fn session(session_id: &SessionId) -> Self {
        Self {
            kind: TopicKind::Session,
            id: session_id.as_str().to_string(),
        }
    }

    pub fn remote(device_code: &str) -> Self {
        Self {
            kind: TopicKind::Remote,
            id: device_code.to_string(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for TopicKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once('-')
            .ok_or_else(|| SyncError::Validation(format!("malformed topic '{s}'")))?;
        let kind = match prefix {
            "session" => TopicKind::Session,
            "remote" => TopicKind::Remote,
            other => {
                return Err(SyncError::Validation(format!(
                    "unknown topic kind '{other}'"
                )))
            }
        };
        if id.is_empty() {
            return Err(SyncError::Validation(format!("topic '{s}' has no id")));
        }
        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }
}
