use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandem_common::{ParticipantId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Leader,
    CoLeader,
    Member,
}

impl Role {
    /// Leaders and co-leaders may write session state.
    pub fn can_write_state(self) -> bool {
        matches!(self, Role::Leader | Role::CoLeader)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowMode {
    Following,
    Independent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Web,
    #[default]
    #[serde(other)]
    Unknown,
}

/// What a client reports about itself when joining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_name: String,
    pub device_type: DeviceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub session_id: SessionId,
    pub user_id: String,
    pub device_name: String,
    pub device_type: DeviceType,
    pub is_co_leader: bool,
    pub is_following_leader: bool,
    pub connection_status: ConnectionStatus,
    pub joined_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Participant {
    /// A fresh member: not a co-leader, following the leader, online.
    pub fn new(session_id: &SessionId, user_id: &str, device: DeviceInfo) -> Self {
        let now = Utc::now();
        Self {
            id: ParticipantId::new(),
            session_id: session_id.clone(),
            user_id: user_id.to_string(),
            device_name: device.device_name,
            device_type: device.device_type,
            is_co_leader: false,
            is_following_leader: true,
            connection_status: ConnectionStatus::Online,
            joined_at: now,
            last_seen: now,
        }
    }

    pub fn role(&self, leader_id: &str) -> Role {
        if self.user_id == leader_id {
            Role::Leader
        } else if self.is_co_leader {
            Role::CoLeader
        } else {
            Role::Member
        }
    }

    pub fn mode(&self) -> FollowMode {
        if self.is_following_leader {
            FollowMode::Following
        } else {
            FollowMode::Independent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Participant {
        Participant::new(&SessionId::from("s1"), "bob", DeviceInfo::default())
    }

    #[test]
    fn new_participant_is_following_member() {
        let p = member();
        assert_eq!(p.role("alice"), Role::Member);
        assert_eq!(p.mode(), FollowMode::Following);
        assert_eq!(p.connection_status, ConnectionStatus::Online);
    }

    #[test]
    fn role_follows_leader_id_then_co_leader_flag() {
        let mut p = member();
        assert_eq!(p.role("bob"), Role::Leader);
        p.is_co_leader = true;
        assert_eq!(p.role("alice"), Role::CoLeader);
        assert!(p.role("alice").can_write_state());
        assert!(!Role::Member.can_write_state());
    }

    #[test]
    fn unknown_device_type_deserializes() {
        let info: DeviceInfo =
            serde_json::from_str(r#"{"deviceName":"Den TV","deviceType":"smart_fridge"}"#).unwrap();
        assert_eq!(info.device_type, DeviceType::Unknown);
        assert_eq!(info.device_name, "Den TV");
    }

    #[test]
    fn participant_serializes_camel_case() {
        let json = serde_json::to_value(member()).unwrap();
        assert_eq!(json["isFollowingLeader"], true);
        assert_eq!(json["isCoLeader"], false);
        assert_eq!(json["userId"], "bob");
    }
}
