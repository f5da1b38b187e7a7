use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codes::DeviceCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLink {
    pub code: DeviceCode,
    pub owner_id: String,
    pub device_name: String,
    pub is_active: bool,
    /// The remote currently bound to this link, if any.
    pub remote_peer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl DeviceLink {
    pub fn new(code: DeviceCode, owner_id: &str, device_name: &str) -> Self {
        let now = Utc::now();
        Self {
            code,
            owner_id: owner_id.to_string(),
            device_name: device_name.to_string(),
            is_active: true,
            remote_peer: None,
            created_at: now,
            last_seen: now,
        }
    }
}
