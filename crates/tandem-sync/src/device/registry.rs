//! Device link registry: generate, connect, heartbeat, teardown.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tandem_common::SyncError;
use tandem_config::DevicesConfig;
use tracing::{debug, info, warn};

use super::types::DeviceLink;
use crate::activity::{ActivityAction, ActivityLog};
use crate::codes::{CodeSource, DeviceCode};
use crate::store::Store;

#[derive(Clone)]
pub struct DeviceLinkRegistry {
    store: Arc<dyn Store>,
    log: Arc<ActivityLog>,
    config: DevicesConfig,
    codes: CodeSource<DeviceCode>,
}

impl DeviceLinkRegistry {
    pub fn new(store: Arc<dyn Store>, log: Arc<ActivityLog>, config: DevicesConfig) -> Self {
        Self {
            store,
            log,
            config,
            codes: Arc::new(DeviceCode::generate),
        }
    }

    /// Replace the random code generator.
    pub fn with_code_source(mut self, codes: CodeSource<DeviceCode>) -> Self {
        self.codes = codes;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.config.heartbeat_interval_secs)
    }

    /// Issue a fresh active link for a presentation client.
    pub async fn generate_device_link(
        &self,
        owner_id: &str,
        device_name: &str,
    ) -> Result<DeviceLink, SyncError> {
        if owner_id.trim().is_empty() {
            return Err(SyncError::Validation("owner id must not be empty".into()));
        }

        let attempts = self.config.code_attempts.max(1);
        for attempt in 1..=attempts {
            let link = DeviceLink::new((self.codes)(), owner_id, device_name.trim());
            match self.store.insert_device_link(link.clone()).await {
                Ok(()) => {
                    self.log
                        .record(
                            None,
                            owner_id,
                            ActivityAction::DeviceLinked {
                                code: link.code.clone(),
                            },
                        )
                        .await;
                    info!(code = %link.code, owner = owner_id, "Device link generated");
                    return Ok(link);
                }
                Err(SyncError::Conflict(_)) => {
                    debug!(attempt, code = %link.code, "Device code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts, "No free device code");
        Err(SyncError::Conflict(format!(
            "no free device code after {attempts} attempts"
        )))
    }

    /// Bind `remote_id` as the remote peer of an active link.
    ///
    /// A link has one remote at a time; connecting again replaces it.
    pub async fn connect(&self, code: &str, remote_id: &str) -> Result<DeviceLink, SyncError> {
        if remote_id.trim().is_empty() {
            return Err(SyncError::Validation("remote id must not be empty".into()));
        }
        let code = DeviceCode::parse(code)?;
        let mut link = self.active_link(&code).await?;

        if let Some(previous) = link.remote_peer.as_deref().filter(|p| *p != remote_id) {
            info!(code = %code, previous, remote = remote_id, "Remote replaced");
        }
        link.remote_peer = Some(remote_id.to_string());
        self.store.update_device_link(&link).await?;

        self.log
            .record(
                None,
                remote_id,
                ActivityAction::DeviceConnected { code: code.clone() },
            )
            .await;
        info!(code = %code, remote = remote_id, "Remote connected");
        Ok(link)
    }

    /// Refresh `last_seen` on an active link.
    pub async fn heartbeat(&self, code: &DeviceCode) -> Result<DateTime<Utc>, SyncError> {
        let mut link = self.active_link(code).await?;
        link.last_seen = Utc::now();
        self.store.update_device_link(&link).await?;
        debug!(code = %code, "Device heartbeat");
        Ok(link.last_seen)
    }

    /// Deactivate a link. Owner only. The code becomes reusable.
    pub async fn teardown(&self, code: &DeviceCode, owner_id: &str) -> Result<(), SyncError> {
        let mut link = self.active_link(code).await?;
        if link.owner_id != owner_id {
            return Err(SyncError::Unauthorized(
                "only the owner can tear down a device link".into(),
            ));
        }
        link.is_active = false;
        link.remote_peer = None;
        self.store.update_device_link(&link).await?;

        self.log
            .record(
                None,
                owner_id,
                ActivityAction::DeviceTornDown { code: code.clone() },
            )
            .await;
        info!(code = %code, "Device link torn down");
        Ok(())
    }

    /// Look up a link, active or not.
    pub async fn get(&self, code: &DeviceCode) -> Result<DeviceLink, SyncError> {
        self.store
            .device_link(code)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("device link {code}")))
    }

    pub(crate) async fn active_link(&self, code: &DeviceCode) -> Result<DeviceLink, SyncError> {
        self.store
            .device_link(code)
            .await?
            .filter(|l| l.is_active)
            .ok_or_else(|| SyncError::NotFound(format!("no active device link with code {code}")))
    }
}
