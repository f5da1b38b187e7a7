//! Background `last_seen` refresh for a live presentation client.
//!
//! There is no reaping of stale links. A client that crashes without
//! tearing down leaves its link active; the heartbeat only makes that
//! visible through `last_seen`.

use std::time::Duration;

use tandem_common::SyncError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::registry::DeviceLinkRegistry;
use crate::codes::DeviceCode;

/// Handle to a running heartbeat. Dropping it stops the task.
pub struct HeartbeatTask {
    code: DeviceCode,
    handle: JoinHandle<()>,
}

impl HeartbeatTask {
    /// Start refreshing `code` every `interval`. The first refresh is
    /// immediate. The task ends by itself once the link is torn down.
    pub fn spawn(registry: DeviceLinkRegistry, code: DeviceCode, interval: Duration) -> Self {
        let task_code = code.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match registry.heartbeat(&task_code).await {
                    Ok(_) => {}
                    Err(SyncError::NotFound(_)) => {
                        info!(code = %task_code, "Device link gone, heartbeat stopped");
                        break;
                    }
                    Err(e) => {
                        warn!(code = %task_code, error = %e, "Device heartbeat failed");
                    }
                }
            }
        });
        debug!(code = %code, interval_secs = interval.as_secs(), "Heartbeat started");
        Self { code, handle }
    }

    pub fn code(&self) -> &DeviceCode {
        &self.code
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) {
        // Drop aborts.
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};
    use tandem_config::DevicesConfig;

    use super::*;
    use crate::activity::ActivityLog;
    use crate::store::{MemoryStore, Store};

    const INTERVAL: Duration = Duration::from_secs(30);

    async fn setup() -> (DeviceLinkRegistry, MemoryStore, DeviceCode) {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let log = Arc::new(ActivityLog::new(shared.clone()));
        let registry = DeviceLinkRegistry::new(shared, log, DevicesConfig::default());
        let link = registry
            .generate_device_link("alice", "Projector")
            .await
            .unwrap();

        let mut stale = link.clone();
        stale.last_seen = Utc::now() - ChronoDuration::hours(1);
        store.update_device_link(&stale).await.unwrap();
        (registry, store, link.code)
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_last_seen() {
        let (registry, store, code) = setup().await;
        let before = store.device_link(&code).await.unwrap().unwrap().last_seen;

        let task = HeartbeatTask::spawn(registry, code.clone(), INTERVAL);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let after = store.device_link(&code).await.unwrap().unwrap().last_seen;
        assert!(after > before);
        assert!(!task.is_finished());
        task.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn ends_after_teardown() {
        let (registry, _store, code) = setup().await;
        let task = HeartbeatTask::spawn(registry.clone(), code.clone(), INTERVAL);
        tokio::time::sleep(Duration::from_millis(10)).await;

        registry.teardown(&code, "alice").await.unwrap();
        tokio::time::sleep(INTERVAL * 2).await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_aborts() {
        let (registry, store, code) = setup().await;
        let task = HeartbeatTask::spawn(registry, code.clone(), INTERVAL);
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(task);

        let mut stale = store.device_link(&code).await.unwrap().unwrap();
        stale.last_seen = Utc::now() - ChronoDuration::hours(1);
        store.update_device_link(&stale).await.unwrap();

        tokio::time::sleep(INTERVAL * 3).await;
        let seen = store.device_link(&code).await.unwrap().unwrap().last_seen;
        assert_eq!(seen, stale.last_seen);
    }
}
