//! Sending side of remote control.

use std::sync::Arc;

use tandem_common::{SyncError, TopicKey};
use tracing::{debug, warn};

use super::types::{Command, RemoteCommand};
use crate::activity::{ActivityAction, ActivityLog};
use crate::channel::{Channel, ChannelMessage, Subscription};
use crate::codes::DeviceCode;
use crate::device::DeviceLinkRegistry;
use crate::store::Store;

#[derive(Clone)]
pub struct CommandRelay {
    devices: DeviceLinkRegistry,
    store: Arc<dyn Store>,
    channel: Arc<dyn Channel>,
    log: Arc<ActivityLog>,
}

impl CommandRelay {
    pub fn new(
        devices: DeviceLinkRegistry,
        store: Arc<dyn Store>,
        channel: Arc<dyn Channel>,
        log: Arc<ActivityLog>,
    ) -> Self {
        Self {
            devices,
            store,
            channel,
            log,
        }
    }

    /// Persist a command for `code` and publish it on that device's topic.
    ///
    /// Returns the command id. Fire-and-forget: the sender is never told
    /// whether the presentation client received or ran it. Poll
    /// [`CommandRelay::command`] for the executed flag if that matters.
    pub async fn send_command(
        &self,
        code: &str,
        sender_id: &str,
        command: RemoteCommand,
    ) -> Result<String, SyncError> {
        command.validate()?;
        let code = DeviceCode::parse(code)?;
        self.devices.active_link(&code).await?;

        let row = Command::new(code.clone(), command);
        self.store.insert_command(row.clone()).await?;

        let topic = TopicKey::remote(code.as_str());
        let receivers = self
            .channel
            .publish(&topic, ChannelMessage::Command(row.message()))
            .await;
        if receivers == 0 {
            warn!(
                code = %code,
                command = row.command.name(),
                id = %row.id,
                "No presentation client listening; command stays pending until catch-up"
            );
        }

        self.log
            .record(
                None,
                sender_id,
                ActivityAction::CommandSent {
                    code: code.clone(),
                    command_id: row.id.clone(),
                    command: row.command.clone(),
                },
            )
            .await;
        debug!(code = %code, command = row.command.name(), id = %row.id, receivers, "Command sent");
        Ok(row.id)
    }

    /// Flip a command's executed flag. Returns `false` if it was already set.
    pub async fn mark_executed(&self, code: &DeviceCode, id: &str) -> Result<bool, SyncError> {
        let command = self.command(id).await?;
        if &command.device_code != code {
            return Err(SyncError::NotFound(format!("command {id} for device {code}")));
        }
        self.store.mark_command_executed(id).await
    }

    /// Commands for `code` not yet executed, oldest first.
    pub async fn pending(&self, code: &DeviceCode) -> Result<Vec<Command>, SyncError> {
        let mut pending: Vec<Command> = self
            .store
            .commands_for(code)
            .await?
            .into_iter()
            .filter(|c| !c.executed)
            .collect();
        pending.sort_by_key(|c| c.created_at);
        Ok(pending)
    }

    pub async fn command(&self, id: &str) -> Result<Command, SyncError> {
        self.store
            .command(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("command {id}")))
    }

    pub(crate) async fn subscribe(&self, code: &DeviceCode) -> Result<Subscription, SyncError> {
        self.devices.active_link(code).await?;
        Ok(self
            .channel
            .subscribe(&TopicKey::remote(code.as_str()))
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{LocalChannel, Received};
    use crate::store::MemoryStore;
    use tandem_config::DevicesConfig;

    async fn setup() -> (CommandRelay, DeviceLinkRegistry, Arc<LocalChannel>) {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(ActivityLog::new(store.clone()));
        let devices = DeviceLinkRegistry::new(store.clone(), log.clone(), DevicesConfig::default());
        let channel = Arc::new(LocalChannel::new(16));
        let relay = CommandRelay::new(devices.clone(), store, channel.clone(), log);
        (relay, devices, channel)
    }

    #[tokio::test]
    async fn command_is_stored_unexecuted_and_published() {
        let (relay, devices, channel) = setup().await;
        let link = devices.generate_device_link("alice", "A").await.unwrap();
        let mut sub = channel.subscribe(&TopicKey::remote(link.code.as_str())).await;

        let id = relay
            .send_command(link.code.as_str(), "phone", RemoteCommand::TogglePlay)
            .await
            .unwrap();
        let stored = relay.command(&id).await.unwrap();
        assert!(!stored.executed);

        match sub.recv().await {
            Some(Received::Message(ChannelMessage::Command(msg))) => {
                assert_eq!(msg.id, id);
                assert_eq!(msg.command, RemoteCommand::TogglePlay);
            }
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn command_only_reaches_its_own_device() {
        let (relay, devices, channel) = setup().await;
        let d = devices.generate_device_link("alice", "D").await.unwrap();
        let e = devices.generate_device_link("bob", "E").await.unwrap();
        let mut on_d = channel.subscribe(&TopicKey::remote(d.code.as_str())).await;
        let mut on_e = channel.subscribe(&TopicKey::remote(e.code.as_str())).await;

        relay
            .send_command(d.code.as_str(), "phone", RemoteCommand::NextPosition)
            .await
            .unwrap();
        assert!(on_d.try_recv().is_some());
        assert!(on_e.try_recv().is_none());
        assert!(relay.pending(&e.code).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inactive_or_unknown_device_is_not_found() {
        let (relay, devices, _) = setup().await;
        let err = relay
            .send_command("AB3X7K9QZ", "phone", RemoteCommand::TogglePlay)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));

        let link = devices.generate_device_link("alice", "A").await.unwrap();
        devices.teardown(&link.code, "alice").await.unwrap();
        let err = relay
            .send_command(link.code.as_str(), "phone", RemoteCommand::TogglePlay)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_command_is_rejected_before_lookup() {
        let (relay, _, _) = setup().await;
        let err = relay
            .send_command(
                "AB3X7K9QZ",
                "phone",
                RemoteCommand::SelectDocument { id: " ".into() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[tokio::test]
    async fn sending_without_listener_still_persists() {
        let (relay, devices, _) = setup().await;
        let link = devices.generate_device_link("alice", "A").await.unwrap();
        relay
            .send_command(link.code.as_str(), "phone", RemoteCommand::GoToPosition { number: 3 })
            .await
            .unwrap();
        relay
            .send_command(link.code.as_str(), "phone", RemoteCommand::TogglePlay)
            .await
            .unwrap();

        let pending = relay.pending(&link.code).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].command, RemoteCommand::GoToPosition { number: 3 });
    }

    #[tokio::test]
    async fn mark_executed_is_monotonic_and_scoped_to_device() {
        let (relay, devices, _) = setup().await;
        let d = devices.generate_device_link("alice", "D").await.unwrap();
        let e = devices.generate_device_link("bob", "E").await.unwrap();
        let id = relay
            .send_command(d.code.as_str(), "phone", RemoteCommand::TogglePlay)
            .await
            .unwrap();

        assert!(matches!(
            relay.mark_executed(&e.code, &id).await,
            Err(SyncError::NotFound(_))
        ));
        assert!(relay.mark_executed(&d.code, &id).await.unwrap());
        assert!(!relay.mark_executed(&d.code, &id).await.unwrap());
        assert!(relay.command(&id).await.unwrap().executed);
        assert!(relay.pending(&d.code).await.unwrap().is_empty());
    }
}
