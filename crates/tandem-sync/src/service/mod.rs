//! One handle over every registry, sharing a store, channel and log.

use std::sync::Arc;

use tandem_common::SyncError;
use tandem_config::TandemConfig;
use tracing::info;

use crate::activity::{ActivityLog, ActivitySink};
use crate::broadcast::{Follower, StateBroadcaster};
use crate::channel::{Channel, LocalChannel};
use crate::codes::{CodeSource, DeviceCode, SessionCode};
use crate::command::{CommandReceiver, CommandRelay};
use crate::device::{DeviceLinkRegistry, HeartbeatTask};
use crate::participant::{Participant, ParticipantRegistry};
use crate::session::{SessionRegistry, SessionSnapshot};
use crate::store::{MemoryStore, Store};

#[derive(Clone)]
pub struct SyncService {
    pub sessions: SessionRegistry,
    pub participants: ParticipantRegistry,
    pub broadcaster: StateBroadcaster,
    pub devices: DeviceLinkRegistry,
    pub commands: CommandRelay,
    pub activity: Arc<ActivityLog>,
    pub channel: Arc<dyn Channel>,
    pub config: TandemConfig,
}

impl SyncService {
    pub fn new<S>(store: Arc<S>, channel: Arc<dyn Channel>, config: TandemConfig) -> Self
    where
        S: Store + ActivitySink + 'static,
    {
        Self::with_code_sources(
            store,
            channel,
            config,
            Arc::new(SessionCode::generate),
            Arc::new(DeviceCode::generate),
        )
    }

    /// Like [`SyncService::new`] with the random code generators replaced.
    pub fn with_code_sources<S>(
        store: Arc<S>,
        channel: Arc<dyn Channel>,
        config: TandemConfig,
        session_codes: CodeSource<SessionCode>,
        device_codes: CodeSource<DeviceCode>,
    ) -> Self
    where
        S: Store + ActivitySink + 'static,
    {
        let activity = Arc::new(ActivityLog::new(store.clone()));
        let store: Arc<dyn Store> = store;

        let sessions =
            SessionRegistry::new(store.clone(), activity.clone(), config.sessions.clone())
                .with_code_source(session_codes);
        let participants = ParticipantRegistry::new(sessions.clone(), store.clone());
        let broadcaster = StateBroadcaster::new(
            sessions.clone(),
            participants.clone(),
            store.clone(),
            channel.clone(),
        );
        let devices =
            DeviceLinkRegistry::new(store.clone(), activity.clone(), config.devices.clone())
                .with_code_source(device_codes);
        let commands = CommandRelay::new(devices.clone(), store, channel.clone(), activity.clone());

        info!(
            channel_capacity = config.channel.capacity,
            heartbeat_interval_secs = config.devices.heartbeat_interval_secs,
            "Sync service ready"
        );
        Self {
            sessions,
            participants,
            broadcaster,
            devices,
            commands,
            activity,
            channel,
            config,
        }
    }

    /// Everything in-process: a [`MemoryStore`] and a [`LocalChannel`].
    pub fn in_memory(config: TandemConfig) -> Self {
        let channel = Arc::new(LocalChannel::new(config.channel.capacity));
        Self::new(Arc::new(MemoryStore::new()), channel, config)
    }

    /// Client-side follower for a participant that just created or joined.
    pub async fn follow(&self, session: &SessionSnapshot, participant: &Participant) -> Follower {
        Follower::start(self.channel.clone(), session, participant).await
    }

    /// Presentation-side receiver for a device link.
    pub async fn receive_commands(&self, code: &DeviceCode) -> Result<CommandReceiver, SyncError> {
        CommandReceiver::start(self.commands.clone(), code.clone()).await
    }

    /// Keep `code` alive at the configured interval.
    pub fn spawn_heartbeat(&self, code: &DeviceCode) -> HeartbeatTask {
        HeartbeatTask::spawn(
            self.devices.clone(),
            code.clone(),
            self.devices.heartbeat_interval(),
        )
    }
}
