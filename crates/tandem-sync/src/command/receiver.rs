//! Presentation-side command consumer.

use std::collections::{HashSet, VecDeque};

use tandem_common::SyncError;
use tracing::{debug, info, warn};

use super::relay::CommandRelay;
use super::types::{CommandMessage, RemoteCommand};
use crate::channel::{ChannelMessage, Received, Subscription};
use crate::codes::DeviceCode;

/// Executes commands on the presentation client.
///
/// The transport may deliver a command twice or out of order. The
/// receiver filters the duplicates it can see, but handlers should still
/// be safe to repeat.
pub trait CommandHandler: Send {
    fn handle(&mut self, command: &RemoteCommand);
}

impl<F> CommandHandler for F
where
    F: FnMut(&RemoteCommand) + Send,
{
    fn handle(&mut self, command: &RemoteCommand) {
        self(command)
    }
}

/// Ids of recently executed commands. Anything older falls back to the
/// store's executed flag.
const SEEN_CAPACITY: usize = 256;

#[derive(Default)]
struct SeenIds {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenIds {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: &str) {
        if !self.ids.insert(id.to_string()) {
            return;
        }
        self.order.push_back(id.to_string());
        if self.order.len() > SEEN_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

pub struct CommandReceiver {
    relay: CommandRelay,
    code: DeviceCode,
    subscription: Subscription,
    seen: SeenIds,
}

impl CommandReceiver {
    /// Subscribe to the device's own topic. Fails if the link is not active.
    pub async fn start(relay: CommandRelay, code: DeviceCode) -> Result<Self, SyncError> {
        let subscription = relay.subscribe(&code).await?;
        info!(code = %code, "Command receiver started");
        Ok(Self {
            relay,
            code,
            subscription,
            seen: SeenIds::default(),
        })
    }

    pub fn code(&self) -> &DeviceCode {
        &self.code
    }

    /// Run one delivered command unless it already ran. Returns whether
    /// the handler was invoked.
    pub async fn process(
        &mut self,
        message: &CommandMessage,
        handler: &mut dyn CommandHandler,
    ) -> Result<bool, SyncError> {
        if self.seen.contains(&message.id) {
            debug!(code = %self.code, id = %message.id, "Duplicate delivery ignored");
            return Ok(false);
        }
        let stored = self.relay.command(&message.id).await?;
        if stored.executed {
            self.seen.insert(&message.id);
            return Ok(false);
        }

        handler.handle(&stored.command);
        // Only a recorded execution suppresses redelivery; if marking fails
        // the command stays pending and `catch_up` retries it.
        self.relay.mark_executed(&self.code, &message.id).await?;
        self.seen.insert(&message.id);
        debug!(code = %self.code, id = %message.id, command = stored.command.name(), "Command executed");
        Ok(true)
    }

    /// Wait for and process the next delivery. Returns how many commands
    /// the handler ran, which is zero for a duplicate. If the subscription
    /// fell behind, runs everything still pending instead. `None` once the
    /// topic closes.
    pub async fn next(
        &mut self,
        handler: &mut dyn CommandHandler,
    ) -> Option<Result<usize, SyncError>> {
        loop {
            match self.subscription.recv().await? {
                Received::Message(ChannelMessage::Command(message)) => {
                    return Some(self.process(&message, handler).await.map(usize::from));
                }
                Received::Message(_) => {}
                Received::Lagged(skipped) => {
                    warn!(code = %self.code, skipped, "Command receiver lagged, catching up");
                    return Some(self.catch_up(handler).await);
                }
            }
        }
    }

    /// Run everything still pending in the store, e.g. commands sent while
    /// this client was disconnected. Returns how many ran.
    pub async fn catch_up(&mut self, handler: &mut dyn CommandHandler) -> Result<usize, SyncError> {
        let pending = self.relay.pending(&self.code).await?;
        let mut executed = 0;
        for command in pending {
            if self.process(&command.message(), handler).await? {
                executed += 1;
            }
        }
        if executed > 0 {
            info!(code = %self.code, executed, "Caught up on pending commands");
        }
        Ok(executed)
    }

    pub fn stop(self) {
        self.subscription.close();
        info!(code = %self.code, "Command receiver stopped");
    }
}
