//! The realtime propagation seam.
//!
//! The contract assumed of any [`Channel`]: at-least-once delivery, order
//! preserved per topic, and no replay across a reconnect. A client that
//! resubscribes must re-fetch the authoritative snapshot instead of
//! waiting for missed messages.

mod local;

pub use local::LocalChannel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tandem_common::TopicKey;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use crate::broadcast::StateSnapshot;
use crate::command::CommandMessage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelMessage {
    State(StateSnapshot),
    Command(CommandMessage),
}

#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish to every current subscriber of `topic`. Returns how many
    /// subscribers the message reached.
    async fn publish(&self, topic: &TopicKey, message: ChannelMessage) -> usize;

    async fn subscribe(&self, topic: &TopicKey) -> Subscription;
}

/// One step of a subscription's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Message(ChannelMessage),
    /// The subscriber fell behind and this many messages were dropped.
    /// Anything derived from the stream must be re-fetched from the store.
    Lagged(u64),
}

type CloseHook = Box<dyn FnOnce() + Send + Sync>;

/// A live subscription to one topic. Dropping it (or calling
/// [`Subscription::close`]) unsubscribes.
pub struct Subscription {
    topic: TopicKey,
    rx: broadcast::Receiver<ChannelMessage>,
    on_close: Option<CloseHook>,
}

impl Subscription {
    pub fn new(topic: TopicKey, rx: broadcast::Receiver<ChannelMessage>) -> Self {
        debug!(topic = %topic, "Subscribed");
        Self {
            topic,
            rx,
            on_close: None,
        }
    }

    /// Run `hook` when the subscription is dropped, while its receiver is
    /// still counted by the sender.
    pub fn with_close_hook(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub fn topic(&self) -> &TopicKey {
        &self.topic
    }

    /// Wait for the next message. Returns `None` once the topic is gone.
    pub async fn recv(&mut self) -> Option<Received> {
        match self.rx.recv().await {
            Ok(message) => Some(Received::Message(message)),
            Err(RecvError::Lagged(skipped)) => {
                warn!(topic = %self.topic, skipped, "Subscriber lagged, messages dropped");
                Some(Received::Lagged(skipped))
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Take the next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<Received> {
        match self.rx.try_recv() {
            Ok(message) => Some(Received::Message(message)),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(topic = %self.topic, skipped, "Subscriber lagged, messages dropped");
                Some(Received::Lagged(skipped))
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Unsubscribe now.
    pub fn close(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(topic = %self.topic, "Unsubscribed");
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}
