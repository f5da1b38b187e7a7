//! In-process channel over `tokio::sync::broadcast`, one sender per topic.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tandem_common::TopicKey;
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

use super::{Channel, ChannelMessage, Subscription};

type TopicMap = RwLock<HashMap<TopicKey, broadcast::Sender<ChannelMessage>>>;

#[derive(Clone)]
pub struct LocalChannel {
    capacity: usize,
    topics: Arc<TopicMap>,
}

impl LocalChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of topics with at least one sender registered.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Channel for LocalChannel {
    async fn publish(&self, topic: &TopicKey, message: ChannelMessage) -> usize {
        let sender = match self.topics.read().await.get(topic) {
            Some(sender) => sender.clone(),
            None => return 0,
        };
        match sender.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                // Every subscriber is gone; drop the topic.
                let mut topics = self.topics.write().await;
                if topics.get(topic).is_some_and(|s| s.receiver_count() == 0) {
                    topics.remove(topic);
                    trace!(topic = %topic, "Pruned idle topic");
                }
                0
            }
        }
    }

    async fn subscribe(&self, topic: &TopicKey) -> Subscription {
        let mut topics = self.topics.write().await;
        // Catch topics whose last subscriber dropped while the map was busy.
        topics.retain(|key, sender| {
            let live = sender.receiver_count() > 0;
            if !live {
                trace!(topic = %key, "Pruned idle topic");
            }
            live
        });
        let rx = topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        let weak = Arc::downgrade(&self.topics);
        let key = topic.clone();
        Subscription::new(topic.clone(), rx).with_close_hook(move || release(&weak, &key))
    }
}

/// Drop `topic` if the closing subscription is its last receiver. Skipped
/// when the map is locked; the next `subscribe` sweeps it.
fn release(topics: &Weak<TopicMap>, topic: &TopicKey) {
    let Some(topics) = topics.upgrade() else {
        return;
    };
    let Ok(mut topics) = topics.try_write() else {
        return;
    };
    if topics.get(topic).is_some_and(|s| s.receiver_count() <= 1) {
        topics.remove(topic);
        trace!(topic = %topic, "Pruned idle topic");
    }
}
