//! Read side of state propagation: what a participant's client runs.
//!
//! While Following, the follower holds one subscription to the session
//! topic and overwrites its local state with every newer snapshot. While
//! Independent it holds no subscription at all and keeps whatever
//! position the user navigated to.
//!
//! A follower that falls behind the channel is flagged for resync: the
//! caller re-fetches the session and hands it to
//! [`Follower::resume_following`].

use std::sync::Arc;

use tandem_common::{SessionId, TopicKey};
use tracing::{debug, trace, warn};

use super::types::StateSnapshot;
use crate::channel::{Channel, ChannelMessage, Received, Subscription};
use crate::participant::Participant;
use crate::session::SessionSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub enum FollowerEvent {
    Updated(StateSnapshot),
    /// Snapshots were dropped; local state may be behind until resynced.
    Lagged,
}

pub struct Follower {
    session_id: SessionId,
    channel: Arc<dyn Channel>,
    state: StateSnapshot,
    subscription: Option<Subscription>,
    needs_resync: bool,
}

impl Follower {
    /// Start from the snapshot returned by create/join, subscribing only
    /// if the participant is following.
    pub async fn start(
        channel: Arc<dyn Channel>,
        session: &SessionSnapshot,
        participant: &Participant,
    ) -> Self {
        let mut follower = Self {
            session_id: session.id.clone(),
            channel,
            state: session.state.clone(),
            subscription: None,
            needs_resync: false,
        };
        if participant.is_following_leader {
            follower.subscribe().await;
        }
        follower
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn state(&self) -> &StateSnapshot {
        &self.state
    }

    pub fn is_following(&self) -> bool {
        self.subscription.is_some()
    }

    /// Whether snapshots were dropped since the last resume.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Apply a received snapshot. Ignored while Independent, and ignored
    /// if it is not newer than what is already applied.
    pub fn apply(&mut self, snapshot: StateSnapshot) -> bool {
        if !self.is_following() {
            return false;
        }
        if snapshot.seq <= self.state.seq {
            trace!(
                session = %self.session_id,
                seq = snapshot.seq,
                applied = self.state.seq,
                "Dropped stale snapshot"
            );
            return false;
        }
        self.state = snapshot;
        true
    }

    /// Wait for the next snapshot that changes local state, or for a gap
    /// in delivery.
    ///
    /// Returns `None` when Independent or when the topic closes.
    pub async fn next(&mut self) -> Option<FollowerEvent> {
        loop {
            match self.subscription.as_mut()?.recv().await? {
                Received::Message(ChannelMessage::State(snapshot)) => {
                    if self.apply(snapshot) {
                        return Some(FollowerEvent::Updated(self.state.clone()));
                    }
                }
                Received::Message(_) => {}
                Received::Lagged(_) => {
                    self.mark_lagged();
                    return Some(FollowerEvent::Lagged);
                }
            }
        }
    }

    /// Apply everything already queued without waiting. Returns how many
    /// snapshots changed local state; a gap sets [`Follower::needs_resync`].
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Some(received) = self.subscription.as_mut().and_then(Subscription::try_recv) {
            match received {
                Received::Message(ChannelMessage::State(snapshot)) => {
                    if self.apply(snapshot) {
                        applied += 1;
                    }
                }
                Received::Message(_) => {}
                Received::Lagged(_) => self.mark_lagged(),
            }
        }
        applied
    }

    fn mark_lagged(&mut self) {
        self.needs_resync = true;
        warn!(session = %self.session_id, seq = self.state.seq, "Follower missed snapshots");
    }

    /// Navigate locally. Meaningful while Independent; while Following the
    /// next leader snapshot overwrites it.
    pub fn navigate(&mut self, position: u32) {
        self.state.position = position;
    }

    /// Switch to Independent: drop the subscription and keep local state.
    pub fn go_independent(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
            debug!(session = %self.session_id, "Follower went independent");
        }
    }

    /// Switch back to Following, or resync after a gap.
    ///
    /// Dropped messages are not replayed, so the caller passes a freshly
    /// fetched snapshot which replaces local state outright.
    pub async fn resume_following(&mut self, authoritative: &SessionSnapshot) {
        if self.subscription.is_none() {
            self.subscribe().await;
        }
        self.state = authoritative.state.clone();
        self.needs_resync = false;
        debug!(session = %self.session_id, seq = self.state.seq, "Follower resumed");
    }

    /// Tear down on leave.
    pub fn stop(mut self) {
        self.go_independent();
    }

    async fn subscribe(&mut self) {
        let topic = TopicKey::session(&self.session_id);
        self.subscription = Some(self.channel.subscribe(&topic).await);
    }
}
