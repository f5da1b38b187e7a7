//! Participant registry: listing, promotion, removal, follow toggling,
//! presence, and the write-authorization check the broadcaster relies on.

use std::sync::Arc;

use chrono::Utc;
use tandem_common::{ParticipantId, SessionId, SyncError};
use tracing::info;

use super::types::{ConnectionStatus, Participant, Role};
use crate::activity::{ActivityAction, ActivityLog};
use crate::session::{Session, SessionRegistry};
use crate::store::Store;

#[derive(Clone)]
pub struct ParticipantRegistry {
    sessions: SessionRegistry,
    store: Arc<dyn Store>,
    log: Arc<ActivityLog>,
}

impl ParticipantRegistry {
    pub fn new(sessions: SessionRegistry, store: Arc<dyn Store>) -> Self {
        let log = Arc::clone(sessions.log());
        Self {
            sessions,
            store,
            log,
        }
    }

    pub async fn list_participants(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Participant>, SyncError> {
        self.sessions.active_session(session_id).await?;
        self.store.participants(session_id).await
    }

    /// Grant co-leadership. Only the original leader may call this.
    pub async fn promote_to_co_leader(
        &self,
        session_id: &SessionId,
        caller_id: &str,
        participant_id: &ParticipantId,
    ) -> Result<Participant, SyncError> {
        let session = self.sessions.active_session(session_id).await?;
        require_leader(&session, caller_id, "promote participants")?;

        let mut participant = self.member_of(session_id, participant_id).await?;
        participant.is_co_leader = true;
        self.store.update_participant(&participant).await?;

        self.log
            .record(
                Some(session_id),
                caller_id,
                ActivityAction::Promoted {
                    participant_id: participant_id.clone(),
                },
            )
            .await;
        info!(
            session = %session_id,
            participant = %participant_id,
            user = %participant.user_id,
            "Promoted to co-leader"
        );
        Ok(participant)
    }

    /// Delete a participant's row. Leader only.
    ///
    /// The removed client is not told; its next write fails.
    pub async fn remove_participant(
        &self,
        session_id: &SessionId,
        caller_id: &str,
        participant_id: &ParticipantId,
    ) -> Result<Participant, SyncError> {
        let session = self.sessions.active_session(session_id).await?;
        require_leader(&session, caller_id, "remove participants")?;

        let participant = self.member_of(session_id, participant_id).await?;
        if participant.user_id == session.leader_id {
            return Err(SyncError::Validation(
                "the leader cannot remove themselves; leave or close the session instead".into(),
            ));
        }
        self.store.delete_participant(participant_id).await?;

        self.log
            .record(
                Some(session_id),
                caller_id,
                ActivityAction::Removed {
                    participant_id: participant_id.clone(),
                },
            )
            .await;
        info!(
            session = %session_id,
            participant = %participant_id,
            user = %participant.user_id,
            "Participant removed"
        );
        Ok(participant)
    }

    /// Flip the caller's follow preference and return the new value.
    ///
    /// Allowed for any role. For a leader or co-leader it changes nothing
    /// about what they publish.
    pub async fn toggle_follow_leader(
        &self,
        session_id: &SessionId,
        user_id: &str,
    ) -> Result<bool, SyncError> {
        self.sessions.active_session(session_id).await?;
        let mut participant = self.by_user(session_id, user_id).await?;
        participant.is_following_leader = !participant.is_following_leader;
        self.store.update_participant(&participant).await?;

        let following = participant.is_following_leader;
        self.log
            .record(
                Some(session_id),
                user_id,
                ActivityAction::FollowToggled { following },
            )
            .await;
        info!(session = %session_id, user = user_id, following, "Follow preference toggled");
        Ok(following)
    }

    /// Mark the caller online and refresh `last_seen`.
    pub async fn heartbeat(&self, session_id: &SessionId, user_id: &str) -> Result<(), SyncError> {
        self.set_status(session_id, user_id, ConnectionStatus::Online)
            .await
    }

    /// Mark the caller offline, e.g. when its socket drops.
    pub async fn mark_disconnected(
        &self,
        session_id: &SessionId,
        user_id: &str,
    ) -> Result<(), SyncError> {
        self.set_status(session_id, user_id, ConnectionStatus::Offline)
            .await
    }

    /// Role of `user_id` in `session`, or `None` if they hold no row.
    ///
    /// The leader's authority comes from the session record, so it holds
    /// even while the leader has no participant row.
    pub async fn role_of(&self, session: &Session, user_id: &str) -> Result<Option<Role>, SyncError> {
        if session.leader_id == user_id {
            return Ok(Some(Role::Leader));
        }
        Ok(self
            .store
            .participant_by_user(&session.id, user_id)
            .await?
            .map(|p| p.role(&session.leader_id)))
    }

    pub(crate) async fn authorize_writer(
        &self,
        session: &Session,
        user_id: &str,
    ) -> Result<Role, SyncError> {
        match self.role_of(session, user_id).await? {
            Some(role) if role.can_write_state() => Ok(role),
            Some(_) => Err(SyncError::Unauthorized(
                "only the leader or a co-leader can change session state".into(),
            )),
            None => Err(SyncError::Unauthorized(format!(
                "{user_id} is not a participant of session {}",
                session.id
            ))),
        }
    }

    async fn set_status(
        &self,
        session_id: &SessionId,
        user_id: &str,
        status: ConnectionStatus,
    ) -> Result<(), SyncError> {
        let mut participant = self.by_user(session_id, user_id).await?;
        participant.connection_status = status;
        participant.last_seen = Utc::now();
        self.store.update_participant(&participant).await
    }

    async fn by_user(&self, session_id: &SessionId, user_id: &str) -> Result<Participant, SyncError> {
        self.store
            .participant_by_user(session_id, user_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("{user_id} is not in session {session_id}")))
    }

    async fn member_of(
        &self,
        session_id: &SessionId,
        participant_id: &ParticipantId,
    ) -> Result<Participant, SyncError> {
        self.store
            .participant(participant_id)
            .await?
            .filter(|p| &p.session_id == session_id)
            .ok_or_else(|| {
                SyncError::NotFound(format!(
                    "participant {participant_id} in session {session_id}"
                ))
            })
    }
}

fn require_leader(session: &Session, caller_id: &str, action: &str) -> Result<(), SyncError> {
    if session.leader_id != caller_id {
        return Err(SyncError::Unauthorized(format!(
            "only the leader can {action}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::DeviceInfo;
    use crate::store::MemoryStore;
    use tandem_config::SessionsConfig;

    struct Fixture {
        participants: ParticipantRegistry,
        sessions: SessionRegistry,
        session_id: SessionId,
        bob: Participant,
        carol: Participant,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(ActivityLog::new(store.clone()));
        let config = SessionsConfig {
            code_attempts: 8,
            password_iterations: 1_000,
        };
        let sessions = SessionRegistry::new(store.clone(), log, config);
        let participants = ParticipantRegistry::new(sessions.clone(), store);

        let created = sessions
            .create_session("alice", "Set", "", None, DeviceInfo::default())
            .await
            .unwrap();
        let code = created.session.code.as_str().to_string();
        let bob = sessions
            .join_session(&code, "bob", None, DeviceInfo::default())
            .await
            .unwrap()
            .participant;
        let carol = sessions
            .join_session(&code, "carol", None, DeviceInfo::default())
            .await
            .unwrap()
            .participant;

        Fixture {
            participants,
            sessions,
            session_id: created.session.id,
            bob,
            carol,
        }
    }

    #[tokio::test]
    async fn lists_in_join_order() {
        let f = fixture().await;
        let users: Vec<String> = f
            .participants
            .list_participants(&f.session_id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        assert_eq!(users, ["alice", "bob", "carol"]);
    }

    #[tokio::test]
    async fn only_leader_promotes() {
        let f = fixture().await;
        let err = f
            .participants
            .promote_to_co_leader(&f.session_id, "bob", &f.carol.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized(_)));

        let promoted = f
            .participants
            .promote_to_co_leader(&f.session_id, "alice", &f.bob.id)
            .await
            .unwrap();
        assert!(promoted.is_co_leader);
        assert!(promoted.is_following_leader, "promotion leaves mode untouched");

        // A co-leader still cannot promote.
        let err = f
            .participants
            .promote_to_co_leader(&f.session_id, "bob", &f.carol.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn promote_unknown_participant_is_not_found() {
        let f = fixture().await;
        let err = f
            .participants
            .promote_to_co_leader(&f.session_id, "alice", &ParticipantId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_deletes_exactly_one_row_and_keeps_state() {
        let f = fixture().await;
        let before = f.sessions.snapshot(&f.session_id).await.unwrap();

        let removed = f
            .participants
            .remove_participant(&f.session_id, "alice", &f.bob.id)
            .await
            .unwrap();
        assert_eq!(removed.user_id, "bob");

        let rows = f.participants.list_participants(&f.session_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|p| p.id != f.bob.id));
        assert_eq!(f.sessions.snapshot(&f.session_id).await.unwrap(), before);

        // The removed client finds out on its next write.
        let err = f
            .participants
            .toggle_follow_leader(&f.session_id, "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_is_leader_only() {
        let f = fixture().await;
        let err = f
            .participants
            .remove_participant(&f.session_id, "carol", &f.bob.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized(_)));
        assert_eq!(
            f.participants
                .list_participants(&f.session_id)
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn toggle_twice_restores_following() {
        let f = fixture().await;
        assert!(!f
            .participants
            .toggle_follow_leader(&f.session_id, "carol")
            .await
            .unwrap());
        assert!(f
            .participants
            .toggle_follow_leader(&f.session_id, "carol")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn leader_may_toggle_without_losing_write_access() {
        let f = fixture().await;
        f.participants
            .toggle_follow_leader(&f.session_id, "alice")
            .await
            .unwrap();
        let session = f.sessions.active_session(&f.session_id).await.unwrap();
        assert_eq!(
            f.participants.authorize_writer(&session, "alice").await.unwrap(),
            Role::Leader
        );
    }

    #[tokio::test]
    async fn heartbeat_and_disconnect_update_status() {
        let f = fixture().await;
        f.participants
            .mark_disconnected(&f.session_id, "bob")
            .await
            .unwrap();
        let rows = f.participants.list_participants(&f.session_id).await.unwrap();
        let bob = rows.iter().find(|p| p.user_id == "bob").unwrap();
        assert_eq!(bob.connection_status, ConnectionStatus::Offline);

        f.participants.heartbeat(&f.session_id, "bob").await.unwrap();
        let rows = f.participants.list_participants(&f.session_id).await.unwrap();
        let bob = rows.iter().find(|p| p.user_id == "bob").unwrap();
        assert_eq!(bob.connection_status, ConnectionStatus::Online);
        assert!(bob.last_seen >= f.bob.last_seen);
    }

    #[tokio::test]
    async fn members_and_strangers_cannot_write() {
        let f = fixture().await;
        let session = f.sessions.active_session(&f.session_id).await.unwrap();
        assert!(matches!(
            f.participants.authorize_writer(&session, "bob").await,
            Err(SyncError::Unauthorized(_))
        ));
        assert!(matches!(
            f.participants.authorize_writer(&session, "mallory").await,
            Err(SyncError::Unauthorized(_))
        ));
    }
}
