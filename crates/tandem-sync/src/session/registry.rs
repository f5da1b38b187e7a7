//! Session registry: create, join, leave, close, snapshot.

use std::sync::Arc;

use chrono::Utc;
use tandem_common::{SessionId, SyncError};
use tandem_config::SessionsConfig;
use tracing::{debug, info, warn};

use super::types::{CreatedSession, JoinedSession, Session, SessionSnapshot};
use crate::activity::{ActivityAction, ActivityLog};
use crate::codes::{CodeSource, SessionCode};
use crate::credential::PasswordHash;
use crate::participant::{ConnectionStatus, DeviceInfo, Participant};
use crate::store::Store;

#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn Store>,
    log: Arc<ActivityLog>,
    config: SessionsConfig,
    codes: CodeSource<SessionCode>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn Store>, log: Arc<ActivityLog>, config: SessionsConfig) -> Self {
        Self {
            store,
            log,
            config,
            codes: Arc::new(SessionCode::generate),
        }
    }

    /// Replace the random code generator.
    pub fn with_code_source(mut self, codes: CodeSource<SessionCode>) -> Self {
        self.codes = codes;
        self
    }

    /// Create a session led by `leader_id` and seat the leader in it.
    ///
    /// An empty password means the session is open.
    pub async fn create_session(
        &self,
        leader_id: &str,
        title: &str,
        description: &str,
        password: Option<&str>,
        device: DeviceInfo,
    ) -> Result<CreatedSession, SyncError> {
        require_non_empty("leader id", leader_id)?;
        require_non_empty("title", title)?;

        let password = match password.filter(|p| !p.is_empty()) {
            Some(p) => Some(PasswordHash::new(p, self.config.password_iterations)?),
            None => None,
        };

        let attempts = self.config.code_attempts.max(1);
        for attempt in 1..=attempts {
            let session = Session {
                id: SessionId::new(),
                code: (self.codes)(),
                leader_id: leader_id.to_string(),
                title: title.trim().to_string(),
                description: description.to_string(),
                password: password.clone(),
                current_document_id: None,
                current_position: 0,
                is_playing: false,
                is_active: true,
                seq: 0,
                created_at: Utc::now(),
            };

            match self.store.insert_session(session.clone()).await {
                Ok(()) => {
                    let participant = Participant::new(&session.id, leader_id, device);
                    self.store.insert_participant(participant.clone()).await?;

                    self.log
                        .record(
                            Some(&session.id),
                            leader_id,
                            ActivityAction::SessionCreated {
                                code: session.code.clone(),
                            },
                        )
                        .await;
                    info!(
                        session = %session.id,
                        code = %session.code,
                        leader = leader_id,
                        "Session created"
                    );
                    return Ok(CreatedSession {
                        session: session.snapshot(),
                        participant,
                    });
                }
                Err(SyncError::Conflict(_)) => {
                    debug!(attempt, code = %session.code, "Session code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts, "No free session code");
        Err(SyncError::Conflict(format!(
            "no free session code after {attempts} attempts"
        )))
    }

    /// Join an active session by code as a following member.
    ///
    /// A user who already has a row in the session gets that row back,
    /// marked online, instead of a second one.
    pub async fn join_session(
        &self,
        code: &str,
        user_id: &str,
        password: Option<&str>,
        device: DeviceInfo,
    ) -> Result<JoinedSession, SyncError> {
        require_non_empty("user id", user_id)?;
        let code = SessionCode::parse(code)?;

        let session = self
            .store
            .active_session_by_code(&code)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("no active session with code {code}")))?;

        if let Some(hash) = &session.password {
            if !password.is_some_and(|p| hash.verify(p)) {
                info!(session = %session.id, user = user_id, "Join rejected: bad password");
                return Err(SyncError::Unauthorized("incorrect session password".into()));
            }
        }

        let (participant, rejoin) = match self
            .store
            .participant_by_user(&session.id, user_id)
            .await?
        {
            Some(mut existing) => {
                existing.connection_status = ConnectionStatus::Online;
                existing.last_seen = Utc::now();
                self.store.update_participant(&existing).await?;
                (existing, true)
            }
            None => {
                let participant = Participant::new(&session.id, user_id, device);
                self.store.insert_participant(participant.clone()).await?;
                (participant, false)
            }
        };

        self.log
            .record(
                Some(&session.id),
                user_id,
                ActivityAction::Joined {
                    participant_id: participant.id.clone(),
                    rejoin,
                },
            )
            .await;
        info!(session = %session.id, user = user_id, rejoin, "Participant joined");

        Ok(JoinedSession {
            session: session.snapshot(),
            participant,
        })
    }

    /// Remove the caller's own row.
    ///
    /// A departing leader does not hand over leadership: the session stays
    /// active and the leader can rejoin by code.
    pub async fn leave_session(&self, session_id: &SessionId, user_id: &str) -> Result<(), SyncError> {
        let session = self
            .store
            .session(session_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("session {session_id}")))?;
        let participant = self
            .store
            .participant_by_user(session_id, user_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("{user_id} is not in session {session_id}")))?;

        self.store.delete_participant(&participant.id).await?;

        let was_leader = session.leader_id == user_id;
        if was_leader && session.is_active {
            warn!(session = %session_id, "Leader left; session continues without a leader present");
        }
        self.log
            .record(Some(session_id), user_id, ActivityAction::Left { was_leader })
            .await;
        info!(session = %session_id, user = user_id, "Participant left");
        Ok(())
    }

    /// Deactivate the session. Leader only.
    ///
    /// Already-published snapshots are not retracted; other clients find
    /// out on their next write, which fails with `NotFound`.
    pub async fn close_session(&self, session_id: &SessionId, user_id: &str) -> Result<(), SyncError> {
        let mut session = self.active_session(session_id).await?;
        if session.leader_id != user_id {
            return Err(SyncError::Unauthorized(
                "only the leader can close the session".into(),
            ));
        }

        session.is_active = false;
        self.store.update_session(&session).await?;
        if let Some(participant) = self.store.participant_by_user(session_id, user_id).await? {
            self.store.delete_participant(&participant.id).await?;
        }

        self.log
            .record(Some(session_id), user_id, ActivityAction::SessionClosed)
            .await;
        info!(session = %session_id, code = %session.code, "Session closed");
        Ok(())
    }

    /// Current public view of an active session, for (re)connecting clients.
    pub async fn snapshot(&self, session_id: &SessionId) -> Result<SessionSnapshot, SyncError> {
        Ok(self.active_session(session_id).await?.snapshot())
    }

    pub(crate) async fn active_session(&self, session_id: &SessionId) -> Result<Session, SyncError> {
        self.store
            .session(session_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| SyncError::NotFound(format!("session {session_id}")))
    }

    pub(crate) fn log(&self) -> &Arc<ActivityLog> {
        &self.log
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), SyncError> {
    if value.trim().is_empty() {
        return Err(SyncError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> (SessionRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(ActivityLog::new(store.clone()));
        let config = SessionsConfig {
            code_attempts: 8,
            password_iterations: 1_000,
        };
        (SessionRegistry::new(store.clone(), log, config), store)
    }

    fn fixed_codes(codes: &'static [&'static str]) -> CodeSource<SessionCode> {
        let next = AtomicUsize::new(0);
        Arc::new(move || {
            let i = next.fetch_add(1, Ordering::Relaxed) % codes.len();
            SessionCode::parse(codes[i]).unwrap()
        })
    }

    #[tokio::test]
    async fn create_seats_leader_as_participant() {
        let (registry, store) = registry();
        let created = registry
            .create_session("alice", "Sunday set", "", None, DeviceInfo::default())
            .await
            .unwrap();

        assert_eq!(created.session.code.as_str().len(), 4);
        assert_eq!(created.session.leader_id, "alice");
        assert!(!created.session.has_password);
        let rows = store.participants(&created.session.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "alice");
    }

    #[tokio::test]
    async fn create_retries_on_code_collision() {
        let (registry, _) = registry();
        let registry = registry.with_code_source(fixed_codes(&["4821", "4821", "1234"]));

        let first = registry
            .create_session("alice", "A", "", None, DeviceInfo::default())
            .await
            .unwrap();
        let second = registry
            .create_session("bob", "B", "", None, DeviceInfo::default())
            .await
            .unwrap();
        assert_eq!(first.session.code.as_str(), "4821");
        assert_eq!(second.session.code.as_str(), "1234");
    }

    #[tokio::test]
    async fn create_gives_up_when_codes_are_exhausted() {
        let (registry, _) = registry();
        let registry = registry.with_code_source(fixed_codes(&["4821"]));
        registry
            .create_session("alice", "A", "", None, DeviceInfo::default())
            .await
            .unwrap();
        let err = registry
            .create_session("bob", "B", "", None, DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let (registry, _) = registry();
        let err = registry
            .create_session("alice", "  ", "", None, DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[tokio::test]
    async fn join_unknown_code_is_not_found() {
        let (registry, _) = registry();
        let err = registry
            .join_session("9999", "bob", None, DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn join_malformed_code_is_validation_error() {
        let (registry, _) = registry();
        let err = registry
            .join_session("12", "bob", None, DeviceInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized_and_adds_no_row() {
        let (registry, store) = registry();
        let created = registry
            .create_session("alice", "Private", "", Some("s3cret"), DeviceInfo::default())
            .await
            .unwrap();
        assert!(created.session.has_password);
        let code = created.session.code.as_str();

        for attempt in [Some("wrong"), Some(""), None] {
            let err = registry
                .join_session(code, "bob", attempt, DeviceInfo::default())
                .await
                .unwrap_err();
            assert!(matches!(err, SyncError::Unauthorized(_)));
        }
        assert_eq!(store.participants(&created.session.id).await.unwrap().len(), 1);

        let joined = registry
            .join_session(code, "bob", Some("s3cret"), DeviceInfo::default())
            .await
            .unwrap();
        assert!(joined.participant.is_following_leader);
        assert!(!joined.participant.is_co_leader);
        assert_eq!(store.participants(&created.session.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejoin_reuses_the_row() {
        let (registry, store) = registry();
        let created = registry
            .create_session("alice", "A", "", None, DeviceInfo::default())
            .await
            .unwrap();
        let code = created.session.code.as_str();
        let first = registry
            .join_session(code, "bob", None, DeviceInfo::default())
            .await
            .unwrap();
        let second = registry
            .join_session(code, "bob", None, DeviceInfo::default())
            .await
            .unwrap();
        assert_eq!(first.participant.id, second.participant.id);
        assert_eq!(store.participants(&created.session.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn leader_leaving_keeps_session_active() {
        let (registry, store) = registry();
        let created = registry
            .create_session("alice", "A", "", None, DeviceInfo::default())
            .await
            .unwrap();
        let id = created.session.id.clone();

        registry.leave_session(&id, "alice").await.unwrap();
        assert!(store.participants(&id).await.unwrap().is_empty());
        let snapshot = registry.snapshot(&id).await.unwrap();
        assert!(snapshot.is_active);
        assert_eq!(snapshot.leader_id, "alice");

        let err = registry.leave_session(&id, "alice").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn close_is_leader_only_and_frees_the_code() {
        let (registry, _) = registry();
        let registry = registry.with_code_source(fixed_codes(&["4821"]));
        let created = registry
            .create_session("alice", "A", "", None, DeviceInfo::default())
            .await
            .unwrap();
        let id = created.session.id.clone();
        registry
            .join_session("4821", "bob", None, DeviceInfo::default())
            .await
            .unwrap();

        let err = registry.close_session(&id, "bob").await.unwrap_err();
        assert!(matches!(err, SyncError::Unauthorized(_)));

        registry.close_session(&id, "alice").await.unwrap();
        assert!(matches!(
            registry.snapshot(&id).await,
            Err(SyncError::NotFound(_))
        ));
        assert!(matches!(
            registry
                .join_session("4821", "carol", None, DeviceInfo::default())
                .await,
            Err(SyncError::NotFound(_))
        ));

        // The code is recyclable once the old session is inactive.
        let again = registry
            .create_session("dave", "B", "", None, DeviceInfo::default())
            .await
            .unwrap();
        assert_eq!(again.session.code.as_str(), "4821");
    }

    #[tokio::test]
    async fn mutations_are_logged() {
        let (registry, _) = registry();
        let created = registry
            .create_session("alice", "A", "", None, DeviceInfo::default())
            .await
            .unwrap();
        let id = created.session.id.clone();
        registry
            .join_session(created.session.code.as_str(), "bob", None, DeviceInfo::default())
            .await
            .unwrap();
        registry.leave_session(&id, "bob").await.unwrap();

        let kinds: Vec<String> = registry
            .log()
            .entries(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action_type)
            .collect();
        assert_eq!(kinds, ["session_created", "joined", "left"]);
    }
}
