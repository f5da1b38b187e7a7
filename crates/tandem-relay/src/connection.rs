//! Per-connection handler: identify, then serve requests and forward
//! subscription traffic until the socket closes.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tandem_common::{SessionId, SyncError, TopicKey};
use tandem_sync::{DeviceCode, PairingPayload, Received, Subscription, SyncService};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::protocol::{ClientRequest, Hello, ServerResponse};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// State owned by one socket.
struct Connection {
    service: SyncService,
    user_id: String,
    addr: SocketAddr,
    /// At most one live subscription; a new subscribe replaces it.
    subscription: Option<Subscription>,
    /// Sessions this user touched, marked offline on disconnect.
    sessions: HashSet<SessionId>,
}

/// Handle a single WebSocket connection.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    service: SyncService,
    hello_timeout: Duration,
) {
    let (mut sink, mut stream) = ws.split();

    // 1. Identify.
    let user_id = match read_hello(&mut stream, addr, hello_timeout).await {
        Some(id) => id,
        None => {
            let _ = send_response(
                &mut sink,
                &ServerResponse::error("validation", "expected hello with a user_id"),
            )
            .await;
            return;
        }
    };
    if send_response(
        &mut sink,
        &ServerResponse::Ready {
            user_id: user_id.clone(),
        },
    )
    .await
    .is_err()
    {
        return;
    }
    tracing::info!(peer = %addr, user = %user_id, "Client identified");

    let mut conn = Connection {
        service,
        user_id,
        addr,
        subscription: None,
        sessions: HashSet::new(),
    };

    // 2. Serve.
    loop {
        tokio::select! {
            event = next_event(&mut conn.subscription) => {
                match event {
                    Some(response) => {
                        if send_response(&mut sink, &response).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!(peer = %addr, "Subscription closed");
                        conn.subscription = None;
                    }
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let response = match serde_json::from_str::<ClientRequest>(&text) {
                            Ok(request) => conn.handle(request).await,
                            Err(e) => ServerResponse::error("validation", format!("bad request: {e}")),
                        };
                        if send_response(&mut sink, &response).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 3. Cleanup.
    conn.disconnect().await;
}

impl Connection {
    async fn handle(&mut self, request: ClientRequest) -> ServerResponse {
        let name = request.name();
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(
                    peer = %self.addr,
                    user = %self.user_id,
                    request = name,
                    kind = e.kind(),
                    error = %e,
                    "Request failed"
                );
                e.into()
            }
        }
    }

    async fn dispatch(&mut self, request: ClientRequest) -> Result<ServerResponse, SyncError> {
        let user = self.user_id.as_str();
        let service = &self.service;

        let response = match request {
            ClientRequest::CreateSession {
                title,
                description,
                password,
                device,
            } => {
                let created = service
                    .sessions
                    .create_session(user, &title, &description, password.as_deref(), device)
                    .await?;
                self.sessions.insert(created.session.id.clone());
                let pairing = PairingPayload::Group(created.session.code.clone());
                log_pairing(&pairing);
                ServerResponse::SessionCreated {
                    session: created.session,
                    participant: created.participant,
                    pairing: pairing.to_string(),
                }
            }
            ClientRequest::JoinSession {
                code,
                password,
                device,
            } => {
                let joined = service
                    .sessions
                    .join_session(&code, user, password.as_deref(), device)
                    .await?;
                self.sessions.insert(joined.session.id.clone());
                ServerResponse::SessionJoined {
                    session: joined.session,
                    participant: joined.participant,
                }
            }
            ClientRequest::LeaveSession { session_id } => {
                service.sessions.leave_session(&session_id, user).await?;
                self.sessions.remove(&session_id);
                self.drop_subscription(&TopicKey::session(&session_id));
                ServerResponse::Ok
            }
            ClientRequest::CloseSession { session_id } => {
                service.sessions.close_session(&session_id, user).await?;
                self.sessions.remove(&session_id);
                self.drop_subscription(&TopicKey::session(&session_id));
                ServerResponse::Ok
            }
            ClientRequest::GetSession { session_id } => ServerResponse::Session {
                session: service.sessions.snapshot(&session_id).await?,
            },
            ClientRequest::ListParticipants { session_id } => ServerResponse::Participants {
                participants: service.participants.list_participants(&session_id).await?,
            },
            ClientRequest::PromoteToCoLeader {
                session_id,
                participant_id,
            } => ServerResponse::Participant {
                participant: service
                    .participants
                    .promote_to_co_leader(&session_id, user, &participant_id)
                    .await?,
            },
            ClientRequest::RemoveParticipant {
                session_id,
                participant_id,
            } => ServerResponse::Participant {
                participant: service
                    .participants
                    .remove_participant(&session_id, user, &participant_id)
                    .await?,
            },
            ClientRequest::ToggleFollowLeader { session_id } => {
                let following = service
                    .participants
                    .toggle_follow_leader(&session_id, user)
                    .await?;
                if !following {
                    self.drop_subscription(&TopicKey::session(&session_id));
                }
                ServerResponse::Following { following }
            }
            ClientRequest::Heartbeat { session_id } => {
                service.participants.heartbeat(&session_id, user).await?;
                self.sessions.insert(session_id);
                ServerResponse::Ok
            }
            ClientRequest::UpdateState { session_id, change } => ServerResponse::State {
                state: service
                    .broadcaster
                    .update_state(&session_id, user, change)
                    .await?,
            },
            ClientRequest::Activity { session_id } => ServerResponse::Activity {
                entries: service.activity.entries(&session_id).await?,
            },
            ClientRequest::SubscribeSession { session_id } => {
                let snapshot = service.sessions.snapshot(&session_id).await?;
                if service
                    .participants
                    .list_participants(&session_id)
                    .await?
                    .iter()
                    .all(|p| p.user_id != user)
                    && snapshot.leader_id != user
                {
                    return Err(SyncError::Unauthorized(format!(
                        "{user} is not in session {session_id}"
                    )));
                }
                let topic = TopicKey::session(&session_id);
                self.subscribe(topic).await
            }

            ClientRequest::GenerateDeviceLink { device_name } => {
                let link = service
                    .devices
                    .generate_device_link(user, &device_name)
                    .await?;
                let pairing = PairingPayload::Remote(link.code.clone());
                log_pairing(&pairing);
                ServerResponse::DeviceLinked {
                    link,
                    pairing: pairing.to_string(),
                }
            }
            ClientRequest::ConnectDevice { code } => ServerResponse::DeviceConnected {
                link: service.devices.connect(&code, user).await?,
            },
            ClientRequest::DeviceHeartbeat { code } => {
                service.devices.heartbeat(&DeviceCode::parse(&code)?).await?;
                ServerResponse::Ok
            }
            ClientRequest::TeardownDevice { code } => {
                let code = DeviceCode::parse(&code)?;
                service.devices.teardown(&code, user).await?;
                self.drop_subscription(&TopicKey::remote(code.as_str()));
                ServerResponse::Ok
            }
            ClientRequest::SendCommand { code, command } => ServerResponse::CommandQueued {
                command_id: service.commands.send_command(&code, user, command).await?,
            },
            ClientRequest::MarkExecuted { code, command_id } => {
                let code = DeviceCode::parse(&code)?;
                self.require_owner(&code).await?;
                ServerResponse::Executed {
                    changed: self.service.commands.mark_executed(&code, &command_id).await?,
                }
            }
            ClientRequest::PendingCommands { code } => {
                let code = DeviceCode::parse(&code)?;
                self.require_owner(&code).await?;
                ServerResponse::Commands {
                    commands: self.service.commands.pending(&code).await?,
                }
            }
            ClientRequest::SubscribeDevice { code } => {
                let code = DeviceCode::parse(&code)?;
                self.require_owner(&code).await?;
                self.service.devices.heartbeat(&code).await?;
                self.subscribe(TopicKey::remote(code.as_str())).await
            }

            ClientRequest::Unsubscribe => {
                if let Some(subscription) = self.subscription.take() {
                    subscription.close();
                }
                ServerResponse::Ok
            }
        };
        Ok(response)
    }

    /// Only the presentation client that owns a link consumes its commands.
    async fn require_owner(&self, code: &DeviceCode) -> Result<(), SyncError> {
        let link = self.service.devices.get(code).await?;
        if !link.is_active {
            return Err(SyncError::NotFound(format!(
                "no active device link with code {code}"
            )));
        }
        if link.owner_id != self.user_id {
            return Err(SyncError::Unauthorized(
                "only the owner can read this device's commands".into(),
            ));
        }
        Ok(())
    }

    async fn subscribe(&mut self, topic: TopicKey) -> ServerResponse {
        if let Some(previous) = self.subscription.take() {
            previous.close();
        }
        let name = topic.to_string();
        self.subscription = Some(self.service.channel.subscribe(&topic).await);
        tracing::debug!(peer = %self.addr, topic = %name, "Client subscribed");
        ServerResponse::Subscribed { topic: name }
    }

    fn drop_subscription(&mut self, topic: &TopicKey) {
        if self.subscription.as_ref().is_some_and(|s| s.topic() == topic) {
            if let Some(subscription) = self.subscription.take() {
                subscription.close();
            }
        }
    }

    async fn disconnect(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
        }
        for session_id in &self.sessions {
            if let Err(e) = self
                .service
                .participants
                .mark_disconnected(session_id, &self.user_id)
                .await
            {
                tracing::debug!(session = %session_id, error = %e, "Could not mark offline");
            }
        }
        tracing::info!(peer = %self.addr, user = %self.user_id, "Client disconnected");
    }
}

/// Next frame from the live subscription, or never if there is none.
async fn next_event(subscription: &mut Option<Subscription>) -> Option<ServerResponse> {
    match subscription {
        Some(sub) => {
            let topic = sub.topic().to_string();
            Some(match sub.recv().await? {
                Received::Message(message) => ServerResponse::Event { topic, message },
                Received::Lagged(skipped) => ServerResponse::Lagged { topic, skipped },
            })
        }
        None => std::future::pending().await,
    }
}

fn log_pairing(payload: &PairingPayload) {
    match payload.render_qr() {
        Some(qr) => tracing::debug!("Pairing code {payload}:\n{qr}"),
        None => tracing::warn!(payload = %payload, "Failed to render pairing QR code"),
    }
}

/// Read and parse the first message as a [`Hello`].
async fn read_hello(stream: &mut WsStream, addr: SocketAddr, timeout: Duration) -> Option<String> {
    let frame = tokio::time::timeout(timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<Hello>(&text) {
            Ok(Hello::Hello { user_id }) if !user_id.trim().is_empty() => Some(user_id),
            Ok(_) => {
                tracing::warn!(peer = %addr, "Empty user id in hello");
                None
            }
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid hello message");
                None
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text hello, got binary");
            None
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during hello");
            None
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before hello");
            None
        }
        Err(_) => {
            tracing::warn!(peer = %addr, timeout_secs = timeout.as_secs(), "Hello timeout");
            None
        }
    }
}

/// Send a [`ServerResponse`] as a JSON text frame.
async fn send_response(
    sink: &mut WsSink,
    response: &ServerResponse,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode response");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}
