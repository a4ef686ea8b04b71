use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::models::messages::{ClientEvent, Member, ServerEvent};
use super::controller::{Effect, Notification, SessionController, SessionState};
use super::document::DocumentRef;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect: {0}")]
    Connect(#[source] tungstenite::Error),
    #[error("failed to send join request: {0}")]
    Handshake(#[source] tungstenite::Error),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session is closed")]
    Closed,
}

impl SessionError {
    /// What to show the user before sending them back to the entry screen.
    pub fn notification(&self) -> Notification {
        match self {
            SessionError::Connect(_) | SessionError::Handshake(_) => Notification::ConnectionFailed,
            SessionError::Encode(e) => Notification::Rejected(e.to_string()),
            SessionError::Closed => Notification::Rejected("session is closed".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    TransportLost(String),
    Rejected(String),
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Notification(Notification),
    PresenceChanged(Vec<Member>),
    RemoteChange(String),
    /// The session ended without being asked to. Terminal: rejoin to continue.
    Closed(CloseReason),
}

enum SessionCommand {
    LocalChange(String),
}

/// One participant's live membership in a room.
///
/// [`RoomSession::join`] opens the socket, sends JOIN and spawns a loop task
/// that owns the socket and the [`SessionController`]. Everything the loop
/// learns comes back as [`SessionEvent`]s on a bounded receiver.
pub struct RoomSession {
    document: DocumentRef,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RoomSession {
    /// Connect to `url` and join `room`. A failed connect is final; callers
    /// should surface [`SessionError::notification`] and not retry on their own.
    pub async fn join(
        url: &str,
        room: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), SessionError> {
        let room = room.into();
        let display_name = display_name.into();

        let (ws, _response) = connect_async(url).await.map_err(|e| {
            error!("Socket error connecting to {}: {}", url, e);
            SessionError::Connect(e)
        })?;

        let document = DocumentRef::new();
        let controller = SessionController::new(room.clone(), display_name.clone(), document.clone());
        let (mut sink, source) = ws.split();

        let join = serde_json::to_string(&controller.join_request())?;
        sink.send(Message::text(join)).await.map_err(|e| {
            error!("Failed to send join for room {}: {}", room, e);
            SessionError::Handshake(e)
        })?;
        info!("Joining room {} as {}", room, display_name);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(session_loop(
            controller,
            sink,
            source,
            command_rx,
            shutdown_rx,
            event_tx,
        ));

        let session = Self {
            document,
            command_tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        };
        Ok((session, event_rx))
    }

    /// Current local text, as it would be sent to the next joiner.
    pub fn document(&self) -> Option<String> {
        self.document.get()
    }

    /// Record a local edit and broadcast it to the rest of the room.
    pub fn edit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.document.set(text.clone());
        self.command_tx
            .send(SessionCommand::LocalChange(text))
            .map_err(|_| SessionError::Closed)
    }

    /// Leave the room. Once this returns no further events are handled.
    pub async fn leave(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Session loop ended with join error: {}", e),
                Err(_) => {
                    warn!("Session loop did not stop in time, aborting");
                    task.abort();
                    let _ = task.await;
                }
            }
        }
    }
}

async fn session_loop(
    mut controller: SessionController,
    mut sink: WsSink,
    mut source: WsSource,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    mut shutdown_rx: oneshot::Receiver<()>,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    loop {
        tokio::select! {
            biased;

            // Also fires when the handle is dropped.
            _ = &mut shutdown_rx => {
                teardown(&mut controller, &mut sink).await;
                return;
            }

            cmd = command_rx.recv() => {
                let Some(SessionCommand::LocalChange(text)) = cmd else {
                    teardown(&mut controller, &mut sink).await;
                    return;
                };
                if let Some(event) = controller.local_change(text) {
                    if let Err(reason) = send_event(&mut sink, &event).await {
                        finish(&mut controller, &event_tx, CloseReason::TransportLost(reason)).await;
                        return;
                    }
                }
            }

            frame = source.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        finish(&mut controller, &event_tx, CloseReason::TransportLost("closed by server".to_string())).await;
                        return;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        finish(&mut controller, &event_tx, CloseReason::TransportLost(e.to_string())).await;
                        return;
                    }
                };

                let event: ServerEvent = match serde_json::from_str(text.as_str()) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Unparseable event from server: {}", e);
                        let _ = sink.close().await;
                        finish(&mut controller, &event_tx, CloseReason::Protocol(e.to_string())).await;
                        return;
                    }
                };
                let rejection = match &event {
                    ServerEvent::Error(err) => Some(err.message.clone()),
                    _ => None,
                };

                for effect in controller.handle(event) {
                    match effect {
                        Effect::Send(event) => {
                            if let Err(reason) = send_event(&mut sink, &event).await {
                                finish(&mut controller, &event_tx, CloseReason::TransportLost(reason)).await;
                                return;
                            }
                        }
                        Effect::Notify(notification) => {
                            emit(&event_tx, SessionEvent::Notification(notification)).await
                        }
                        Effect::ApplyRemote(code) => emit(&event_tx, SessionEvent::RemoteChange(code)).await,
                        Effect::PresenceChanged(members) => {
                            emit(&event_tx, SessionEvent::PresenceChanged(members)).await
                        }
                    }
                }

                if controller.state() == SessionState::Closed {
                    let _ = sink.close().await;
                    let reason = rejection.unwrap_or_else(|| "closed".to_string());
                    emit(&event_tx, SessionEvent::Closed(CloseReason::Rejected(reason))).await;
                    return;
                }
            }
        }
    }
}

/// Voluntary exit: stop handling events first, then close the socket.
async fn teardown(controller: &mut SessionController, sink: &mut WsSink) {
    controller.begin_leave();
    if let Err(e) = sink.close().await {
        debug!("Close on leave failed: {}", e);
    }
    controller.close();
    info!("Left room {}", controller.room());
}

async fn finish(
    controller: &mut SessionController,
    event_tx: &mpsc::Sender<SessionEvent>,
    reason: CloseReason,
) {
    warn!("Session in room {} ended: {:?}", controller.room(), reason);
    controller.close();
    emit(event_tx, SessionEvent::Closed(reason)).await;
}

async fn send_event(sink: &mut WsSink, event: &ClientEvent) -> Result<(), String> {
    let text = serde_json::to_string(event).map_err(|e| e.to_string())?;
    sink.send(Message::text(text)).await.map_err(|e| e.to_string())
}

async fn emit(event_tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("Session event receiver dropped");
    }
}
