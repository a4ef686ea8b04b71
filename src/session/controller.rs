use std::fmt;

use tracing::debug;

use crate::models::messages::{
    ClientEvent, CodeChangeMessage, ConnectionId, DisconnectedMessage, JoinMessage,
    JoinedMessage, Member, ServerEvent, SyncCodeRequest,
};
use super::document::DocumentRef;
use super::presence::PresenceView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport is up and JOIN has been sent; our own JOINED has not arrived.
    Connecting,
    Joined,
    /// Teardown has begun; incoming events are ignored from here on.
    Leaving,
    Closed,
}

/// User-facing notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    UserJoined(String),
    UserLeft(String),
    ConnectionFailed,
    Rejected(String),
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::UserJoined(name) => write!(f, "{} joined the room.", name),
            Notification::UserLeft(name) => write!(f, "{} left the room.", name),
            Notification::ConnectionFailed => {
                write!(f, "Socket connection failed, try again later.")
            }
            Notification::Rejected(reason) => write!(f, "Server closed the session: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send(ClientEvent),
    Notify(Notification),
    /// Replace the editing surface's content.
    ApplyRemote(String),
    PresenceChanged(Vec<Member>),
}

/// Participant-side session state machine.
///
/// Holds no I/O: it is fed decoded [`ServerEvent`]s and answers with
/// [`Effect`]s for the driver in `session::client` to carry out.
pub struct SessionController {
    room: String,
    display_name: String,
    state: SessionState,
    connection_id: Option<ConnectionId>,
    presence: PresenceView,
    document: DocumentRef,
}

impl SessionController {
    pub fn new(room: impl Into<String>, display_name: impl Into<String>, document: DocumentRef) -> Self {
        Self {
            room: room.into(),
            display_name: display_name.into(),
            state: SessionState::Connecting,
            connection_id: None,
            presence: PresenceView::new(),
            document,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Our own connection id, known once our JOINED has arrived.
    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.connection_id.as_ref()
    }

    pub fn presence(&self) -> &PresenceView {
        &self.presence
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// First event on a freshly opened channel.
    pub fn join_request(&self) -> ClientEvent {
        ClientEvent::Join(JoinMessage {
            room: self.room.clone(),
            display_name: self.display_name.clone(),
        })
    }

    /// The editing surface changed. Returns the broadcast to send, if the
    /// session is still live.
    pub fn local_change(&mut self, text: String) -> Option<ClientEvent> {
        match self.state {
            SessionState::Connecting | SessionState::Joined => {
                self.document.set(text.clone());
                Some(ClientEvent::CodeChange(CodeChangeMessage { code: text }))
            }
            SessionState::Leaving | SessionState::Closed => None,
        }
    }

    pub fn begin_leave(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Leaving;
        }
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    pub fn handle(&mut self, event: ServerEvent) -> Vec<Effect> {
        if matches!(self.state, SessionState::Leaving | SessionState::Closed) {
            debug!("Ignoring {} event after teardown began", event.kind());
            return Vec::new();
        }

        match event {
            ServerEvent::Joined(joined) => self.on_joined(joined),
            ServerEvent::Disconnected(departed) => self.on_disconnected(departed),
            ServerEvent::SyncCode(sync) => self.apply_remote(sync.code),
            ServerEvent::CodeChange(change) => self.apply_remote(Some(change.code)),
            ServerEvent::Error(err) => {
                self.state = SessionState::Closed;
                vec![Effect::Notify(Notification::Rejected(err.message))]
            }
        }
    }

    fn on_joined(&mut self, joined: JoinedMessage) -> Vec<Effect> {
        // Before our own arrival we are not a member, so the first JOINED on
        // this channel is always about us.
        if self.connection_id.is_none() {
            self.connection_id = Some(joined.joiner_connection_id.clone());
            self.state = SessionState::Joined;
        }

        self.presence.replace(joined.members);
        let mut effects = vec![Effect::PresenceChanged(self.presence.members().to_vec())];

        if joined.joiner_name != self.display_name {
            effects.push(Effect::Notify(Notification::UserJoined(joined.joiner_name)));
        }

        let answers = match &joined.sync_source {
            None => true,
            Some(source) => self.connection_id.as_ref() == Some(source),
        };
        if answers {
            effects.push(Effect::Send(ClientEvent::SyncCode(SyncCodeRequest {
                code: self.document.get(),
                target_connection_id: joined.joiner_connection_id,
            })));
        }
        effects
    }

    fn on_disconnected(&mut self, departed: DisconnectedMessage) -> Vec<Effect> {
        let mut effects = vec![Effect::Notify(Notification::UserLeft(departed.display_name))];
        if self.presence.remove(&departed.connection_id).is_some() {
            effects.push(Effect::PresenceChanged(self.presence.members().to_vec()));
        }
        effects
    }

    /// Last applied wins; an empty snapshot never overwrites content.
    fn apply_remote(&mut self, code: Option<String>) -> Vec<Effect> {
        match code {
            Some(code) => {
                self.document.set(code.clone());
                vec![Effect::ApplyRemote(code)]
            }
            None => Vec::new(),
        }
    }
}
