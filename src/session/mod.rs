pub mod client;
pub mod controller;
pub mod document;
pub mod presence;

pub use client::{CloseReason, RoomSession, SessionError, SessionEvent};
pub use controller::{Effect, Notification, SessionController, SessionState};
pub use document::DocumentRef;
pub use presence::PresenceView;
