use crate::models::messages::{ConnectionId, Member};

/// Local copy of a room's membership, in join order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresenceView {
    members: Vec<Member>,
}

impl PresenceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole view with an authoritative snapshot.
    pub fn replace(&mut self, members: Vec<Member>) {
        self.members = members;
    }

    /// Remove a member. Removing someone who is not listed is a no-op.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Member> {
        let idx = self
            .members
            .iter()
            .position(|m| &m.connection_id == connection_id)?;
        Some(self.members.remove(idx))
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.display_name.as_str()).collect()
    }
}
