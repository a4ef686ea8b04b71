use chrono::{DateTime, Utc};

use crate::models::messages::{ConnectionId, Member};

#[derive(Clone, Debug)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn member(&self) -> Member {
        Member {
            connection_id: self.connection_id.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// A room and its participants, kept in join order.
#[derive(Clone, Debug)]
pub struct Room {
    pub id: String,
    pub created_at: DateTime<Utc>,
    members: Vec<Participant>,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            members: Vec::new(),
        }
    }

    pub fn admit(&mut self, connection_id: ConnectionId, display_name: String) -> &Participant {
        self.members.push(Participant {
            connection_id,
            display_name,
            joined_at: Utc::now(),
        });
        &self.members[self.members.len() - 1]
    }

    /// Remove a participant. Returns `None` if it was not a member.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        let idx = self
            .members
            .iter()
            .position(|p| &p.connection_id == connection_id)?;
        Some(self.members.remove(idx))
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.iter().any(|p| &p.connection_id == connection_id)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.members
    }

    pub fn members(&self) -> Vec<Member> {
        self.members.iter().map(Participant::member).collect()
    }

    /// Connection ids of everyone in the room except `exclude`.
    pub fn others(&self, exclude: &ConnectionId) -> Vec<ConnectionId> {
        self.members
            .iter()
            .filter(|p| &p.connection_id != exclude)
            .map(|p| p.connection_id.clone())
            .collect()
    }

    /// Earliest-joined member other than `exclude`.
    pub fn eldest_except(&self, exclude: &ConnectionId) -> Option<ConnectionId> {
        self.members
            .iter()
            .find(|p| &p.connection_id != exclude)
            .map(|p| p.connection_id.clone())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
