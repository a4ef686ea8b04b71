use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ws::room::Participant;
use crate::ws::RoomSnapshot;

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantModel {
    pub connection_id: String,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

impl From<&Participant> for ParticipantModel {
    fn from(p: &Participant) -> Self {
        Self {
            connection_id: p.connection_id.to_string(),
            display_name: p.display_name.clone(),
            joined_at: p.joined_at,
        }
    }
}

/// Presence of one room
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub room_id: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<ParticipantModel>,
}

impl From<RoomSnapshot> for RoomResponse {
    fn from(room: RoomSnapshot) -> Self {
        Self {
            members: room.participants.iter().map(ParticipantModel::from).collect(),
            room_id: room.id,
            created_at: room.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub created_at: DateTime<Utc>,
    pub member_count: usize,
}

impl From<RoomSnapshot> for RoomSummary {
    fn from(room: RoomSnapshot) -> Self {
        Self {
            member_count: room.participants.len(),
            room_id: room.id,
            created_at: room.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummary>,
}
