use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier the coordinator assigns to every open channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub room: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncCodeRequest {
    pub code: Option<String>,
    pub target_connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncCodeMessage {
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangeMessage {
    pub code: String,
}

/// Membership snapshot sent to every member when someone arrives.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedMessage {
    pub members: Vec<Member>,
    pub joiner_name: String,
    pub joiner_connection_id: ConnectionId,
    /// Set only under the elected sync policy: the one member expected to
    /// answer with a snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_source: Option<ConnectionId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedMessage {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub message: String,
}

/// Events a participant sends to the coordinator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "sync-code")]
    SyncCode(SyncCodeRequest),
    #[serde(rename = "code-change")]
    CodeChange(CodeChangeMessage),
}

/// Events the coordinator sends to participants.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "joined")]
    Joined(JoinedMessage),
    #[serde(rename = "sync-code")]
    SyncCode(SyncCodeMessage),
    #[serde(rename = "code-change")]
    CodeChange(CodeChangeMessage),
    #[serde(rename = "disconnected")]
    Disconnected(DisconnectedMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Joined(_) => "joined",
            ServerEvent::SyncCode(_) => "sync-code",
            ServerEvent::CodeChange(_) => "code-change",
            ServerEvent::Disconnected(_) => "disconnected",
            ServerEvent::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_uses_camel_case_fields() {
        let event: ClientEvent = serde_json::from_value(json!({
            "type": "join",
            "room": "r1",
            "displayName": "Alice",
        }))
        .unwrap();

        assert_eq!(
            event,
            ClientEvent::Join(JoinMessage {
                room: "r1".to_string(),
                display_name: "Alice".to_string(),
            })
        );
    }

    #[test]
    fn joined_omits_sync_source_when_unset() {
        let event = ServerEvent::Joined(JoinedMessage {
            members: vec![Member {
                connection_id: ConnectionId::from("c1"),
                display_name: "Alice".to_string(),
            }],
            joiner_name: "Alice".to_string(),
            joiner_connection_id: ConnectionId::from("c1"),
            sync_source: None,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "joined",
                "members": [{"connectionId": "c1", "displayName": "Alice"}],
                "joinerName": "Alice",
                "joinerConnectionId": "c1",
            })
        );
    }

    #[test]
    fn sync_code_accepts_null_snapshot() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"sync-code","code":null,"targetConnectionId":"c2"}"#,
        )
        .unwrap();

        match event {
            ClientEvent::SyncCode(req) => {
                assert_eq!(req.code, None);
                assert_eq!(req.target_connection_id.as_str(), "c2");
            }
            other => panic!("expected sync-code, got {:?}", other),
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let parsed = serde_json::from_str::<ClientEvent>(r#"{"type":"leave"}"#);
        assert!(parsed.is_err());
    }
}
