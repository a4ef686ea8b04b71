use tracing::info;
use crate::models::messages::{ConnectionId, JoinMessage};
use crate::ws::registry::RegistryHandle;

/// Handle JoinMessage
pub fn handle_join_message(join_msg: JoinMessage, connection_id: &ConnectionId, registry: &RegistryHandle) {
    info!("Join requested by {}: room={}, name={}", connection_id, join_msg.room, join_msg.display_name);
    registry.join(connection_id.clone(), join_msg.room, join_msg.display_name);
}
