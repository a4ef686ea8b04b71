use tracing::debug;
use crate::models::messages::{CodeChangeMessage, ConnectionId};
use crate::ws::registry::RegistryHandle;

/// Handle CodeChangeMessage - broadcast to the rest of the room
pub fn handle_code_change_message(change_msg: CodeChangeMessage, connection_id: &ConnectionId, registry: &RegistryHandle) {
    debug!("Code change from {} ({} bytes)", connection_id, change_msg.code.len());
    registry.code_change(connection_id.clone(), change_msg.code);
}
