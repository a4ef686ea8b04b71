use tracing::debug;
use crate::models::messages::{ConnectionId, SyncCodeRequest};
use crate::ws::registry::RegistryHandle;

/// Handle SyncCodeRequest - relay a snapshot to exactly one connection
pub fn handle_sync_message(sync_msg: SyncCodeRequest, connection_id: &ConnectionId, registry: &RegistryHandle) {
    debug!(
        "Sync requested by {} for {} ({} bytes)",
        connection_id,
        sync_msg.target_connection_id,
        sync_msg.code.as_ref().map_or(0, String::len)
    );
    registry.sync_code(connection_id.clone(), sync_msg.target_connection_id, sync_msg.code);
}
