use std::sync::Arc;
use std::time::Duration;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tracing::{info, warn, error, debug};
use futures_util::{StreamExt, SinkExt};

use crate::AppState;
use crate::models::messages::{ClientEvent, ConnectionId};
use crate::utils::scope_guard::ScopeGuard;
use crate::websocket::msg_code_change_handler::handle_code_change_message;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_sync_handler::handle_sync_message;

/// How long a rejected connection gets to flush its error event.
const REJECT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

enum ReaderExit {
    Closed,
    Rejected,
}

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Generate unique connection ID to identify this client
    let connection_id = ConnectionId::new();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    // The registry owns the only sender for this queue
    let registry = app_state.registry.clone();
    let mut outbound_rx = registry.connect(connection_id.clone());

    // Whatever ends this connection, the registry must hear about it
    let _disconnect = {
        let registry = registry.clone();
        let connection_id = connection_id.clone();
        ScopeGuard::new(move || registry.disconnect(connection_id))
    };

    let (mut sender, mut receiver) = socket.split();

    // Forward registry events to the client and keep the channel alive with pings
    let heartbeat = app_state.heartbeat_interval;
    let writer_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat);
        ticker.tick().await;
        loop {
            tokio::select! {
                event = outbound_rx.recv() => {
                    let Some(event) = event else {
                        debug!("Registry released connection {}", writer_id);
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to serialize {} event for {}: {}", event.kind(), writer_id, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read client events in arrival order and hand them to the registry
    let idle_timeout = app_state.idle_timeout;
    let reader_id = connection_id.clone();
    let reader_registry = registry.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let frame = match tokio::time::timeout(idle_timeout, receiver.next()).await {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(e))) => {
                    warn!("WebSocket error on {}: {}", reader_id, e);
                    return ReaderExit::Closed;
                }
                Ok(None) => return ReaderExit::Closed,
                Err(_) => {
                    warn!("Connection {} silent for {:?}, closing", reader_id, idle_timeout);
                    return ReaderExit::Closed;
                }
            };

            match frame {
                Message::Text(msg) => {
                    let event: ClientEvent = match serde_json::from_str(&msg) {
                        Ok(event) => event,
                        Err(e) => {
                            error!("Failed to parse message from {}: {}", reader_id, e);
                            reader_registry.reject(reader_id.clone(), format!("malformed event: {}", e));
                            return ReaderExit::Rejected;
                        }
                    };
                    match event {
                        ClientEvent::Join(join_msg) => {
                            handle_join_message(join_msg, &reader_id, &reader_registry)
                        }
                        ClientEvent::SyncCode(sync_msg) => {
                            handle_sync_message(sync_msg, &reader_id, &reader_registry)
                        }
                        ClientEvent::CodeChange(change_msg) => {
                            handle_code_change_message(change_msg, &reader_id, &reader_registry)
                        }
                    }
                }
                Message::Binary(_) => {
                    reader_registry.reject(reader_id.clone(), "binary frames are not supported");
                    return ReaderExit::Rejected;
                }
                Message::Close(_) => return ReaderExit::Closed,
                // Any frame, pongs included, counts as liveness
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        exit = (&mut recv_task) => {
            if matches!(exit, Ok(ReaderExit::Rejected)) {
                // The writer stops by itself once the registry drops the connection
                if tokio::time::timeout(REJECT_FLUSH_TIMEOUT, &mut send_task).await.is_err() {
                    send_task.abort();
                }
            } else {
                send_task.abort();
            }
        }
    };
    info!("WebSocket connection {} terminated", connection_id);
}
