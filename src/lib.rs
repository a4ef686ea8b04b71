pub mod clients;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod utils;
pub mod websocket;
pub mod ws;

use std::time::Duration;

use config::Config;
use ws::{RegistryConfig, RegistryHandle};

/// State shared by every HTTP and websocket handler: the room registry
/// plus per-connection settings.
pub struct AppState {
    pub registry: RegistryHandle,
    pub service_name: String,
    pub heartbeat_interval: Duration,
    pub idle_timeout: Duration,
}

impl AppState {
    /// Spawn the room registry and wrap it with the connection settings.
    pub fn from_config(config: &Config) -> Self {
        let registry = RegistryHandle::spawn(RegistryConfig {
            outbound_capacity: config.outbound_capacity,
            sync_policy: config.sync_policy,
        });
        Self {
            registry,
            service_name: config.service_name.clone(),
            heartbeat_interval: config.heartbeat_interval(),
            idle_timeout: config.idle_timeout(),
        }
    }
}
