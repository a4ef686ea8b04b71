pub mod registry;
pub mod room;

pub use registry::{RegistryConfig, RegistryHandle, RegistryStats, RoomSnapshot};
