pub mod compile;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod messages;
pub mod room;

pub use diagnostics::*;
pub use error::*;
pub use health::*;
pub use room::*;
