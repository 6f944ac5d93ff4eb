//! Server configuration: the top-level `ServerConfig` plus its logging and
//! store sections, all re-exported here.
pub mod config;
pub mod logging;
pub mod store;

pub use config::*;
pub use logging::*;
pub use store::*;
