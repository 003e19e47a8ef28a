//! # duka-config
//!
//! Configuration system for the Duka agent. Reads from `duka.toml` and
//! environment variables — in that precedence order for most settings;
//! secrets fall back to env vars when the file leaves them unset.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{AgentConfig, CommerceConfig, DukaConfig, LoggingConfig, ProviderConfig};
