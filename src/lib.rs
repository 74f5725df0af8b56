// Mackup - configuration resolution for the dotfile backup and sync tool
//
// This is the library crate: it finds `.mackup.cfg`, parses it and validates it
// into a `ResolvedConfig`. The binary crate (main.rs) prints the result.

pub mod config;
pub mod environment;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ConfigResolver, ConfigSource, ResolveError};
pub use environment::{EnvironmentError, HostEnvironment};
pub use models::{Engine, ResolvedConfig};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
