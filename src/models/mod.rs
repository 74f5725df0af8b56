//! Data models for Mackup's configuration.
//!
//! - [`Engine`]: the storage backend (`dropbox`, `google_drive`, `copy`, `icloud`, `file_system`)
//! - [`ResolvedConfig`]: the validated, read-only result of resolving a `.mackup.cfg` file
//! - Well-known names: the config filename, the default backup directory and the
//!   reserved custom applications directory
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Immutable**: a [`ResolvedConfig`] has no setters; it is only built by
//!   [`ConfigResolver`](crate::config::ConfigResolver)
//! - **Serializable**: [`Engine`] derives `Serialize` for `--format json` output

pub mod config;

pub use config::{
    CUSTOM_APPS_DIR, Engine, LEGACY_SECTIONS, MACKUP_BACKUP_PATH, MACKUP_CONFIG_FILE,
    ResolvedConfig, UnknownEngine,
};
