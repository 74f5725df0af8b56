//! Services module - host lookups used while resolving a configuration.
//!
//! # Components
//!
//! - [`FolderLocator`]: the lookup of the folders synced by cloud storage clients.
//!   [`ConfigResolver`](crate::config::ConfigResolver) calls exactly one of its
//!   methods, chosen by the configured [`Engine`](crate::models::Engine), and
//!   passes the result and any error through untouched.
//! - [`HostFolderLocator`]: the implementation that inspects the user's home.
//!
//! Everything here reads the filesystem only; nothing is written.

pub mod storage_detection;

pub use storage_detection::{FolderLocator, HostFolderLocator, LocateError};
