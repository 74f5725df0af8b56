//! Storage folder detection for the cloud engines.
//!
//! Each cloud engine keeps the Mackup directory inside the folder its desktop
//! client syncs. This module finds that folder on the host:
//! - Dropbox: `personal.path` (or `business.path`) from `~/.dropbox/info.json`
//! - Google Drive: `~/Google Drive`, or the Drive for desktop mount under
//!   `~/Library/CloudStorage/GoogleDrive-<account>/My Drive`
//! - Copy: `~/Copy`
//! - iCloud: `~/Library/Mobile Documents/com~apple~CloudDocs`
//!
//! # Examples
//!
//! ```ignore
//! use mackup::HostEnvironment;
//! use mackup::services::{FolderLocator, HostFolderLocator};
//!
//! let locator = HostFolderLocator::new(HostEnvironment::from_process()?);
//! let dropbox = locator.dropbox_folder()?;
//! ```

use crate::environment::HostEnvironment;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// Failure to find the folder synced by a cloud client.
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("Unable to find your {client} folder (looked at {looked_at})")]
    NotInstalled {
        client: &'static str,
        looked_at: Utf8PathBuf,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid client settings in {path}: {reason}")]
    InvalidInfo { path: Utf8PathBuf, reason: String },
}

/// Lookup of the local folders synced by cloud storage clients.
#[cfg_attr(test, mockall::automock)]
pub trait FolderLocator {
    fn dropbox_folder(&self) -> Result<Utf8PathBuf, LocateError>;

    fn google_drive_folder(&self) -> Result<Utf8PathBuf, LocateError>;

    fn copy_folder(&self) -> Result<Utf8PathBuf, LocateError>;

    fn icloud_folder(&self) -> Result<Utf8PathBuf, LocateError>;
}

/// [`FolderLocator`] that inspects the real filesystem under the user's home.
#[derive(Debug, Clone)]
pub struct HostFolderLocator {
    env: HostEnvironment,
}

#[derive(Debug, Deserialize)]
struct DropboxInfo {
    personal: Option<DropboxAccount>,
    business: Option<DropboxAccount>,
}

#[derive(Debug, Deserialize)]
struct DropboxAccount {
    path: Option<String>,
}

impl HostFolderLocator {
    pub fn new(env: HostEnvironment) -> Self {
        Self { env }
    }

    fn home(&self) -> &Utf8Path {
        self.env.home()
    }

    fn existing_dir(client: &'static str, dir: Utf8PathBuf) -> Result<Utf8PathBuf, LocateError> {
        if dir.is_dir() {
            tracing::debug!("Found {} folder at {}", client, dir);
            Ok(dir)
        } else {
            Err(LocateError::NotInstalled {
                client,
                looked_at: dir,
            })
        }
    }

    /// Drive for desktop mounts, one per signed-in account, sorted by name.
    fn cloud_storage_drives(&self) -> Result<Vec<Utf8PathBuf>, LocateError> {
        let cloud_storage = self.home().join("Library").join("CloudStorage");
        if !cloud_storage.is_dir() {
            return Ok(Vec::new());
        }

        let entries = cloud_storage
            .read_dir_utf8()
            .map_err(|source| LocateError::Read {
                path: cloud_storage.clone(),
                source,
            })?;

        let mut drives = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LocateError::Read {
                path: cloud_storage.clone(),
                source,
            })?;
            if entry.file_name().starts_with("GoogleDrive-") {
                let my_drive = entry.path().join("My Drive");
                if my_drive.is_dir() {
                    drives.push(my_drive);
                }
            }
        }
        drives.sort();
        Ok(drives)
    }
}

impl FolderLocator for HostFolderLocator {
    fn dropbox_folder(&self) -> Result<Utf8PathBuf, LocateError> {
        let info_path = self.home().join(".dropbox").join("info.json");
        if !info_path.is_file() {
            return Err(LocateError::NotInstalled {
                client: "Dropbox",
                looked_at: info_path,
            });
        }

        let contents = fs::read_to_string(&info_path).map_err(|source| LocateError::Read {
            path: info_path.clone(),
            source,
        })?;

        let info: DropboxInfo =
            serde_json::from_str(&contents).map_err(|e| LocateError::InvalidInfo {
                path: info_path.clone(),
                reason: e.to_string(),
            })?;

        let folder = [info.personal, info.business]
            .into_iter()
            .flatten()
            .find_map(|account| account.path.filter(|p| !p.is_empty()))
            .ok_or_else(|| LocateError::InvalidInfo {
                path: info_path.clone(),
                reason: "no personal or business account path".to_string(),
            })?;

        tracing::debug!("Found Dropbox folder at {} (from {})", folder, info_path);
        Ok(Utf8PathBuf::from(folder))
    }

    fn google_drive_folder(&self) -> Result<Utf8PathBuf, LocateError> {
        let legacy = self.home().join("Google Drive");
        if legacy.is_dir() {
            tracing::debug!("Found Google Drive folder at {}", legacy);
            return Ok(legacy);
        }

        match self.cloud_storage_drives()?.into_iter().next() {
            Some(drive) => {
                tracing::debug!("Found Google Drive folder at {}", drive);
                Ok(drive)
            }
            None => Err(LocateError::NotInstalled {
                client: "Google Drive",
                looked_at: legacy,
            }),
        }
    }

    fn copy_folder(&self) -> Result<Utf8PathBuf, LocateError> {
        Self::existing_dir("Copy", self.home().join("Copy"))
    }

    fn icloud_folder(&self) -> Result<Utf8PathBuf, LocateError> {
        Self::existing_dir(
            "iCloud",
            self.home()
                .join("Library")
                .join("Mobile Documents")
                .join("com~apple~CloudDocs"),
        )
    }
}
