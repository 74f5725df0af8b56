use crate::config::ConfigSource;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the config file looked up in `$HOME` when no explicit path is given.
pub const MACKUP_CONFIG_FILE: &str = ".mackup.cfg";

/// Default name of the backup directory created under the storage path.
pub const MACKUP_BACKUP_PATH: &str = "Mackup";

/// Directory holding user-defined application definitions.
///
/// Reserved: it can never be used as the backup directory.
pub const CUSTOM_APPS_DIR: &str = ".mackup";

/// Sections written by old releases of the config format.
pub const LEGACY_SECTIONS: [&str; 2] = ["Allowed Applications", "Ignored Applications"];

/// Storage backend holding the backup directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    #[default]
    Dropbox,
    GoogleDrive,
    Copy,
    #[serde(rename = "icloud")]
    ICloud,
    FileSystem,
}

impl Engine {
    /// Every engine, in the order they are documented.
    pub const ALL: [Engine; 5] = [
        Engine::Dropbox,
        Engine::GoogleDrive,
        Engine::Copy,
        Engine::ICloud,
        Engine::FileSystem,
    ];

    /// The identifier used for this engine in the config file.
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Dropbox => "dropbox",
            Engine::GoogleDrive => "google_drive",
            Engine::Copy => "copy",
            Engine::ICloud => "icloud",
            Engine::FileSystem => "file_system",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the engine identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown storage engine: {0}")]
pub struct UnknownEngine(pub String);

impl FromStr for Engine {
    type Err = UnknownEngine;

    /// Identifiers are matched exactly; `Dropbox` or ` dropbox` are not engines.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Engine::ALL
            .into_iter()
            .find(|engine| engine.as_str() == s)
            .ok_or_else(|| UnknownEngine(s.to_string()))
    }
}

/// Fully validated Mackup configuration.
///
/// Built once by [`ConfigResolver`](crate::config::ConfigResolver); every accessor
/// is infallible because all validation happens during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    engine: Engine,
    path: Utf8PathBuf,
    directory: String,
    apps_to_ignore: BTreeSet<String>,
    apps_to_sync: BTreeSet<String>,
    source: ConfigSource,
}

impl ResolvedConfig {
    pub(crate) fn new(
        engine: Engine,
        path: Utf8PathBuf,
        directory: String,
        apps_to_ignore: BTreeSet<String>,
        apps_to_sync: BTreeSet<String>,
        source: ConfigSource,
    ) -> Self {
        Self {
            engine,
            path,
            directory,
            apps_to_ignore,
            apps_to_sync,
            source,
        }
    }

    /// The storage engine.
    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Directory in which the backup directory lives.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Name of the backup directory, `Mackup` unless overridden.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Full path of the backup directory: [`path`](Self::path) joined with
    /// [`directory`](Self::directory).
    pub fn full_path(&self) -> Utf8PathBuf {
        self.path.join(&self.directory)
    }

    /// Applications excluded from synchronization.
    pub fn apps_to_ignore(&self) -> &BTreeSet<String> {
        &self.apps_to_ignore
    }

    /// Applications explicitly selected for synchronization.
    pub fn apps_to_sync(&self) -> &BTreeSet<String> {
        &self.apps_to_sync
    }

    pub fn is_app_ignored(&self, app: &str) -> bool {
        self.apps_to_ignore.contains(app)
    }

    pub fn is_app_synced(&self, app: &str) -> bool {
        self.apps_to_sync.contains(app)
    }

    /// Where the configuration was read from, for diagnostics.
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str, directory: &str) -> ResolvedConfig {
        ResolvedConfig::new(
            Engine::FileSystem,
            Utf8PathBuf::from(path),
            directory.to_string(),
            BTreeSet::from(["safari".to_string()]),
            BTreeSet::new(),
            ConfigSource::NotFound { tried: Vec::new() },
        )
    }

    #[test]
    fn test_engine_identifiers_round_trip() {
        for engine in Engine::ALL {
            assert_eq!(engine.as_str().parse::<Engine>(), Ok(engine));
            assert_eq!(engine.to_string(), engine.as_str());
        }
    }

    #[test]
    fn test_engine_parse_is_exact() {
        assert!("Dropbox".parse::<Engine>().is_err());
        assert!(" dropbox".parse::<Engine>().is_err());
        assert_eq!(
            "ftp".parse::<Engine>().unwrap_err().to_string(),
            "Unknown storage engine: ftp"
        );
        assert!("filesystem".parse::<Engine>().is_err());
        assert_eq!(
            "box".parse::<Engine>(),
            Err(UnknownEngine("box".to_string()))
        );
    }

    #[test]
    fn test_engine_default_is_dropbox() {
        assert_eq!(Engine::default(), Engine::Dropbox);
    }

    #[test]
    fn test_engine_serializes_as_identifier() {
        for engine in Engine::ALL {
            let json = serde_json::to_string(&engine).unwrap();
            assert_eq!(json, format!("\"{}\"", engine.as_str()));
        }
    }

    #[test]
    fn test_full_path_joins_path_and_directory() {
        let config = sample("/home/u/backups", "Dotfiles");
        assert_eq!(config.full_path(), Utf8PathBuf::from("/home/u/backups/Dotfiles"));
    }

    #[test]
    fn test_membership_helpers() {
        let config = sample("/tmp", MACKUP_BACKUP_PATH);
        assert!(config.is_app_ignored("safari"));
        assert!(!config.is_app_ignored("chrome"));
        assert!(!config.is_app_synced("safari"));
    }
}
