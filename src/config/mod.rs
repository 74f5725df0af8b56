pub mod parser;

use crate::environment::HostEnvironment;
use crate::models::{
    CUSTOM_APPS_DIR, Engine, LEGACY_SECTIONS, MACKUP_BACKUP_PATH, MACKUP_CONFIG_FILE,
    ResolvedConfig, UnknownEngine,
};
use crate::services::storage_detection::{FolderLocator, HostFolderLocator, LocateError};
use camino::{Utf8Path, Utf8PathBuf};
use parser::{IniDocument, ParseError, SectionSource};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use thiserror::Error;

const STORAGE_SECTION: &str = "storage";
const APPS_TO_IGNORE_SECTION: &str = "applications_to_ignore";
const APPS_TO_SYNC_SECTION: &str = "applications_to_sync";

/// Invalid values in an otherwise readable config file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown storage engine: {0}")]
    UnknownEngine(String),

    #[error("The required 'path' can't be found while the 'file_system' engine is used.")]
    MissingStoragePath,

    #[error("{0} cannot be used as a storage directory.")]
    ReservedDirectory(String),
}

impl From<UnknownEngine> for ConfigError {
    fn from(err: UnknownEngine) -> Self {
        ConfigError::UnknownEngine(err.0)
    }
}

/// Everything that can stop a configuration from being resolved.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The file still uses a section from the old config format.
    ///
    /// This is fatal: the caller must stop without doing anything, since the
    /// intent of an old-style file cannot be inferred safely.
    #[error(
        "Old config file detected. Aborting.\n\
         \n\
         An old section (e.g. [Allowed Applications] or [Ignored Applications]) \
         has been detected in your {path} file ([{section}]).\n\
         I'd rather do nothing than do something you do not want me to do.\n\
         \n\
         Please read the up to date documentation on <https://github.com/lra/mackup> \
         and migrate your configuration file."
    )]
    DeprecatedFormat { path: Utf8PathBuf, section: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: ParseError,
    },
}

impl ResolveError {
    /// Whether the process should terminate instead of reporting and carrying on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::DeprecatedFormat { .. })
    }
}

/// Where a configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// An existing config file, as an absolute path.
    File(Utf8PathBuf),
    /// No config file was found; defaults apply.
    NotFound { tried: Vec<Utf8PathBuf> },
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            ConfigSource::File(path) => Some(path),
            ConfigSource::NotFound { .. } => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path),
            ConfigSource::NotFound { tried } => {
                let tried: Vec<&str> = tried.iter().map(|p| p.as_str()).collect();
                write!(f, "no config file (tried: {})", tried.join(", "))
            }
        }
    }
}

/// Resolves and validates a Mackup config file.
///
/// Resolution runs in a fixed order:
/// 1. Locate the config file (missing files are not an error)
/// 2. Parse it
/// 3. Reject old-format sections
/// 4. Derive the engine, storage path, directory name and application sets
///
/// # Examples
///
/// ```ignore
/// let resolver = ConfigResolver::new(HostEnvironment::from_process()?);
/// let config = resolver.resolve(None)?;
/// println!("Backing up to {}", config.full_path());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver<L = HostFolderLocator> {
    env: HostEnvironment,
    locator: L,
}

impl ConfigResolver<HostFolderLocator> {
    /// Create a resolver that looks up cloud folders on the host.
    pub fn new(env: HostEnvironment) -> Self {
        let locator = HostFolderLocator::new(env.clone());
        Self { env, locator }
    }
}

impl<L: FolderLocator> ConfigResolver<L> {
    pub fn with_locator(env: HostEnvironment, locator: L) -> Self {
        Self { env, locator }
    }

    /// Find the config file to read.
    ///
    /// Without an explicit path, `$HOME/.mackup.cfg` is used. An explicit path is
    /// tried with `~` expanded, then under `$HOME`, then under the working
    /// directory. The first regular file wins.
    pub fn locate(&self, explicit: Option<&Utf8Path>) -> ConfigSource {
        let candidates = match explicit {
            None => vec![self.env.home().join(MACKUP_CONFIG_FILE)],
            Some(path) => vec![
                self.env.absolutize(&self.env.expand_tilde(path)),
                self.env.home().join(path),
                self.env.cwd().join(path),
            ],
        };

        if let Some(found) = candidates.iter().find(|p| p.is_file()) {
            return ConfigSource::File(self.env.absolutize(found));
        }

        match explicit {
            None => tracing::warn!(
                "Default config file {} not found, and no alternative filename given",
                candidates[0]
            ),
            Some(path) => tracing::warn!(
                "Config file {} not found! Tried paths: {:?}",
                path,
                candidates
            ),
        }
        ConfigSource::NotFound { tried: candidates }
    }

    /// Locate, read and validate the configuration.
    pub fn resolve(&self, explicit: Option<&Utf8Path>) -> Result<ResolvedConfig, ResolveError> {
        let source = self.locate(explicit);

        let document = match &source {
            ConfigSource::File(path) => {
                let text = fs::read_to_string(path).map_err(|source| ResolveError::Read {
                    path: path.clone(),
                    source,
                })?;
                let document = IniDocument::parse(&text).map_err(|source| ResolveError::Parse {
                    path: path.clone(),
                    source,
                })?;
                tracing::info!("Loaded config from {}", path);
                document
            }
            ConfigSource::NotFound { .. } => IniDocument::empty(),
        };

        self.resolve_document(&document, source)
    }

    /// Validate an already parsed document.
    pub fn resolve_document<S: SectionSource>(
        &self,
        document: &S,
        source: ConfigSource,
    ) -> Result<ResolvedConfig, ResolveError> {
        check_legacy_sections(document, &source)?;

        let engine = parse_engine(document)?;
        let path = self.parse_path(document, engine)?;
        let directory = parse_directory(document)?;
        let apps_to_ignore = parse_app_set(document, APPS_TO_IGNORE_SECTION);
        let apps_to_sync = parse_app_set(document, APPS_TO_SYNC_SECTION);

        tracing::debug!(
            "Resolved config: engine={}, path={}, directory={}, ignore={}, sync={}",
            engine,
            path,
            directory,
            apps_to_ignore.len(),
            apps_to_sync.len()
        );

        Ok(ResolvedConfig::new(
            engine,
            path,
            directory,
            apps_to_ignore,
            apps_to_sync,
            source,
        ))
    }

    fn parse_path<S: SectionSource>(
        &self,
        document: &S,
        engine: Engine,
    ) -> Result<Utf8PathBuf, ResolveError> {
        let path = match engine {
            Engine::Dropbox => self.locator.dropbox_folder()?,
            Engine::GoogleDrive => self.locator.google_drive_folder()?,
            Engine::Copy => self.locator.copy_folder()?,
            Engine::ICloud => self.locator.icloud_folder()?,
            // A bare `path` line has no value and counts as missing
            Engine::FileSystem => match document.get_option(STORAGE_SECTION, "path") {
                Some(path) => self.env.home().join(path),
                None => return Err(ConfigError::MissingStoragePath.into()),
            },
        };
        Ok(path)
    }
}

fn check_legacy_sections<S: SectionSource>(
    document: &S,
    source: &ConfigSource,
) -> Result<(), ResolveError> {
    match LEGACY_SECTIONS.iter().find(|s| document.has_section(s)) {
        Some(section) => {
            let path = source
                .path()
                .map(Utf8Path::to_path_buf)
                .unwrap_or_else(|| Utf8PathBuf::from(MACKUP_CONFIG_FILE));
            tracing::error!("Old config section [{}] detected in {}", section, path);
            Err(ResolveError::DeprecatedFormat {
                path,
                section: section.to_string(),
            })
        }
        None => Ok(()),
    }
}

fn parse_engine<S: SectionSource>(document: &S) -> Result<Engine, ConfigError> {
    if !document.has_option(STORAGE_SECTION, "engine") {
        return Ok(Engine::default());
    }
    let engine = document.get_option(STORAGE_SECTION, "engine").unwrap_or("");
    Ok(engine.parse::<Engine>()?)
}

fn parse_directory<S: SectionSource>(document: &S) -> Result<String, ConfigError> {
    match document.get_option(STORAGE_SECTION, "directory") {
        Some(CUSTOM_APPS_DIR) => Err(ConfigError::ReservedDirectory(CUSTOM_APPS_DIR.to_string())),
        Some(directory) => Ok(directory.to_string()),
        None => Ok(MACKUP_BACKUP_PATH.to_string()),
    }
}

fn parse_app_set<S: SectionSource>(document: &S, section: &str) -> BTreeSet<String> {
    document
        .option_names(section)
        .into_iter()
        .map(str::to_string)
        .collect()
}
