use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Failure to read the host environment.
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("HOME environment variable is not set")]
    HomeNotSet,

    #[error("HOME is not valid UTF-8: {0:?}")]
    HomeNotUtf8(std::ffi::OsString),

    #[error("Cannot determine current directory: {0}")]
    CurrentDir(#[from] std::io::Error),

    #[error("Current directory is not valid UTF-8: {0:?}")]
    CurrentDirNotUtf8(std::path::PathBuf),
}

/// The parts of the process environment that configuration resolution depends on.
///
/// Resolution never reads `HOME` or the working directory on its own; callers
/// build a `HostEnvironment` once and pass it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    home: Utf8PathBuf,
    cwd: Utf8PathBuf,
}

impl HostEnvironment {
    pub fn new(home: impl Into<Utf8PathBuf>, cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
        }
    }

    /// Capture the environment of the running process.
    ///
    /// Uses the `HOME` variable itself rather than the platform's notion of the
    /// user profile, so that existing configs and test setups overriding `HOME`
    /// keep working.
    pub fn from_process() -> Result<Self, EnvironmentError> {
        let home = match std::env::var_os("HOME") {
            Some(home) => home
                .into_string()
                .map_err(EnvironmentError::HomeNotUtf8)?,
            None => return Err(EnvironmentError::HomeNotSet),
        };

        let cwd = std::env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd)
            .map_err(|e| EnvironmentError::CurrentDirNotUtf8(e.into_path_buf()))?;

        Ok(Self::new(home, cwd))
    }

    pub fn home(&self) -> &Utf8Path {
        &self.home
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Expand a leading `~` the way a shell does for the current user.
    ///
    /// Only `~` and `~/...` are expanded; `~otheruser/...` is returned unchanged.
    pub fn expand_tilde(&self, path: &Utf8Path) -> Utf8PathBuf {
        let raw = path.as_str();
        if raw == "~" {
            return self.home.clone();
        }
        match raw.strip_prefix("~/") {
            Some(rest) => self.home.join(rest),
            None => path.to_path_buf(),
        }
    }

    /// Make `path` absolute against the working directory.
    pub fn absolutize(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> HostEnvironment {
        HostEnvironment::new("/home/u", "/work")
    }

    #[test]
    fn test_expand_tilde_alone() {
        assert_eq!(env().expand_tilde(Utf8Path::new("~")), "/home/u");
    }

    #[test]
    fn test_expand_tilde_prefix() {
        assert_eq!(
            env().expand_tilde(Utf8Path::new("~/cfg/.mackup.cfg")),
            "/home/u/cfg/.mackup.cfg"
        );
    }

    #[test]
    fn test_expand_tilde_leaves_other_users_and_plain_paths() {
        assert_eq!(env().expand_tilde(Utf8Path::new("~bob/x")), "~bob/x");
        assert_eq!(env().expand_tilde(Utf8Path::new("a/~/b")), "a/~/b");
        assert_eq!(env().expand_tilde(Utf8Path::new("/etc/x")), "/etc/x");
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(env().absolutize(Utf8Path::new("rel/f")), "/work/rel/f");
        assert_eq!(env().absolutize(Utf8Path::new("/abs/f")), "/abs/f");
    }
}
