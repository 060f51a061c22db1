//! Path resolution for Orbit's configuration and log files.
//!
//! ```text
//! ~/.config/orbit/             # Config directory
//! ├── config.toml              # Client configuration
//! └── logs/                    # Application logs
//!     └── orbit.log.YYYY-MM-DD
//! ```

use std::path::{Path, PathBuf};

use orbit_core::error::{OrbitError, Result};

const APP_DIR: &str = "orbit";
const CONFIG_FILE: &str = "config.toml";
const LOGS_DIR: &str = "logs";

/// Resolves Orbit's directories, optionally under an explicit root.
///
/// With no root the platform config directory from `dirs` is used
/// (`$XDG_CONFIG_HOME` or `~/.config` on Linux). Tests pass a temporary
/// directory instead.
#[derive(Debug, Clone, Default)]
pub struct OrbitPaths {
    root: Option<PathBuf>,
}

impl OrbitPaths {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Returns the Orbit configuration directory.
    ///
    /// # Errors
    ///
    /// Returns a config error if the platform config directory cannot be
    /// determined.
    pub fn config_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| OrbitError::config("Cannot find home directory"))
    }

    /// Path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join(CONFIG_FILE))
    }

    /// Directory for rolling log files.
    pub fn logs_dir(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join(LOGS_DIR))
    }

    /// Creates `dir` (and its parents) if it does not exist yet.
    pub fn ensure_dir(dir: &Path) -> Result<()> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_is_used_verbatim() {
        let paths = OrbitPaths::new(Some(PathBuf::from("/tmp/orbit-test")));
        assert_eq!(paths.config_dir().unwrap(), PathBuf::from("/tmp/orbit-test"));
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/orbit-test/config.toml")
        );
        assert_eq!(paths.logs_dir().unwrap(), PathBuf::from("/tmp/orbit-test/logs"));
    }

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        OrbitPaths::ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        OrbitPaths::ensure_dir(&nested).unwrap();
    }
}
