//! Configuration service implementation.
//!
//! Loads [`OrbitConfig`] from `~/.config/orbit/config.toml`, writing a
//! default file on first run.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use orbit_core::config::OrbitConfig;
use orbit_core::error::{OrbitError, Result};

use crate::paths::OrbitPaths;

/// Loads and caches the client configuration.
///
/// The file is read lazily on first access; later calls return the cached
/// copy until [`ConfigService::invalidate_cache`] is called.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: OrbitPaths,
    /// Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<OrbitConfig>>>,
}

impl ConfigService {
    /// Creates a service reading from the platform config directory.
    pub fn new() -> Self {
        Self::with_paths(OrbitPaths::default())
    }

    /// Creates a service rooted at custom paths (used by tests).
    pub fn with_paths(paths: OrbitPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn paths(&self) -> &OrbitPaths {
        &self.paths
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        self.paths.config_file()
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// A missing file is created with defaults. A file that cannot be read
    /// or parsed falls back to defaults (logged) without being overwritten.
    pub fn get_config(&self) -> OrbitConfig {
        {
            let cached = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = cached.as_ref() {
                return config.clone();
            }
        }

        let loaded = match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[ConfigService] Falling back to default config: {}", e);
                OrbitConfig::default()
            }
        };

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        loaded
    }

    /// Reads the config file, creating it with defaults when missing.
    pub fn load(&self) -> Result<OrbitConfig> {
        let path = self.config_path()?;

        if !path.exists() {
            let config = OrbitConfig::default();
            self.save(&config)?;
            tracing::info!("[ConfigService] Created default config at {}", path.display());
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)?;
        let config: OrbitConfig = toml::from_str(&content)?;
        tracing::debug!("[ConfigService] Loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes `config` to disk and refreshes the cache.
    pub fn save(&self, config: &OrbitConfig) -> Result<()> {
        let path = self.config_path()?;
        if let Some(parent) = path.parent() {
            OrbitPaths::ensure_dir(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        write_atomic(&path, &content)?;

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(())
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Writes `content` next to `path` and renames it into place, so readers
/// see either the old file or the new one in full.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| OrbitError::config(format!("{} has no file name", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(content.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
