//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Configuration file (`wyrm.toml` / `config.toml` from the search
//!    paths, or an explicitly given file)
//! 3. Environment variables (`WYRM_*`)
//! 4. Programmatic overrides via [`ConfigLoader::merge`]
//!
//! Environment variables are mapped using the `WYRM_` prefix with `__` as
//! separator: `WYRM_LOGGING__LEVEL=debug` becomes `logging.level = "debug"`.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::WyrmConfig;

/// File names searched for, in order, in each search path.
const FILE_NAMES: [&str; 2] = ["wyrm.toml", "config.toml"];

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: WyrmConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<WyrmConfig> {
        let figment = self.build_figment()?;
        let config: WyrmConfig = figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        debug!(
            name = %config.name,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(WyrmConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else {
            figment = self.search_config_files(figment);
        }

        if self.load_env {
            figment = figment.merge(
                Env::prefixed("WYRM_")
                    .split("__")
                    .map(|key| key.as_str().replace("__", ".").into()),
            );
        }

        Ok(figment)
    }

    fn search_config_files(&self, mut figment: Figment) -> Figment {
        for search_path in &self.search_paths {
            for name in FILE_NAMES {
                let path = search_path.join(name);
                if path.exists() {
                    info!(path = %path.display(), "Loading configuration file");
                    figment = figment.merge(Toml::file(path));
                    return figment;
                }
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}
