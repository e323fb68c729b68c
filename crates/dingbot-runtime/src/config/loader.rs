//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: `dingbot.toml`, `config.toml`
//! - `yaml-config`: `dingbot.yaml`, `config.yaml` and their `.yml` forms
//!
//! # Layers (lowest to highest)
//!
//! 1. [`DingbotConfig::default`]
//! 2. [`ConfigLoader::merge`] overrides
//! 3. `dingbot.{profile}.<ext>` next to the base file
//! 4. the base file, one per enabled format
//! 5. `DINGBOT_*` environment variables
//!
//! # Environment Variable Mapping
//!
//! Variables use the `DINGBOT_` prefix with `__` as the nesting separator:
//!
//! - `DINGBOT_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `DINGBOT_ROBOT__SECRET=SEC...` → `robot.secret = "SEC..."`
//! - `DINGBOT_ROBOT__TOKENS=[a,b]` → `robot.tokens = ["a", "b"]`
//! - `DINGBOT_OUTGOING__PORT=9000` → `outgoing.port = 9000`
//!
//! # Example
//!
//! ```rust,ignore
//! use dingbot_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./deploy/dingbot.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::DingbotConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DINGBOT_";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod`/`dev` are accepted as shorthands.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `DINGBOT_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("DINGBOT_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A configuration file format enabled at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl ConfigFormat {
    /// Enabled formats in search order.
    pub const ENABLED: &'static [ConfigFormat] = &[
        #[cfg(feature = "toml-config")]
        ConfigFormat::Toml,
        #[cfg(feature = "yaml-config")]
        ConfigFormat::Yaml,
    ];

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    #[cfg_attr(
        not(any(feature = "toml-config", feature = "yaml-config")),
        allow(unused_variables)
    )]
    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(Yaml::file(path)),
        }
    }
}

/// File stems tried in each search directory, most specific first.
const FILE_STEMS: &[&str] = &["dingbot", "config"];

/// Builds a [`DingbotConfig`] from defaults, overrides, files and the
/// environment.
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            config_file: None,
            load_env: true,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search. Without any, the current directory and
    /// `<user config dir>/dingbot` are searched.
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Loads exactly this file instead of searching.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers `config` above the defaults and below files and environment.
    pub fn merge(mut self, config: DingbotConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    pub fn load(self) -> ConfigResult<DingbotConfig> {
        let files = self.config_files()?;

        let mut figment = Figment::from(Serialized::defaults(DingbotConfig::default()))
            .merge(self.overrides);
        for (format, path) in &files {
            debug!(path = %path.display(), "Merging configuration file");
            figment = format.merge(figment, path);
        }
        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Merging environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: DingbotConfig = figment.extract()?;
        info!(
            profile = %self.profile,
            files = files.len(),
            robot_tokens = config.robot.tokens.len(),
            outgoing_enabled = config.outgoing.enabled,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Files to merge, lowest priority first.
    fn config_files(&self) -> ConfigResult<Vec<(ConfigFormat, PathBuf)>> {
        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            let format = ConfigFormat::from_path(path).ok_or_else(|| {
                ConfigError::UnsupportedFormat {
                    path: path.clone(),
                    extension: path
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or_default()
                        .to_string(),
                }
            })?;
            return Ok(vec![(format, path.clone())]);
        }

        let dirs = self.search_dirs();
        let mut files = Vec::new();
        for &format in ConfigFormat::ENABLED {
            if let Some(found) = self.discover(format, &dirs) {
                files.extend(found);
            }
        }
        if files.is_empty() {
            warn!(paths = ?dirs, "No configuration file found, using defaults");
        }
        Ok(files)
    }

    /// First `<stem>.<ext>` found across `dirs`, preceded by its
    /// `<stem>.<profile>.<ext>` sibling when one exists.
    fn discover(
        &self,
        format: ConfigFormat,
        dirs: &[PathBuf],
    ) -> Option<Vec<(ConfigFormat, PathBuf)>> {
        let profile = self.profile.as_str();
        for dir in dirs {
            for stem in FILE_STEMS {
                for ext in format.extensions() {
                    let base = dir.join(format!("{stem}.{ext}"));
                    if !base.exists() {
                        continue;
                    }
                    let mut found = Vec::with_capacity(2);
                    let profiled = dir.join(format!("{stem}.{profile}.{ext}"));
                    if profiled.exists() {
                        found.push((format, profiled));
                    }
                    found.push((format, base));
                    return Some(found);
                }
            }
        }
        None
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|d| d.join("dingbot")))
            .collect()
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<DingbotConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<DingbotConfig> {
    ConfigLoader::new().file(path.as_ref()).load()
}

// =============================================================================
// Tests
// =============================================================================
