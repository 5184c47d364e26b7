//! Configuration file for tracko
//!
//! A single TOML file holds the tracked author, the tracked repositories and
//! the state database location. It is loaded once at startup and handed to
//! the import as an immutable value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::import::{DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY};
use crate::model::AuthorFilter;
use crate::repository::is_git_repository;

pub const CURRENT_VERSION: &str = "v1";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Config format version, set by `init` and never edited
    #[serde(default)]
    pub version: String,

    /// SQLite state database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Repository commits would be exported to
    #[serde(default)]
    pub target_repo: String,

    /// Absolute paths of the repositories to import from
    #[serde(default)]
    pub tracked_repos: Vec<PathBuf>,

    #[serde(default)]
    pub author: AuthorConfig,

    #[serde(default)]
    pub import: ImportSettings,
}

/// The identity whose commits are imported
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthorConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub emails: Vec<String>,
}

/// Import pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportSettings {
    /// Commits per database transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Commits buffered between scanners and the writer
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_db_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("tracko").join("tracko.db"))
        .unwrap_or_else(|| PathBuf::from("tracko.db"))
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            db_path: default_db_path(),
            target_repo: String::new(),
            tracked_repos: Vec::new(),
            author: AuthorConfig::default(),
            import: ImportSettings::default(),
        }
    }
}

/// Default config file location: `<config dir>/tracko/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("tracko").join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

impl AppConfig {
    /// Fresh configuration for `name` / `emails` with everything else defaulted
    pub fn new(name: impl Into<String>, emails: Vec<String>) -> Self {
        Self {
            author: AuthorConfig { name: name.into(), emails },
            ..Self::default()
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotInitialized(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content)?;

        if config.version.is_empty() {
            return Err(ConfigError::NotInitialized(path.to_path_buf()));
        }

        tracing::debug!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Create parent directory if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)?;

        tracing::debug!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate the values an import depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if self.version != CURRENT_VERSION {
            return Err(invalid("version", &format!("unsupported version '{}'", self.version)));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(invalid("db_path", "must not be empty"));
        }
        if self.author.name.trim().is_empty() {
            return Err(invalid("author.name", "must not be empty"));
        }
        if self.author.emails.is_empty() {
            return Err(invalid("author.emails", "at least one email is required"));
        }
        if self.import.batch_size == 0 {
            return Err(invalid("import.batch_size", "must be greater than 0"));
        }
        if self.import.channel_capacity == 0 {
            return Err(invalid("import.channel_capacity", "must be greater than 0"));
        }

        Ok(())
    }

    /// The author filter handed to the import
    pub fn author_filter(&self) -> AuthorFilter {
        AuthorFilter::new(self.author.name.clone(), self.author.emails.iter().cloned())
    }

    /// Database location as the store expects it
    pub fn db_location(&self) -> String {
        self.db_path.to_string_lossy().into_owned()
    }

    /// Track a repository; the path must be a git repository not tracked yet
    pub fn add_tracked_repo(&mut self, path: &Path) -> Result<PathBuf, ConfigError> {
        let path = absolute(path)?;

        if !is_git_repository(&path) {
            return Err(ConfigError::NotAGitRepository(path));
        }
        if self.tracked_repos.contains(&path) {
            return Err(ConfigError::AlreadyTracked(path));
        }

        self.tracked_repos.push(path.clone());
        Ok(path)
    }

    /// Stop tracking a repository. Imported commits stay in the database.
    pub fn remove_tracked_repo(&mut self, path: &Path) -> Result<PathBuf, ConfigError> {
        let path = absolute(path)?;

        let Some(index) = self.tracked_repos.iter().position(|p| *p == path) else {
            return Err(ConfigError::NotTracked(path));
        };
        Ok(self.tracked_repos.remove(index))
    }

    /// Render one field for display
    pub fn get(&self, field: ConfigField) -> String {
        match field {
            ConfigField::Version => self.version.clone(),
            ConfigField::DbPath => self.db_path.display().to_string(),
            ConfigField::AuthorName => self.author.name.clone(),
            ConfigField::AuthorEmails => self.author.emails.join(","),
            ConfigField::TargetRepo => self.target_repo.clone(),
            ConfigField::BatchSize => self.import.batch_size.to_string(),
            ConfigField::ChannelCapacity => self.import.channel_capacity.to_string(),
        }
    }

    /// Parse `value` for `field` and store it
    pub fn set(&mut self, field: ConfigField, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match field {
            ConfigField::Version => {
                return Err(ConfigError::RestrictedField(field.key().to_string()));
            }
            ConfigField::DbPath => {
                if value.is_empty() {
                    return Err(invalid_value(field, "must not be empty"));
                }
                self.db_path = PathBuf::from(value);
            }
            ConfigField::AuthorName => {
                if value.is_empty() {
                    return Err(invalid_value(field, "must not be empty"));
                }
                self.author.name = value.to_string();
            }
            ConfigField::AuthorEmails => {
                let emails: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from)
                    .collect();
                if emails.is_empty() {
                    return Err(invalid_value(field, "at least one email is required"));
                }
                self.author.emails = emails;
            }
            ConfigField::TargetRepo => self.target_repo = value.to_string(),
            ConfigField::BatchSize => self.import.batch_size = parse_positive(field, value)?,
            ConfigField::ChannelCapacity => self.import.channel_capacity = parse_positive(field, value)?,
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid_value(field: ConfigField, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: field.key().to_string(),
        reason: reason.to_string(),
    }
}

fn parse_positive(field: ConfigField, value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid_value(field, &format!("expected a positive integer, got '{}'", value))),
    }
}

/// Configuration fields addressable by key from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Version,
    DbPath,
    AuthorName,
    AuthorEmails,
    TargetRepo,
    BatchSize,
    ChannelCapacity,
}

impl ConfigField {
    pub const ALL: [ConfigField; 7] = [
        ConfigField::Version,
        ConfigField::DbPath,
        ConfigField::AuthorName,
        ConfigField::AuthorEmails,
        ConfigField::TargetRepo,
        ConfigField::BatchSize,
        ConfigField::ChannelCapacity,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ConfigField::Version => "version",
            ConfigField::DbPath => "db_path",
            ConfigField::AuthorName => "author.name",
            ConfigField::AuthorEmails => "author.emails",
            ConfigField::TargetRepo => "target_repo",
            ConfigField::BatchSize => "import.batch_size",
            ConfigField::ChannelCapacity => "import.channel_capacity",
        }
    }

    /// Restricted fields can be read but never set
    pub fn is_restricted(self) -> bool {
        matches!(self, ConfigField::Version)
    }
}

impl FromStr for ConfigField {
    type Err = ConfigError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        ConfigField::ALL
            .into_iter()
            .find(|field| field.key() == key)
            .ok_or_else(|| ConfigError::UnknownField(key.to_string()))
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
