use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::attachments::AttachmentPolicy;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub attachments: AttachmentLimitsConfig,
    pub transfer: TransferConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentLimitsConfig {
    pub draft_max_bytes: u64,
    pub manual_max_bytes: u64,
    pub max_files: usize,
    pub allowed_types: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferConfig {
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub attachment_max_files: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://signoff.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            attachments: AttachmentLimitsConfig {
                draft_max_bytes: 10 * 1024 * 1024,
                manual_max_bytes: 50 * 1024 * 1024,
                max_files: 5,
                allowed_types: Vec::new(),
            },
            transfer: TransferConfig { timeout_secs: 60 },
        }
    }
}

impl AppConfig {
    /// Precedence: defaults, then the TOML file, then `SIGNOFF_*` env vars,
    /// then programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = options.config_path {
            match fs::read_to_string(&path) {
                Ok(raw) => {
                    let patch: ConfigPatch = toml::from_str(&raw)
                        .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
                    config.apply_patch(patch);
                }
                Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                    if options.require_file {
                        return Err(ConfigError::MissingConfigFile(path));
                    }
                }
                Err(source) => return Err(ConfigError::ReadFile { path, source }),
            }
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn draft_attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy {
            max_bytes: self.attachments.draft_max_bytes,
            max_files: self.attachments.max_files,
            allowed_types: self.attachments.allowed_types.clone(),
        }
    }

    pub fn manual_attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy {
            max_bytes: self.attachments.manual_max_bytes,
            max_files: self.attachments.max_files,
            allowed_types: self.attachments.allowed_types.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }
        if let Some(attachments) = patch.attachments {
            if let Some(draft_max_bytes) = attachments.draft_max_bytes {
                self.attachments.draft_max_bytes = draft_max_bytes;
            }
            if let Some(manual_max_bytes) = attachments.manual_max_bytes {
                self.attachments.manual_max_bytes = manual_max_bytes;
            }
            if let Some(max_files) = attachments.max_files {
                self.attachments.max_files = max_files;
            }
            if let Some(allowed_types) = attachments.allowed_types {
                self.attachments.allowed_types = allowed_types;
            }
        }
        if let Some(transfer) = patch.transfer {
            if let Some(timeout_secs) = transfer.timeout_secs {
                self.transfer.timeout_secs = timeout_secs;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = read_env("SIGNOFF_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(raw) = read_env("SIGNOFF_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SIGNOFF_DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = read_env("SIGNOFF_DB_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SIGNOFF_DB_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = read_env("SIGNOFF_ATTACH_DRAFT_MAX_BYTES") {
            self.attachments.draft_max_bytes = parse_u64("SIGNOFF_ATTACH_DRAFT_MAX_BYTES", &raw)?;
        }
        if let Some(raw) = read_env("SIGNOFF_ATTACH_MANUAL_MAX_BYTES") {
            self.attachments.manual_max_bytes = parse_u64("SIGNOFF_ATTACH_MANUAL_MAX_BYTES", &raw)?;
        }
        if let Some(raw) = read_env("SIGNOFF_ATTACH_MAX_FILES") {
            self.attachments.max_files = parse_u64("SIGNOFF_ATTACH_MAX_FILES", &raw)? as usize;
        }
        if let Some(raw) = read_env("SIGNOFF_ATTACH_ALLOWED_TYPES") {
            self.attachments.allowed_types = raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = read_env("SIGNOFF_TRANSFER_TIMEOUT_SECS") {
            self.transfer.timeout_secs = parse_u64("SIGNOFF_TRANSFER_TIMEOUT_SECS", &raw)?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(max_files) = overrides.attachment_max_files {
            self.attachments.max_files = max_files;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.attachments.max_files == 0 {
            return Err(ConfigError::Validation(
                "attachments.max_files must be at least 1".to_string(),
            ));
        }
        if self.attachments.draft_max_bytes == 0 || self.attachments.manual_max_bytes == 0 {
            return Err(ConfigError::Validation(
                "attachment size limits must be positive".to_string(),
            ));
        }
        if self.transfer.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "transfer.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    attachments: Option<AttachmentsPatch>,
    transfer: Option<TransferPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AttachmentsPatch {
    draft_max_bytes: Option<u64>,
    manual_max_bytes: Option<u64>,
    max_files: Option<usize>,
    allowed_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct TransferPatch {
    timeout_secs: Option<u64>,
}
