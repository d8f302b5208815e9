use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

pub mod provider_factory;
pub mod tokens;
pub use provider_factory::TokenProviderFactory;
pub use tokens::{
    CommandTokenProvider, EnvTokenProvider, FileTokenProvider, StaticTokenProvider, TokenError,
    TokenProvider,
};

const CONSOLE_CONFIG_SCHEMA: &str = include_str!("../contracts/console-config.v1.json");

pub const DEFAULT_POLICY_API_URL: &str = "https://chromepolicy.googleapis.com";
pub const DEFAULT_DIRECTORY_API_URL: &str = "https://admin.googleapis.com";
pub const DEFAULT_CUSTOMER: &str = "my_customer";
pub const DEFAULT_PAGE_SIZE: u32 = 500;
pub const DEFAULT_TOKEN_VAR: &str = "POLICY_CONSOLE_TOKEN";
pub const DEFAULT_CATEGORY: &str = "User Application settings";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    ConfigFileNotFound { path: String },

    #[error("Schema compilation failed: {message}")]
    SchemaCompilationFailed { message: String },

    #[error("Config validation failed")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("JSON parsing failed: {message}")]
    JsonParsingFailed { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub json_pointer: String,
    pub message: String,
    pub schema_path: String,
}

/// Where the console obtains its bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum TokenSource {
    Env {
        #[serde(default = "default_token_var")]
        var: String,
    },
    File {
        path: PathBuf,
    },
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for TokenSource {
    fn default() -> Self {
        TokenSource::Env {
            var: default_token_var(),
        }
    }
}

fn default_token_var() -> String {
    DEFAULT_TOKEN_VAR.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleConfig {
    pub policy_api_url: String,
    pub directory_api_url: String,
    pub customer: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub default_category: String,
    pub token: TokenSource,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            policy_api_url: DEFAULT_POLICY_API_URL.to_string(),
            directory_api_url: DEFAULT_DIRECTORY_API_URL.to_string(),
            customer: DEFAULT_CUSTOMER.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: 30,
            default_category: DEFAULT_CATEGORY.to_string(),
            token: TokenSource::default(),
        }
    }
}

impl ConsoleConfig {
    /// Environment variables win over file values for the endpoints and customer.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("POLICY_API_URL") {
            self.policy_api_url = url;
        }
        if let Ok(url) = std::env::var("DIRECTORY_API_URL") {
            self.directory_api_url = url;
        }
        if let Ok(customer) = std::env::var("POLICY_CUSTOMER") {
            self.customer = customer;
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: Self::find_config_path(),
        }
    }

    pub fn with_path<P: Into<PathBuf>>(config_path: P) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn find_config_path() -> PathBuf {
        if let Ok(path) = std::env::var("POLICY_CONSOLE_CONFIG") {
            return PathBuf::from(path);
        }

        let local = PathBuf::from(".policy-console/config.json");
        if local.exists() {
            return local;
        }

        dirs::config_dir()
            .map(|dir| dir.join("policy-console").join("config.json"))
            .unwrap_or(local)
    }

    /// Load the console config. A missing file yields defaults; env overrides apply either way.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<ConsoleConfig, ConfigError> {
        let mut config = if self.config_path.exists() {
            debug!("Loading console config from: {:?}", self.config_path);
            let value = read_json(&self.config_path)?;
            validate_config_value(&value)?;
            serde_json::from_value(value).map_err(|e| ConfigError::JsonParsingFailed {
                message: e.to_string(),
            })?
        } else {
            debug!(
                "Config file {:?} not found, using defaults",
                self.config_path
            );
            ConsoleConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Validate an explicit config file; unlike `load`, a missing file is an error.
    #[instrument(skip(self))]
    pub fn validate_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::ConfigFileNotFound {
                path: config_path.to_string_lossy().to_string(),
            });
        }

        let value = read_json(config_path)?;
        validate_config_value(&value)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        message: format!("Failed to read config file: {}", e),
    })?;

    serde_json::from_str(&content).map_err(|e| ConfigError::JsonParsingFailed {
        message: e.to_string(),
    })
}

pub fn validate_config_value(config: &Value) -> Result<(), ConfigError> {
    let schema_value: Value =
        serde_json::from_str(CONSOLE_CONFIG_SCHEMA).map_err(|e| ConfigError::JsonParsingFailed {
            message: e.to_string(),
        })?;

    let schema = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_value)
        .map_err(|e| ConfigError::SchemaCompilationFailed {
            message: e.to_string(),
        })?;

    if let Err(errors) = schema.validate(config) {
        let validation_errors: Vec<ValidationError> = errors
            .map(|error| ValidationError {
                json_pointer: error.instance_path.to_string(),
                message: error.to_string(),
                schema_path: error.schema_path.to_string(),
            })
            .collect();

        return Err(ConfigError::ValidationFailed {
            errors: validation_errors,
        });
    }

    Ok(())
}
