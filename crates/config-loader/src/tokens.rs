//! Bearer token providers.
//!
//! The console never runs an OAuth flow itself; it asks a [`TokenProvider`]
//! for a token before each API call.

use once_cell::sync::OnceCell;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("No access token available: {message}")]
    Unavailable { message: String },

    #[error("Access token is empty")]
    Empty,

    #[error("Token command failed: {message}")]
    CommandFailed { message: String },
}

pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Result<String, TokenError>;
}

fn non_empty(raw: &str) -> Result<String, TokenError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }
    Ok(token.to_string())
}

/// Fixed token, mostly for tests and one-off scripts.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> Result<String, TokenError> {
        non_empty(&self.token)
    }
}

/// Reads the token from an environment variable on every call.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new<S: Into<String>>(var: S) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TOKEN_VAR)
    }
}

impl TokenProvider for EnvTokenProvider {
    fn token(&self) -> Result<String, TokenError> {
        let value = env::var(&self.var).map_err(|_| TokenError::Unavailable {
            message: format!("environment variable {} is not set", self.var),
        })?;
        non_empty(&value)
    }
}

/// Reads the token from a file once and caches it.
pub struct FileTokenProvider {
    path: PathBuf,
    cached: OnceCell<String>,
}

impl FileTokenProvider {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cached: OnceCell::new(),
        }
    }
}

impl TokenProvider for FileTokenProvider {
    fn token(&self) -> Result<String, TokenError> {
        self.cached
            .get_or_try_init(|| {
                debug!("Loading access token from file: {:?}", self.path);
                let content =
                    fs::read_to_string(&self.path).map_err(|e| TokenError::Unavailable {
                        message: format!("failed to read {}: {}", self.path.display(), e),
                    })?;
                non_empty(&content)
            })
            .cloned()
    }
}

/// Runs an external command (e.g. `gcloud auth print-access-token`) once and caches its stdout.
pub struct CommandTokenProvider {
    program: String,
    args: Vec<String>,
    cached: OnceCell<String>,
}

impl CommandTokenProvider {
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cached: OnceCell::new(),
        }
    }
}

impl TokenProvider for CommandTokenProvider {
    fn token(&self) -> Result<String, TokenError> {
        self.cached
            .get_or_try_init(|| {
                debug!("Obtaining access token from command: {}", self.program);
                let output = Command::new(&self.program)
                    .args(&self.args)
                    .output()
                    .map_err(|e| TokenError::CommandFailed {
                        message: format!("failed to spawn {}: {}", self.program, e),
                    })?;

                if !output.status.success() {
                    return Err(TokenError::CommandFailed {
                        message: format!(
                            "{} exited with {}: {}",
                            self.program,
                            output.status,
                            String::from_utf8_lossy(&output.stderr).trim()
                        ),
                    });
                }

                non_empty(&String::from_utf8_lossy(&output.stdout))
            })
            .cloned()
    }
}
