use config_loader::TokenError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Policy API request failed: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid policy API response: {message}")]
    InvalidResponse { message: String },
}

impl PolicyError {
    /// Server-provided (or transport) message, without the error-kind prefix.
    pub fn message(&self) -> &str {
        match self {
            PolicyError::Auth { message }
            | PolicyError::Transport { message, .. }
            | PolicyError::InvalidResponse { message } => message,
        }
    }
}

impl From<TokenError> for PolicyError {
    fn from(err: TokenError) -> Self {
        PolicyError::Auth {
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Policy {schema} is marked to inherit and cannot be edited")]
    SchemaLocked { schema: String },

    #[error("Unknown policy schema: {schema}")]
    UnknownSchema { schema: String },

    #[error("Policy {schema} has no field named {field}")]
    UnknownField { schema: String, field: String },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown policy category: {category}")]
    UnknownCategory { category: String },

    #[error("Unknown org unit: {selector}")]
    UnknownOrgUnit { selector: String },

    #[error("Failed to load org units: {0}")]
    Directory(#[source] PolicyError),

    #[error(transparent)]
    Edit(#[from] EditError),
}
