//! Error types for the fleetwatch engine
//!
//! Structured error definitions use thiserror; anyhow errors coming from the
//! binary harness are folded into [`FleetError::Other`].

use thiserror::Error;

/// Main error type for fleet engine operations
#[derive(Error, Debug)]
pub enum FleetError {
    /// Operation referenced an unknown agent
    #[error("Agent not found: {0}")]
    NotFound(String),

    /// Numeric or structural input out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Agent id already registered
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Status change rejected by the strict transition policy
    #[error("Invalid status transition for {agent_id}: {from} -> {to}")]
    InvalidTransition {
        agent_id: String,
        from: String,
        to: String,
    },

    /// A lock guarding shared state was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    Lock(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for fleet engine operations
pub type Result<T> = std::result::Result<T, FleetError>;

/// Convert anyhow::Error to FleetError
impl From<anyhow::Error> for FleetError {
    fn from(err: anyhow::Error) -> Self {
        FleetError::Other(err.to_string())
    }
}

impl From<toml::de::Error> for FleetError {
    fn from(err: toml::de::Error) -> Self {
        FleetError::Config(format!("Failed to parse config: {}", err))
    }
}

impl From<toml::ser::Error> for FleetError {
    fn from(err: toml::ser::Error) -> Self {
        FleetError::Config(format!("Failed to serialize config: {}", err))
    }
}
