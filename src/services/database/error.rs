//! Error taxonomy shared by every adapter.
//!
//! Connect-time failures propagate to the caller as `AdapterError`. Query and
//! catalog failures are folded into `QueryResult` values or empty listings
//! inside the adapters and never surface here.

use thiserror::Error;

/// Errors raised by adapters, the factory and the connection manager.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The native handshake or a verification query failed.
    #[error("{engine} connection failed: {message}")]
    Connection {
        engine: &'static str,
        message: String,
    },

    /// The native driver for this engine was not compiled in.
    #[error("{engine} driver is not available. Rebuild with the '{feature}' feature enabled")]
    DependencyMissing {
        engine: &'static str,
        feature: &'static str,
    },

    /// An argument was rejected before any I/O happened.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Not connected to database")]
    NotConnected,

    #[error("{0}")]
    Execution(String),

    /// A required file or driver library does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl AdapterError {
    /// Wrap any displayable driver error as a connection failure.
    pub fn connection(engine: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Connection {
            engine,
            message: err.to_string(),
        }
    }

    /// Wrap any displayable driver error as an execution failure.
    pub fn execution(err: impl std::fmt::Display) -> Self {
        Self::Execution(err.to_string())
    }
}
