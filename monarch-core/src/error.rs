//! Kernel-wide error type.
//!
//! Error *kinds* mirror the taxonomy the kernel actually needs to
//! distinguish: a guard rejecting an operation is not the same failure as a
//! module dependency cycle, and callers need to be able to tell them apart
//! without downcasting.

use std::fmt;

/// A specialized [`Result`] type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A guard permanently rejected an operation (it was marked canceled).
    #[error("operation unsupported: {0}")]
    UnsupportedOperation(String),

    /// A module load failed due to a missing, cyclic, or version-mismatched
    /// dependency.
    #[error("module dependency violation: {0}")]
    DependencyViolation(String),

    /// A fiber stack or dispatcher thread could not be allocated.
    #[error("resource exhausted: {0}")]
    ResourceExhaustion(String),

    /// An operation or fiber was externally interrupted.
    #[error("canceled")]
    Cancellation,

    /// A method was called while the component was in the wrong state
    /// (e.g. `stop` before `start`).
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// A wrapped error from a collaborator (I/O, dynamic loader, etc).
    #[error("external failure: {0}")]
    External(#[from] ExternalError),
}

/// A boxed external failure, preserving its source as a causal chain.
#[derive(Debug)]
pub struct ExternalError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ExternalError {
    pub fn new<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ExternalError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        ExternalError {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for ExternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExternalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::External(ExternalError::new("io error", e))
    }
}
