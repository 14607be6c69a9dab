//! The facade-level error type: wraps [`monarch_core::Error`] and adds the
//! failure modes of the collaborator modules (config loading, I/O) so a
//! hosting binary can propagate one error type end to end.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] monarch_core::Error),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
