//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for resolv.conf operations.
pub type Result<T> = std::result::Result<T, ResolvConfError>;

/// Errors returned by resolv.conf operations.
#[derive(Debug, Error)]
pub enum ResolvConfError {
    /// Filesystem I/O failed outside of a specific read or write path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external file exists but could not be stat'ed, opened or read.
    ///
    /// Ingested state has already been cleared when this is returned.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The external file.
        path: PathBuf,
        /// The underlying failure.
        source: std::io::Error,
    },

    /// The managed copy could not be written or installed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// The managed copy.
        path: PathBuf,
        /// The underlying failure.
        source: std::io::Error,
    },

    /// A nameserver address could not be parsed.
    #[error("invalid DNS server address '{input}': {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A search domain could not be parsed.
    #[error("invalid search domain '{input}': {reason}")]
    InvalidDomain {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl ResolvConfError {
    pub(crate) fn address(input: &str, reason: &'static str) -> Self {
        Self::InvalidAddress {
            input: input.to_string(),
            reason,
        }
    }

    pub(crate) fn domain(input: &str, reason: &'static str) -> Self {
        Self::InvalidDomain {
            input: input.to_string(),
            reason,
        }
    }

    fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io(e) | Self::Read { source: e, .. } | Self::Write { source: e, .. } => Some(e),
            Self::InvalidAddress { .. } | Self::InvalidDomain { .. } => None,
        }
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.io_source()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
    }

    /// Returns `true` if the underlying I/O error is `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.io_source()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
    }
}
