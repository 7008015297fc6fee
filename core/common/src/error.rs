//! Common error types for Xela.

use std::fmt;

use thiserror::Error;

/// Top-level error type for Xela operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The vault configuration is missing, unreadable or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A key has the wrong size or could not be produced.
    #[error("Key error: {0}")]
    Key(String),

    /// A buffer does not have the mandated size.
    #[error("Size error: {what} must be {expected} bytes, got {actual}")]
    Size {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Stored data does not decode under the current key.
    #[error("Corruption: {0}")]
    Corruption(String),

    /// The secure random source failed.
    #[error("Randomness error: {0}")]
    Randomness(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

/// Coarse classification of an [`Error`].
///
/// `InvalidInput` covers requests that are wrong in themselves (an empty
/// password, an unusable name, reading a directory), whether the vault or
/// the backend noticed. Every other failure reported by a storage
/// collaborator is `Backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Key,
    Size,
    Corruption,
    Randomness,
    InvalidInput,
    Backend,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Key(_) => ErrorKind::Key,
            Error::Size { .. } => ErrorKind::Size,
            Error::Corruption(_) => ErrorKind::Corruption,
            Error::Randomness(_) => ErrorKind::Randomness,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Storage(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::NotFound(_)
            | Error::AlreadyExists(_) => ErrorKind::Backend,
        }
    }

    /// Shorthand for a [`Error::Size`] mismatch.
    pub fn size(what: &'static str, expected: usize, actual: usize) -> Self {
        Error::Size {
            what,
            expected,
            actual,
        }
    }

    /// Check whether this error signals corrupted or foreign data.
    pub fn is_corruption(&self) -> bool {
        self.kind() == ErrorKind::Corruption
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Key => "key",
            ErrorKind::Size => "size",
            ErrorKind::Corruption => "corruption",
            ErrorKind::Randomness => "randomness",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Backend => "backend",
        };
        f.write_str(s)
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_share_kind() {
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.kind(), ErrorKind::Backend);
        assert_eq!(Error::NotFound("x".to_string()).kind(), ErrorKind::Backend);
        assert_eq!(Error::Storage("x".to_string()).kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_invalid_input_is_not_backend() {
        let err = Error::InvalidInput("Password cannot be empty".to_string());
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.kind().to_string(), "invalid input");
    }

    #[test]
    fn test_size_error_message() {
        let err = Error::size("superblock", 256, 255);
        assert_eq!(err.kind(), ErrorKind::Size);
        assert_eq!(
            err.to_string(),
            "Size error: superblock must be 256 bytes, got 255"
        );
    }

    #[test]
    fn test_is_corruption() {
        assert!(Error::Corruption("bad length byte".to_string()).is_corruption());
        assert!(!Error::Key("short".to_string()).is_corruption());
    }
}
