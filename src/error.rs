//! Error types for zero-stream.

use thiserror::Error;

/// Result type for zero-stream operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for zero-stream.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed stream (truncated record, bad header, invalid length prefix, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Value cannot be converted into the requested Rust type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid usage (bad configuration value, mismatched columns, etc.)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The response was closed while records were still being read
    #[error("Response is closed")]
    Closed,
}

impl Error {
    /// Returns true if the error means the position in the byte stream is lost.
    ///
    /// After such an error no further records can be read from the same
    /// response; only raw byte access or close remain meaningful.
    pub fn is_connection_broken(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Protocol(_) | Error::Closed)
    }

    /// Returns true for [`Error::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized>
    From<zerocopy::error::CastError<Src, Dst>> for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Protocol(format!("zerocopy cast error: {err:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_broken() {
        let io = Error::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(io.is_connection_broken());
        assert!(Error::Closed.is_connection_broken());
        assert!(!Error::Decode("x".into()).is_connection_broken());
        assert!(Error::Unsupported("x".into()).is_unsupported());
    }
}
