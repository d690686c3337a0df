//! Error handling for the PIR pipeline
//!
//! A single error type shared by the crypto backends, database backends and the
//! pipeline stages. End of stream is never an error; the `pop_*` functions
//! return `None` for it.

use std::fmt;

/// PIR operation error
#[derive(Debug)]
pub enum PirError {
    /// Requested element index is outside `[0, num_elements)`
    IndexOutOfRange { index: u64, num_elements: u64 },
    /// Parameters rejected during validation or parsing
    InvalidParameters(String),
    /// Operation called out of order (missing query elements, no imported database, ...)
    Precondition(String),
    /// Serialized ciphertext with the wrong size or out-of-range coefficients
    MalformedCiphertext(String),
    /// Reply stream ended before the expected number of elements arrived
    Desynchronized { received: u64, expected: u64 },
    /// A queue was force-finished while a producer was still pushing
    StreamClosed(&'static str),
    /// Database backend failure
    Database(String),
    /// I/O failure
    Io(std::io::Error),
    /// Parameter (de)serialization failure
    Encoding(bincode::Error),
}

impl fmt::Display for PirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange {
                index,
                num_elements,
            } => write!(
                f,
                "element index {} out of range (database has {} elements)",
                index, num_elements
            ),
            Self::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            Self::Precondition(msg) => write!(f, "precondition violated: {}", msg),
            Self::MalformedCiphertext(msg) => write!(f, "malformed ciphertext: {}", msg),
            Self::Desynchronized { received, expected } => write!(
                f,
                "reply stream desynchronized: received {} of {} elements",
                received, expected
            ),
            Self::StreamClosed(stream) => write!(f, "{} stream closed", stream),
            Self::Database(msg) => write!(f, "database error: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::Encoding(err) => write!(f, "encoding error: {}", err),
        }
    }
}

impl std::error::Error for PirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Encoding(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PirError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<bincode::Error> for PirError {
    fn from(err: bincode::Error) -> Self {
        Self::Encoding(err)
    }
}

/// Result type for PIR operations
pub type Result<T> = std::result::Result<T, PirError>;

/// Create a `PirError` variant carrying a formatted message
macro_rules! pir_err {
    ($variant:ident, $($arg:tt)*) => {
        $crate::error::PirError::$variant(format!($($arg)*))
    };
}

pub(crate) use pir_err;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PirError::IndexOutOfRange {
            index: 9,
            num_elements: 8,
        };
        assert_eq!(
            err.to_string(),
            "element index 9 out of range (database has 8 elements)"
        );

        let err = pir_err!(Precondition, "expected {} query elements", 20);
        assert_eq!(
            err.to_string(),
            "precondition violated: expected 20 query elements"
        );
    }

    #[test]
    fn test_io_source_preserved() {
        use std::error::Error;
        let err: PirError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.source().is_some());
        assert!(matches!(err, PirError::Io(_)));
    }
}
