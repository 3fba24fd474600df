use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type used throughout the loader.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while reading an archive.
///
/// `Error` is `Clone` so that a failed central directory parse can be cached
/// and handed out again on every later access.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed or unrecognized archive structure: missing EOCD, bad
    /// signature, corrupt zip64 locator, inconsistent sizes.
    #[error("Invalid archive format: {0}")]
    Format(String),

    /// The underlying storage is unavailable or a read failed.
    #[error("I/O error {context}")]
    Io {
        context: String,
        #[source]
        source: Arc<io::Error>,
    },

    /// A recognized structure using a feature this loader does not handle,
    /// such as an unknown compression method.
    #[error("Unsupported archive feature: {0}")]
    Unsupported(String),

    /// A named entry the caller asked for does not exist.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// The caller broke the contract of an API, e.g. read a virtual block
    /// before its parts were set.
    #[error("Contract violation: {0}")]
    Contract(String),
}

impl Error {
    pub fn format(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported(message.into())
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Error::Contract(message.into())
    }

    /// Prefix the message with the archive it came from.
    pub(crate) fn within(self, archive: &str) -> Self {
        match self {
            Error::Format(m) => Error::Format(format!("{}: {}", archive, m)),
            Error::Io { context, source } => Error::Io {
                context: format!("{} in {}", context, archive),
                source,
            },
            Error::Unsupported(m) => Error::Unsupported(format!("{}: {}", archive, m)),
            Error::NotFound(m) => Error::NotFound(format!("{} in {}", m, archive)),
            Error::Contract(m) => Error::Contract(m),
        }
    }

    /// The `io::ErrorKind` of an I/O error, if this is one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io("while reading archive data", err)
    }
}

/// Attach context to I/O results coming out of `std` and `byteorder`.
pub(crate) trait IoResultExt<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::io(f(), e))
    }
}
