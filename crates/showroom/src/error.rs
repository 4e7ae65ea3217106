//! Error types for the showroom crate.

use std::{fmt, path::PathBuf};

/// Result type for showroom operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in showroom operations.
///
/// Navigation and paint errors are handled where they occur by ignoring the
/// request; they exist so the ignore can be logged with a reason. Asset load
/// failures are reported to subscribers and can be retried.
#[derive(Debug)]
pub enum Error {
    /// Navigation or lookup outside the registry bounds.
    OutOfRangeIndex {
        /// The requested index.
        index: usize,
        /// Number of entities in the registry.
        len: usize,
    },
    /// A color string that could not be parsed.
    InvalidColorInput {
        /// The rejected input.
        input: String,
    },
    /// Texture bytes that cannot be used.
    InvalidTextureInput {
        /// Why the texture was rejected.
        reason: &'static str,
    },
    /// A model or scene asset failed to load.
    AssetLoadFailure {
        /// Asset path that failed.
        asset: String,
        /// The loader's error message.
        message: String,
    },
    /// The catalog configuration is invalid.
    Catalog {
        /// Description of what was invalid.
        message: String,
    },
    /// Reading a catalog file failed.
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn catalog(message: impl Into<String>) -> Self {
        Error::Catalog {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRangeIndex { index, len } => {
                write!(f, "index {index} is out of range for {len} entities")
            }
            Error::InvalidColorInput { input } => write!(f, "invalid color input '{input}'"),
            Error::InvalidTextureInput { reason } => write!(f, "invalid texture input: {reason}"),
            Error::AssetLoadFailure { asset, message } => {
                write!(f, "failed to load asset {asset}: {message}")
            }
            Error::Catalog { message } => write!(f, "invalid catalog: {message}"),
            Error::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Catalog {
            message: e.to_string(),
        }
    }
}
