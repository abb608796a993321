//! Error types for ciciot-dl
//!
//! Provides the error taxonomy shared by the listing, download and merge stages.

use std::fmt;
use std::path::PathBuf;

/// Main error type for ciciot-dl operations
#[derive(Debug)]
pub enum Error {
    /// HTTP-specific error (non-success status, protocol failure)
    HttpError(String),

    /// Network connectivity issues, including timeouts
    NetworkError(String),

    /// File I/O error
    IoError(std::io::Error),

    /// A URL could not be parsed or joined
    InvalidUrl(String),

    /// Invalid configuration, or a remote name that cannot be stored safely
    InvalidInput(String),

    /// A CSV source could not be read or is malformed
    CsvError { path: PathBuf, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {msg}")
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
            Error::InvalidUrl(msg) => {
                write!(f, "Invalid URL: {msg}")
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::CsvError { path, message } => {
                write!(f, "CSV error in {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Convenience result type for ciciot-dl operations
pub type Result<T> = std::result::Result<T, Error>;
