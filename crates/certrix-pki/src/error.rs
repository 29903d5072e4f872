//! PKI error types.

use thiserror::Error;

/// Result type for PKI operations.
pub type Result<T> = std::result::Result<T, Error>;

/// PKI error variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Required input is missing or invalid.
    #[error("{0}")]
    Validation(String),

    /// Bytes are neither a valid PEM nor a valid DER certificate request.
    #[error("invalid CSR: {0}")]
    Decode(String),

    /// Key generation, signing or encoding failed.
    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    /// No entry of a batch produced a signed certificate.
    #[error("no valid CSRs found in archive")]
    BatchEmpty,

    /// An archive could not be read or written.
    #[error("archive error: {0}")]
    Archive(String),

    /// Supplied CA material is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if the error was caused by the caller's input.
    ///
    /// Caller faults are safe to report verbatim. Everything else is an
    /// internal fault and should be reported through [`Error::public_message`].
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Decode(_) | Self::BatchEmpty | Self::Archive(_)
        )
    }

    /// Returns the message that may be shown to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "internal error".to_string()
        }
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Self::Crypto(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(format!("invalid base64: {err}"))
    }
}
