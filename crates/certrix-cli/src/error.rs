//! CLI error types.

use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Certificate operation failed.
    #[error(transparent)]
    Pki(#[from] certrix_pki::Error),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns true for errors not caused by the invocation itself.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Pki(err) => !err.is_client_error(),
            Self::Format(_) => true,
            Self::InvalidArgument(_) | Self::Io(_) => false,
        }
    }

    /// Message printed to the user. Internal faults are not detailed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Pki(err) => err.public_message(),
            other if other.is_internal() => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pki_client_error_passes_through() {
        let err = CliError::from(certrix_pki::Error::Decode("DER decode failed".into()));
        assert!(!err.is_internal());
        assert_eq!(err.user_message(), "invalid CSR: DER decode failed");
    }

    #[test]
    fn pki_internal_error_is_hidden() {
        let err = CliError::from(certrix_pki::Error::Crypto("bad stack".into()));
        assert!(err.is_internal());
        assert_eq!(err.user_message(), "internal error");
        assert!(err.to_string().contains("bad stack"));
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
        assert_eq!(cli_err.user_message(), "IO error: file not found");
    }

    #[test]
    fn cli_error_display_invalid_argument() {
        let err = CliError::InvalidArgument("input is not UTF-8".into());
        assert_eq!(err.to_string(), "invalid argument: input is not UTF-8");
    }
}
