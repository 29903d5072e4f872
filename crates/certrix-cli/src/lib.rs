//! # certrix-cli
//!
//! Certrix command-line interface.
//!
//! Provides commands for:
//! - Generating a key, CSR, certificate and PKCS#12 bundle
//! - Renewing a single CSR
//! - Renewing every CSR inside a ZIP archive
//! - Previewing the subject of a CSR
//!
//! Every command runs against a [`certrix_pki::Certrix`] service whose CA is
//! loaded from `--ca-key-pem`/`--ca-cert-pem` (or their `CERTRIX_CA_*`
//! environment variables) or generated for the invocation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod input;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use error::CliError;
pub use output::Tabular;
