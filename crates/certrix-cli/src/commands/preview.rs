//! CSR preview command.

use std::io::Write;

use certrix_pki::service::preview;

use crate::cli::{Format, PreviewArgs};
use crate::error::CliError;
use crate::input::{load, source_label};
use crate::output::PreviewOutput;

/// Executes the preview command. Never touches the CA.
pub struct PreviewCommand;

impl PreviewCommand {
    /// Creates a new preview command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decodes the CSR and prints its subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or is not a CSR.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: Format,
        args: &PreviewArgs,
    ) -> Result<(), CliError> {
        let csr = load(&args.input, args.base64)?;
        let source = source_label(&args.input, args.base64);
        let subject = preview(&csr, Some(&source))?;
        format.emit(out, &PreviewOutput::from(subject))
    }
}

impl Default for PreviewCommand {
    fn default() -> Self {
        Self::new()
    }
}
