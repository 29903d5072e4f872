//! Single CSR renewal command.

use std::io::Write;

use certrix_pki::{Certrix, ValidityYears};

use crate::cli::{Format, RenewArgs, numeric};
use crate::error::CliError;
use crate::input::{file_name, load, write_artifact};
use crate::output::RenewSummary;

/// Executes the renew command.
pub struct RenewCommand<'a> {
    certrix: &'a Certrix,
}

impl<'a> RenewCommand<'a> {
    /// Creates a new renew command.
    #[must_use]
    pub const fn new(certrix: &'a Certrix) -> Self {
        Self { certrix }
    }

    /// Signs the CSR and writes `<identifier>.cer` into the output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or decoded, or signing fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: Format,
        args: &RenewArgs,
    ) -> Result<(), CliError> {
        let csr = load(&args.input, args.base64)?;
        let years = ValidityYears::from_input(numeric(args.years.as_deref()).as_ref());
        let fallback = args.name.clone().or_else(|| file_name(&args.input));

        let renewed = self.certrix.renew(&csr, years, fallback.as_deref())?;
        let path = write_artifact(&args.out_dir, &renewed.filename, &renewed.der)?;

        format.emit(
            out,
            &RenewSummary {
                path,
                bytes: renewed.der.len(),
            },
        )
    }
}
