//! Bundle generation command.

use std::io::Write;

use certrix_pki::{Certrix, GenerateRequest};
use tracing::debug;

use crate::cli::{Format, GenerateArgs, numeric};
use crate::error::CliError;
use crate::input::write_artifact;
use crate::output::GenerateSummary;

/// Executes the generate command.
pub struct GenerateCommand<'a> {
    certrix: &'a Certrix,
}

impl<'a> GenerateCommand<'a> {
    /// Creates a new generate command.
    #[must_use]
    pub const fn new(certrix: &'a Certrix) -> Self {
        Self { certrix }
    }

    /// Generates the bundle and writes it into the output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if validation, issuance or writing fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: Format,
        args: &GenerateArgs,
    ) -> Result<(), CliError> {
        let request = to_request(args);
        debug!(?request, "Generating bundle");

        let bundle = self.certrix.generate(&request)?;
        let path = write_artifact(&args.out_dir, &bundle.filename, &bundle.archive)?;

        let cert = &bundle.certificate;
        let summary = GenerateSummary {
            path,
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.serial().to_string(),
            not_before: cert.not_before().to_rfc3339(),
            not_after: cert.not_after().to_rfc3339(),
        };
        format.emit(out, &summary)
    }
}

fn to_request(args: &GenerateArgs) -> GenerateRequest {
    let mut request = GenerateRequest::new(args.cn.clone());
    request.country.clone_from(&args.country);
    request.state.clone_from(&args.state);
    request.locality.clone_from(&args.locality);
    request.org.clone_from(&args.org);
    request.ou.clone_from(&args.ou);
    request.years = numeric(args.years.as_deref());
    request.key_size = numeric(args.key_size.as_deref());
    request.key_pass.clone_from(&args.key_pass);
    request.pfx_pass.clone_from(&args.pfx_pass);
    request
}
