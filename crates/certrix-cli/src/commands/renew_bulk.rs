//! Batch renewal command.

use std::io::Write;

use certrix_pki::{Certrix, ValidityYears};
use tracing::info;

use crate::cli::{Format, RenewBulkArgs, numeric};
use crate::error::CliError;
use crate::input::{load, write_artifact};
use crate::output::BatchSummary;

/// Executes the renew-bulk command.
pub struct RenewBulkCommand<'a> {
    certrix: &'a Certrix,
}

impl<'a> RenewBulkCommand<'a> {
    /// Creates a new renew-bulk command.
    #[must_use]
    pub const fn new(certrix: &'a Certrix) -> Self {
        Self { certrix }
    }

    /// Renews every CSR in the archive and writes `renewed_<n>_certs.zip`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a ZIP archive, holds no valid
    /// CSR, or the output cannot be written.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: Format,
        args: &RenewBulkArgs,
    ) -> Result<(), CliError> {
        let zip = load(&args.input, args.base64)?;
        let years = ValidityYears::from_input(numeric(args.years.as_deref()).as_ref());

        let outcome = self.certrix.renew_batch(&zip, years)?;
        let path = write_artifact(&args.out_dir, &outcome.filename, &outcome.archive)?;
        info!(count = outcome.count, path = %path.display(), "Wrote renewed archive");

        format.emit(
            out,
            &BatchSummary {
                path,
                count: outcome.count,
                entries: outcome.report,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::service;
    use certrix_pki::archive::{ArchiveBuilder, read_entries};
    use certrix_pki::GenerateRequest;

    fn csr_for(certrix: &Certrix, cn: &str) -> Vec<u8> {
        let bundle = certrix.generate(&GenerateRequest::new(cn)).unwrap();
        read_entries(&bundle.archive)
            .unwrap()
            .into_iter()
            .find(|e| e.name.ends_with(".csr"))
            .unwrap()
            .data
    }

    fn bulk_args(input: &std::path::Path, out_dir: &std::path::Path) -> RenewBulkArgs {
        RenewBulkArgs {
            input: input.to_string_lossy().into_owned(),
            base64: false,
            years: None,
            workers: None,
            out_dir: out_dir.to_path_buf(),
        }
    }

    #[test]
    fn renews_archive_and_reports_entries() {
        let dir = tempfile::tempdir().unwrap();
        let certrix = service();

        let mut builder = ArchiveBuilder::new();
        builder.insert("one.csr", csr_for(&certrix, "one"));
        builder.insert("two.pem", csr_for(&certrix, "two"));
        builder.insert("readme.txt", b"hello".to_vec());
        let input = dir.path().join("in.zip");
        std::fs::write(&input, builder.finish().unwrap()).unwrap();

        let mut out = Vec::new();
        RenewBulkCommand::new(&certrix)
            .execute(&mut out, Format::Json, &bulk_args(&input, dir.path()))
            .unwrap();

        let archive = std::fs::read(dir.path().join("renewed_2_certs.zip")).unwrap();
        let names: Vec<_> = read_entries(&archive)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["one.cer", "two.cer"]);

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["entries"][2]["status"], "ignored");
    }

    #[test]
    fn archive_without_csrs_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = ArchiveBuilder::new();
        builder.insert("readme.txt", b"hello".to_vec());
        let input = dir.path().join("empty.zip");
        std::fs::write(&input, builder.finish().unwrap()).unwrap();

        let certrix = service();
        let err = RenewBulkCommand::new(&certrix)
            .execute(&mut Vec::new(), Format::Table, &bulk_args(&input, dir.path()))
            .unwrap_err();
        assert_eq!(err.user_message(), "no valid CSRs found in archive");
    }
}
