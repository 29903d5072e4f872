//! Output formatting for CLI commands.
//!
//! Every command result prints either as a table or as pretty JSON.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use certrix_pki::{CsrPreview, EntryReport, EntryStatus, SubjectIdentity};

use crate::cli::Format;
use crate::error::CliError;

impl Format {
    /// Prints a command result: pretty JSON with a trailing newline, or the
    /// value's table view.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn emit<W, T>(self, out: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + Tabular,
    {
        if self == Self::Table {
            return value.table(out);
        }
        serde_json::to_writer_pretty(&mut *out, value)
            .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
        writeln!(out)?;
        Ok(())
    }
}

/// A command result with a human-readable view.
pub trait Tabular {
    /// Writes the human-readable view.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn table<W: Write>(&self, out: &mut W) -> Result<(), CliError>;
}

/// Result of the generate command.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummary {
    /// Path of the written bundle archive.
    pub path: PathBuf,
    /// Subject of the issued certificate.
    pub subject: String,
    /// Issuer (the CA subject).
    pub issuer: String,
    /// Serial number, hex.
    pub serial: String,
    /// Start of validity, RFC 3339.
    pub not_before: String,
    /// End of validity, RFC 3339.
    pub not_after: String,
}

impl Tabular for GenerateSummary {
    fn table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Certificate Bundle")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Archive:     {}", self.path.display())?;
        writeln!(writer, "Subject:     {}", self.subject)?;
        writeln!(writer, "Issuer:      {}", self.issuer)?;
        writeln!(writer, "Serial:      {}", self.serial)?;
        writeln!(writer, "Not Before:  {}", self.not_before)?;
        writeln!(writer, "Not After:   {}", self.not_after)?;
        Ok(())
    }
}

/// Result of the renew command.
#[derive(Debug, Clone, Serialize)]
pub struct RenewSummary {
    /// Path of the written certificate.
    pub path: PathBuf,
    /// Size of the DER certificate.
    pub bytes: usize,
}

impl Tabular for RenewSummary {
    fn table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "Certificate written to {} ({} bytes)",
            self.path.display(),
            self.bytes
        )?;
        Ok(())
    }
}

/// Result of the renew-bulk command.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Path of the written archive.
    pub path: PathBuf,
    /// Number of signed entries.
    pub count: usize,
    /// Per-entry outcomes, in archive order.
    pub entries: Vec<EntryReport>,
}

impl BatchSummary {
    fn tally(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

impl Tabular for BatchSummary {
    fn table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Batch Renewal")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Archive:   {}", self.path.display())?;
        writeln!(writer, "Signed:    {}", self.count)?;
        writeln!(writer, "Ignored:   {}", self.tally(EntryStatus::Ignored))?;
        writeln!(writer, "Failed:    {}", self.tally(EntryStatus::Failed))?;
        writeln!(writer)?;
        writeln!(writer, "{:<32} {:<8} DETAIL", "ENTRY", "STATUS")?;
        for entry in &self.entries {
            let status = match entry.status {
                EntryStatus::Signed => "signed",
                EntryStatus::Ignored => "ignored",
                EntryStatus::Failed => "failed",
            };
            let detail = entry
                .output
                .as_deref()
                .or(entry.reason.as_deref())
                .unwrap_or("");
            writeln!(writer, "{:<32} {:<8} {}", entry.entry, status, detail)?;
        }
        Ok(())
    }
}

/// Result of the preview command.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewOutput {
    /// Where the CSR came from.
    pub source: String,
    /// Projected subject.
    pub subject: SubjectIdentity,
}

impl From<CsrPreview> for PreviewOutput {
    fn from(preview: CsrPreview) -> Self {
        Self {
            source: preview.source,
            subject: preview.subject,
        }
    }
}

impl Tabular for PreviewOutput {
    fn table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let s = &self.subject;
        writeln!(writer, "CSR Subject ({})", self.source)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "CN:  {}", s.common_name)?;
        writeln!(writer, "O:   {}", s.organization)?;
        writeln!(writer, "OU:  {}", s.organizational_unit)?;
        writeln!(writer, "C:   {}", s.country)?;
        writeln!(writer, "ST:  {}", s.state)?;
        writeln!(writer, "L:   {}", s.locality)?;
        Ok(())
    }
}
