//! Batch renewal of every CSR found in a ZIP archive.
//!
//! Entries are decoded and signed independently: a malformed or unsignable
//! entry is recorded in the report and skipped, it never aborts the batch.
//! Signing runs on a small pool of scoped worker threads, and results are
//! assembled in input order so the output archive does not depend on
//! scheduling.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{self, ArchiveBuilder, ArchiveEntry};
use crate::ca::CertificateAuthority;
use crate::csr::CertificationRequest;
use crate::error::{Error, Result};
use crate::issuer;
use crate::naming::{derive_identifier, entry_base_name};
use crate::types::ValidityYears;

/// Entry name suffixes considered for renewal, compared case-insensitively.
pub const BATCH_EXTENSIONS: [&str; 3] = [".csr", ".pem", ".der"];

/// Batch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Validity shared by every certificate of the batch.
    pub years: ValidityYears,
    /// Maximum number of concurrent signing workers. Zero is treated as one.
    pub workers: usize,
}

impl BatchOptions {
    /// Options for `years` with the default worker count.
    #[must_use]
    pub fn with_years(years: ValidityYears) -> Self {
        Self {
            years,
            ..Self::default()
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            years: ValidityYears::default(),
            workers: default_workers(),
        }
    }
}

/// Available parallelism, at least one.
#[must_use]
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// What happened to one input entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Signed and written to the output archive.
    Signed,
    /// Not a candidate: a directory or an unsupported extension.
    Ignored,
    /// Decoding or signing failed.
    Failed,
}

/// Per-entry record of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// Entry name in the input archive.
    pub entry: String,
    /// Outcome.
    pub status: EntryStatus,
    /// Output file name for signed entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Why the entry was ignored or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of a successful batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Output archive bytes.
    pub archive: Vec<u8>,
    /// Output archive filename, `renewed_<count>_certs.zip`.
    pub filename: String,
    /// Number of signed entries, including ones replaced by a later entry
    /// with the same output name.
    pub count: usize,
    /// One record per input entry, in input order.
    pub report: Vec<EntryReport>,
}

enum EntryResult {
    Signed { output: String, der: Vec<u8> },
    Ignored(&'static str),
    Failed(String),
}

/// Signs every eligible CSR in `zip` and packages the certificates.
///
/// # Errors
///
/// Returns [`Error::Archive`] if `zip` cannot be read or the output cannot be
/// written, and [`Error::BatchEmpty`] if no entry was signed.
pub fn renew_archive(
    zip: &[u8],
    options: BatchOptions,
    ca: &CertificateAuthority,
) -> Result<BatchOutcome> {
    let entries = archive::read_entries(zip)?;
    let results = process_entries(&entries, options, ca);

    let mut output = ArchiveBuilder::new();
    let mut report = Vec::with_capacity(entries.len());
    let mut count = 0;

    for (entry, result) in entries.iter().zip(results) {
        let record = match result {
            EntryResult::Signed { output: name, der } => {
                if output.insert(name.clone(), der) {
                    debug!(
                        entry = %entry.name,
                        output = %name,
                        "Replacing earlier certificate with the same name"
                    );
                }
                count += 1;
                EntryReport {
                    entry: entry.name.clone(),
                    status: EntryStatus::Signed,
                    output: Some(name),
                    reason: None,
                }
            }
            EntryResult::Ignored(reason) => EntryReport {
                entry: entry.name.clone(),
                status: EntryStatus::Ignored,
                output: None,
                reason: Some(reason.to_string()),
            },
            EntryResult::Failed(reason) => EntryReport {
                entry: entry.name.clone(),
                status: EntryStatus::Failed,
                output: None,
                reason: Some(reason),
            },
        };
        report.push(record);
    }

    if count == 0 {
        return Err(Error::BatchEmpty);
    }

    info!(
        entries = entries.len(),
        signed = count,
        files = output.len(),
        "Batch renewal complete"
    );

    Ok(BatchOutcome {
        archive: output.finish()?,
        filename: format!("renewed_{count}_certs.zip"),
        count,
        report,
    })
}

fn process_entries(
    entries: &[ArchiveEntry],
    options: BatchOptions,
    ca: &CertificateAuthority,
) -> Vec<EntryResult> {
    let workers = options.workers.clamp(1, entries.len().max(1));
    let years = options.years;

    if workers == 1 {
        return entries
            .iter()
            .map(|entry| process_entry(entry, years, ca))
            .collect();
    }

    let next = AtomicUsize::new(0);
    let mut slots: Vec<Option<EntryResult>> = entries.iter().map(|_| None).collect();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(entry) = entries.get(index) else {
                            break;
                        };
                        done.push((index, process_entry(entry, years, ca)));
                    }
                    done
                })
            })
            .collect();

        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (index, result) in done {
                        slots[index] = Some(result);
                    }
                }
                Err(_) => warn!("Batch worker panicked; its entries are reported as failed"),
            }
        }
    });

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| EntryResult::Failed("worker terminated unexpectedly".into()))
        })
        .collect()
}

fn process_entry(
    entry: &ArchiveEntry,
    years: ValidityYears,
    ca: &CertificateAuthority,
) -> EntryResult {
    if entry.is_dir {
        return EntryResult::Ignored("directory");
    }
    if !has_batch_extension(&entry.name) {
        return EntryResult::Ignored("unsupported extension");
    }

    let csr = match CertificationRequest::decode(&entry.data) {
        Ok(csr) => csr,
        Err(e) => {
            debug!(entry = %entry.name, error = %e, "Skipping undecodable entry");
            return EntryResult::Failed(e.to_string());
        }
    };

    let output = format!(
        "{}.cer",
        derive_identifier(csr.common_name(), Some(entry_base_name(&entry.name)))
    );

    match issuer::sign(&csr, years, ca) {
        Ok(cert) => EntryResult::Signed {
            output,
            der: cert.der().to_vec(),
        },
        Err(e) => {
            warn!(entry = %entry.name, error = %e, "Failed to sign entry");
            EntryResult::Failed(e.public_message())
        }
    }
}

fn has_batch_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    BATCH_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::x509::X509;
    use x509_parser::prelude::{FromDer, X509Certificate};

    use crate::test_support::{build_req, csr_der, csr_pem, test_ca};

    fn zip_of(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut builder = ArchiveBuilder::new();
        for (name, data) in files {
            builder.insert(*name, data.clone());
        }
        builder.finish().unwrap()
    }

    fn options(workers: usize) -> BatchOptions {
        BatchOptions {
            years: ValidityYears::clamped(2),
            workers,
        }
    }

    fn output_names(outcome: &BatchOutcome) -> Vec<String> {
        archive::read_entries(&outcome.archive)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    }

    #[test]
    fn corrupt_entry_is_skipped() {
        let zip = zip_of(&[
            ("alpha.csr", csr_pem("alpha")),
            ("beta.der", csr_der("beta")),
            ("broken.csr", b"not a csr".to_vec()),
            ("gamma.pem", csr_pem("gamma_node")),
        ]);

        let outcome = renew_archive(&zip, options(2), &test_ca()).unwrap();
        assert_eq!(outcome.count, 3);
        assert_eq!(outcome.filename, "renewed_3_certs.zip");
        assert_eq!(output_names(&outcome), ["alpha.cer", "beta.cer", "gamma.cer"]);

        let statuses: Vec<EntryStatus> = outcome.report.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [
                EntryStatus::Signed,
                EntryStatus::Signed,
                EntryStatus::Failed,
                EntryStatus::Signed
            ]
        );
        assert!(outcome.report[2].reason.as_deref().unwrap().starts_with("invalid CSR"));
    }

    #[test]
    fn outputs_are_der_certificates_from_the_ca() {
        let zip = zip_of(&[("one.csr", csr_pem("one"))]);
        let outcome = renew_archive(&zip, options(1), &test_ca()).unwrap();

        let entries = archive::read_entries(&outcome.archive).unwrap();
        let cert = X509::from_der(&entries[0].data).unwrap();
        assert!(cert.verify(&test_ca().certificate().public_key().unwrap()).unwrap());

        let (_, parsed) = X509Certificate::from_der(&entries[0].data).unwrap();
        assert_eq!(parsed.issuer().to_string(), test_ca().subject());
    }

    #[test]
    fn ineligible_entries_are_ignored() {
        let zip = zip_of(&[
            ("readme.txt", csr_pem("readme")),
            ("UPPER.CSR", csr_pem("upper")),
            ("key.pem.bak", csr_pem("bak")),
        ]);
        let outcome = renew_archive(&zip, options(1), &test_ca()).unwrap();

        assert_eq!(outcome.count, 1);
        assert_eq!(output_names(&outcome), ["upper.cer"]);
        assert_eq!(outcome.report[0].status, EntryStatus::Ignored);
        assert_eq!(outcome.report[2].status, EntryStatus::Ignored);
    }

    #[test]
    fn directories_are_ignored() {
        use std::io::Write;

        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let opts = zip::write::SimpleFileOptions::default();
        zip.add_directory("batch.csr/", opts).unwrap();
        zip.start_file("batch.csr/node.csr", opts).unwrap();
        zip.write_all(&csr_pem("node")).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let outcome = renew_archive(&bytes, options(1), &test_ca()).unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.report[0].status, EntryStatus::Ignored);
        assert_eq!(outcome.report[0].reason.as_deref(), Some("directory"));
    }

    #[test]
    fn no_valid_entries_is_batch_empty() {
        let zip = zip_of(&[("bad.csr", b"junk".to_vec()), ("notes.txt", b"hello".to_vec())]);
        let err = renew_archive(&zip, options(1), &test_ca()).unwrap_err();
        assert!(matches!(err, Error::BatchEmpty));

        let empty = zip_of(&[]);
        assert!(matches!(
            renew_archive(&empty, options(1), &test_ca()),
            Err(Error::BatchEmpty)
        ));
    }

    #[test]
    fn non_zip_input_is_archive_error() {
        let err = renew_archive(b"plain bytes", options(1), &test_ca()).unwrap_err();
        assert!(matches!(err, Error::Archive(_)));
    }

    #[test]
    fn falls_back_to_entry_name_without_cn() {
        let req = build_req(&[("O", "No CN Inc")], None);
        let zip = zip_of(&[("nested/dir/acme_client.csr", req.to_pem().unwrap())]);

        let outcome = renew_archive(&zip, options(1), &test_ca()).unwrap();
        assert_eq!(output_names(&outcome), ["acme.cer"]);
        assert_eq!(outcome.report[0].output.as_deref(), Some("acme.cer"));
    }

    #[test]
    fn later_entry_wins_name_collision() {
        let zip = zip_of(&[
            ("first.csr", csr_pem("dup_first")),
            ("other.csr", csr_pem("other")),
            ("second.csr", csr_pem("dup_second")),
        ]);

        let outcome = renew_archive(&zip, options(3), &test_ca()).unwrap();
        assert_eq!(outcome.count, 3);
        assert_eq!(outcome.filename, "renewed_3_certs.zip");
        assert_eq!(output_names(&outcome), ["dup.cer", "other.cer"]);

        let entries = archive::read_entries(&outcome.archive).unwrap();
        let (_, cert) = X509Certificate::from_der(&entries[0].data).unwrap();
        assert_eq!(cert.subject().to_string(), "CN=dup_second");
    }

    #[test]
    fn worker_count_does_not_change_output_order() {
        let files: Vec<(String, Vec<u8>)> = (0..12)
            .map(|i| (format!("node{i:02}.csr"), csr_pem(&format!("node{i:02}"))))
            .collect();
        let refs: Vec<(&str, Vec<u8>)> = files
            .iter()
            .map(|(name, data)| (name.as_str(), data.clone()))
            .collect();
        let zip = zip_of(&refs);

        let serial = renew_archive(&zip, options(1), &test_ca()).unwrap();
        let parallel = renew_archive(&zip, options(4), &test_ca()).unwrap();
        assert_eq!(output_names(&serial), output_names(&parallel));
        assert_eq!(serial.report.len(), parallel.report.len());
        assert_eq!(parallel.count, 12);
    }

    #[test]
    fn zero_workers_runs_serially() {
        let zip = zip_of(&[("solo.csr", csr_pem("solo"))]);
        let outcome = renew_archive(&zip, options(0), &test_ca()).unwrap();
        assert_eq!(outcome.count, 1);
    }

    #[test]
    fn report_serializes() {
        let report = EntryReport {
            entry: "a.csr".into(),
            status: EntryStatus::Signed,
            output: Some("a.cer".into()),
            reason: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "signed");
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn default_options() {
        let opts = BatchOptions::default();
        assert_eq!(opts.years.get(), 1);
        assert!(opts.workers >= 1);
        assert_eq!(BatchOptions::with_years(ValidityYears::clamped(9)).years.get(), 9);
    }
}
