//! Self-managed certificate authority for Certrix.
#![forbid(unsafe_code)]
//!
//! This crate issues and renews X.509 certificates from a process-wide CA:
//! it signs uploaded certificate signing requests, generates complete
//! certificate bundles and renews every CSR found in a ZIP archive.
//!
//! # Overview
//!
//! The `certrix-pki` crate enables:
//! - Creating or loading the Certificate Authority (CA), once per process
//! - Decoding CSRs from PEM or DER without being told which
//! - Issuing leaf certificates with a fixed extension policy
//! - Generating key, CSR, certificate and PKCS#12 bundles
//! - Batch renewal with per-entry failure isolation
//!
//! # Example
//!
//! ```
//! use certrix_pki::{CaConfig, Certrix, GenerateRequest, ValidityYears};
//!
//! // The CA is created on first use
//! let certrix = Certrix::new(CaConfig::default());
//!
//! // Generate a bundle for a new service
//! let mut request = GenerateRequest::new("api.example.com");
//! request.org = Some("Example".into());
//! let bundle = certrix.generate(&request).unwrap();
//! assert_eq!(bundle.filename, "api.example.com_certs.zip");
//!
//! // Renew from the CSR inside the bundle
//! let entries = certrix_pki::archive::read_entries(&bundle.archive).unwrap();
//! let csr = entries.iter().find(|e| e.name.ends_with(".csr")).unwrap();
//! let renewed = certrix.renew(&csr.data, ValidityYears::clamped(2), None).unwrap();
//! assert_eq!(renewed.filename, "api.example.com.cer");
//! ```
//!
//! # Modules
//!
//! - [`ca`] - Certificate Authority and the process-wide cache
//! - [`csr`] - CSR decoding
//! - [`naming`] - Subject projection and output naming
//! - [`issuer`] - Leaf certificate issuance
//! - [`bundle`] - Self-service bundle generation
//! - [`batch`] - Batch renewal
//! - [`service`] - Request-level operations
//! - [`crypto`] - PKI primitives
//! - [`archive`] - ZIP entry reader and builder
//! - [`types`] - Core types (`IssuedCertificate`, `ValidityYears`, etc.)
//! - [`error`] - Error types

pub mod archive;
pub mod batch;
pub mod bundle;
pub mod ca;
pub mod config;
pub mod crypto;
pub mod csr;
pub mod error;
pub mod issuer;
pub mod naming;
pub mod pem;
pub mod service;
pub mod types;
pub mod validity;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types at crate root
pub use batch::{BatchOptions, BatchOutcome, EntryReport, EntryStatus};
pub use bundle::{GenerateRequest, GeneratedBundle};
pub use ca::{AuthorityCache, CertificateAuthority};
pub use config::{CaConfig, CaIdentity};
pub use csr::CertificationRequest;
pub use error::{Error, Result};
pub use naming::{derive_identifier, safe_cert_name, sanitize_field, subject_identity};
pub use service::{BatchRequest, Certrix, PreviewRequest, RenewRequest};
pub use types::{
    CsrPreview, IssuedCertificate, KeySize, NumericInput, RenewedCertificate, SubjectAttribute,
    SubjectIdentity, ValidityYears,
};
pub use validity::ValidityWindow;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Utc};

    use crate::test_support::{csr_pem, test_ca};

    #[test]
    fn full_workflow_test() {
        // 1. Service around a CA
        let certrix = Certrix::with_authority(test_ca());
        let ca = certrix.authority().unwrap();

        // 2. Generate a bundle
        let mut request = GenerateRequest::new("gateway_edge");
        request.years = Some(NumericInput::from("3"));
        let bundle = certrix.generate(&request).unwrap();
        assert_eq!(bundle.filename, "gateway_edge_certs.zip");
        assert_eq!(bundle.certificate.issuer(), ca.subject());

        // 3. Preview the generated CSR
        let entries = archive::read_entries(&bundle.archive).unwrap();
        let csr = entries
            .iter()
            .find(|e| e.name == "gateway_edge.csr")
            .unwrap();
        let preview = certrix.preview(&csr.data, Some("gateway_edge.csr")).unwrap();
        assert_eq!(preview.subject.common_name, "gateway_edge");

        // 4. Renew it; the name is cut at the delimiter
        let renewed = certrix
            .renew(&csr.data, ValidityYears::clamped(5), None)
            .unwrap();
        assert_eq!(renewed.filename, "gateway.cer");

        // 5. Batch renewal of the same CSR plus another one
        let mut input = archive::ArchiveBuilder::new();
        input.insert("edge.csr", csr.data.clone());
        input.insert("core.pem", csr_pem("core"));
        let outcome = certrix
            .renew_batch(&input.finish().unwrap(), ValidityYears::default())
            .unwrap();
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.filename, "renewed_2_certs.zip");

        // 6. Validity of the generated certificate
        let cert = &bundle.certificate;
        assert!(cert.not_before() < Utc::now());
        assert_eq!(cert.not_after().year() - cert.not_before().year(), 3);
    }

    #[test]
    fn errors_classify_for_callers() {
        let certrix = Certrix::with_authority(test_ca());
        let err = certrix
            .renew(b"nope", ValidityYears::default(), None)
            .unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.public_message(), "invalid CSR: DER decode failed");
    }
}
