//! Request-level operations: generate, renew, batch-renew and preview.
//!
//! [`Certrix`] owns the process-wide CA cache and turns request payloads into
//! calls on the issuing modules. Transport is left to the caller.

use std::sync::Arc;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::{self, BatchOptions, BatchOutcome};
use crate::bundle::{self, GenerateRequest, GeneratedBundle};
use crate::ca::{AuthorityCache, CertificateAuthority};
use crate::config::CaConfig;
use crate::csr::CertificationRequest;
use crate::error::{Error, Result};
use crate::issuer;
use crate::naming::{DEFAULT_IDENTIFIER, derive_identifier, subject_identity};
use crate::types::{CsrPreview, NumericInput, RenewedCertificate, ValidityYears};

/// Preview source label when nothing better is known.
pub const SOURCE_UNKNOWN: &str = "unknown";
/// Preview source label for base64 uploads without a file name.
pub const SOURCE_FILE: &str = "file";
/// Preview source label for pasted text without a file name.
pub const SOURCE_PASTED: &str = "pasted";

/// A single CSR renewal request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenewRequest {
    /// Base64 of the CSR file bytes. Takes precedence over `csr_text`.
    pub csr_base64: Option<String>,
    /// CSR as pasted text.
    pub csr_text: Option<String>,
    /// Name of the uploaded file, used when the CSR has no common name.
    pub csr_file_name: Option<String>,
    /// Validity in years.
    pub years: Option<NumericInput>,
}

/// A batch renewal request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchRequest {
    /// Base64 of the ZIP archive.
    pub zip_base64: Option<String>,
    /// Validity in years, shared by the whole batch.
    pub years: Option<NumericInput>,
}

/// A CSR preview request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewRequest {
    /// Base64 of the CSR file bytes. Takes precedence over `csr_text`.
    pub csr_base64: Option<String>,
    /// CSR as pasted text.
    pub csr_text: Option<String>,
    /// Name of the uploaded file, used as the source label.
    pub csr_file_name: Option<String>,
}

/// Where a CSR payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadOrigin {
    Base64,
    Text,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Standard alphabet; trailing `=` padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes base64 leniently: embedded whitespace is ignored and padding may
/// be missing.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the text is not valid base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(LENIENT_BASE64.decode(compact)?)
}

fn resolve_csr_payload(
    csr_base64: Option<&String>,
    csr_text: Option<&String>,
) -> Result<(Vec<u8>, PayloadOrigin)> {
    if let Some(encoded) = non_empty(csr_base64) {
        return Ok((decode_base64(encoded)?, PayloadOrigin::Base64));
    }
    if let Some(text) = non_empty(csr_text) {
        return Ok((text.as_bytes().to_vec(), PayloadOrigin::Text));
    }
    Err(Error::Validation("CSR text or csrBase64 is required".into()))
}

impl RenewRequest {
    /// Resolves the CSR bytes of the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if neither payload field is set, or
    /// [`Error::Decode`] if the base64 is invalid.
    pub fn csr_bytes(&self) -> Result<Vec<u8>> {
        resolve_csr_payload(self.csr_base64.as_ref(), self.csr_text.as_ref()).map(|(b, _)| b)
    }
}

impl PreviewRequest {
    /// Resolves the CSR bytes and the source label of the request.
    ///
    /// The label is the file name when given, otherwise `file` for base64
    /// payloads and `pasted` for text.
    ///
    /// # Errors
    ///
    /// Same as [`RenewRequest::csr_bytes`].
    pub fn resolve(&self) -> Result<(Vec<u8>, String)> {
        let (bytes, origin) = resolve_csr_payload(self.csr_base64.as_ref(), self.csr_text.as_ref())?;
        let source = non_empty(self.csr_file_name.as_ref()).map_or_else(
            || match origin {
                PayloadOrigin::Base64 => SOURCE_FILE.to_string(),
                PayloadOrigin::Text => SOURCE_PASTED.to_string(),
            },
            str::to_string,
        );
        Ok((bytes, source))
    }
}

impl BatchRequest {
    /// Decodes the archive bytes of the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `zipBase64` is missing, or
    /// [`Error::Decode`] if it is not valid base64.
    pub fn zip_bytes(&self) -> Result<Vec<u8>> {
        let encoded = non_empty(self.zip_base64.as_ref())
            .ok_or_else(|| Error::Validation("zipBase64 is required".into()))?;
        decode_base64(encoded)
    }
}

/// The certificate service.
#[derive(Debug)]
pub struct Certrix {
    authority: AuthorityCache,
    workers: usize,
}

impl Certrix {
    /// Creates a service whose CA is resolved from `config` on first use.
    #[must_use]
    pub fn new(config: CaConfig) -> Self {
        Self {
            authority: AuthorityCache::new(config),
            workers: batch::default_workers(),
        }
    }

    /// Creates a service configured from `CERTRIX_CA_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CaConfig::from_env())
    }

    /// Creates a service around an existing CA.
    #[must_use]
    pub fn with_authority(ca: Arc<CertificateAuthority>) -> Self {
        Self {
            authority: AuthorityCache::with_authority(ca),
            workers: batch::default_workers(),
        }
    }

    /// Sets the number of batch signing workers.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Returns the CA, creating it on first use.
    ///
    /// # Errors
    ///
    /// See [`AuthorityCache::get_or_create`].
    pub fn authority(&self) -> Result<Arc<CertificateAuthority>> {
        self.authority.get_or_create()
    }

    /// Generates a new key, certificate and bundle archive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a missing common name before the CA or
    /// any key is created. See [`bundle::generate`] for the rest.
    pub fn generate(&self, request: &GenerateRequest) -> Result<GeneratedBundle> {
        request.validate()?;
        let ca = self.authority()?;
        bundle::generate(request, &ca)
    }

    /// Signs a single CSR given as PEM or DER bytes.
    ///
    /// The output is named after the CSR's common name, or `fallback_name`
    /// (default `certificate`) when it has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for malformed input, or the issuer's errors.
    pub fn renew(
        &self,
        csr: &[u8],
        years: ValidityYears,
        fallback_name: Option<&str>,
    ) -> Result<RenewedCertificate> {
        let csr = CertificationRequest::decode(csr)?;
        let identifier = derive_identifier(
            csr.common_name(),
            Some(fallback_name.unwrap_or(DEFAULT_IDENTIFIER)),
        );

        let ca = self.authority()?;
        let issued = issuer::sign(&csr, years, &ca)?;
        info!(serial = %issued.serial(), file = %identifier, "Renewed certificate");

        Ok(RenewedCertificate {
            filename: format!("{identifier}.cer"),
            der: issued.der().to_vec(),
        })
    }

    /// Handles a [`RenewRequest`].
    ///
    /// # Errors
    ///
    /// See [`RenewRequest::csr_bytes`] and [`Certrix::renew`].
    pub fn renew_request(&self, request: &RenewRequest) -> Result<RenewedCertificate> {
        let bytes = request.csr_bytes()?;
        let years = ValidityYears::from_input(request.years.as_ref());
        self.renew(&bytes, years, non_empty(request.csr_file_name.as_ref()))
    }

    /// Signs every CSR inside a ZIP archive.
    ///
    /// # Errors
    ///
    /// See [`batch::renew_archive`].
    pub fn renew_batch(&self, zip: &[u8], years: ValidityYears) -> Result<BatchOutcome> {
        let ca = self.authority()?;
        batch::renew_archive(
            zip,
            BatchOptions {
                years,
                workers: self.workers,
            },
            &ca,
        )
    }

    /// Handles a [`BatchRequest`].
    ///
    /// # Errors
    ///
    /// See [`BatchRequest::zip_bytes`] and [`Certrix::renew_batch`].
    pub fn renew_batch_request(&self, request: &BatchRequest) -> Result<BatchOutcome> {
        let zip = request.zip_bytes()?;
        self.renew_batch(&zip, ValidityYears::from_input(request.years.as_ref()))
    }

    /// Decodes a CSR and projects its subject. Does not touch the CA.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for malformed input.
    pub fn preview(&self, csr: &[u8], source: Option<&str>) -> Result<CsrPreview> {
        preview(csr, source)
    }

    /// Handles a [`PreviewRequest`].
    ///
    /// # Errors
    ///
    /// See [`PreviewRequest::resolve`] and [`Certrix::preview`].
    pub fn preview_request(&self, request: &PreviewRequest) -> Result<CsrPreview> {
        let (bytes, source) = request.resolve()?;
        preview(&bytes, Some(&source))
    }
}

/// Decodes a CSR and projects its subject under a source label.
///
/// # Errors
///
/// Returns [`Error::Decode`] for malformed input.
pub fn preview(csr: &[u8], source: Option<&str>) -> Result<CsrPreview> {
    let csr = CertificationRequest::decode(csr)?;
    Ok(CsrPreview {
        source: source
            .filter(|s| !s.is_empty())
            .unwrap_or(SOURCE_UNKNOWN)
            .to_string(),
        subject: subject_identity(&csr),
    })
}
