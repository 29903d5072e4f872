//! Certificate Authority implementation.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use openssl::nid::Nid;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectKeyIdentifier};
use openssl::x509::{X509, X509Builder, X509NameBuilder, X509NameRef, X509Ref};
use tracing::{debug, info, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::config::{CaConfig, CaIdentity};
use crate::crypto::{self, SerialNumber};
use crate::error::{Error, Result};
use crate::pem;
use crate::validity::ValidityWindow;

/// RSA modulus size of a generated CA key.
pub const CA_KEY_BITS: u32 = 2048;

/// Lifetime of a generated CA certificate.
pub const CA_VALIDITY_YEARS: u32 = 20;

/// Certificate Authority used to sign leaf certificates.
///
/// Never mutated after construction.
pub struct CertificateAuthority {
    key: PKey<Private>,
    cert: X509,
    subject: String,
}

impl CertificateAuthority {
    /// Creates a new Certificate Authority with a self-signed root certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the identity cannot be encoded as a name,
    /// or [`Error::Crypto`] if key generation or signing fails.
    pub fn generate(identity: &CaIdentity) -> Result<Self> {
        info!("Creating new Certificate Authority: {}", identity.common_name);

        let key = crypto::generate_rsa_key(CA_KEY_BITS)?;

        let mut name = X509NameBuilder::new()?;
        for (nid, value) in [
            (Nid::COMMONNAME, &identity.common_name),
            (Nid::ORGANIZATIONNAME, &identity.organization),
            (Nid::COUNTRYNAME, &identity.country),
        ] {
            name.append_entry_by_nid(nid, value)
                .map_err(|e| Error::Config(format!("invalid CA identity value '{value}': {e}")))?;
        }
        let name = name.build();

        let window = ValidityWindow::from_now(CA_VALIDITY_YEARS)?;
        let serial = SerialNumber::random();

        let mut builder = X509Builder::new()?;
        builder.set_version(2)?;
        builder.set_serial_number(&*serial.to_asn1()?)?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(&name)?;
        builder.set_pubkey(&key)?;
        builder.set_not_before(&*crypto::asn1_time(window.not_before)?)?;
        builder.set_not_after(&*crypto::asn1_time(window.not_after)?)?;

        builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
        builder.append_extension(
            KeyUsage::new()
                .critical()
                .key_cert_sign()
                .crl_sign()
                .build()?,
        )?;
        let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
        builder.append_extension(ski)?;

        builder
            .sign(&key, crypto::signature_digest())
            .map_err(|e| Error::Crypto(format!("failed to sign CA certificate: {e}")))?;
        let cert = builder.build();

        debug!(serial = %serial.to_hex(), "CA root certificate created successfully");

        Self::assemble(key, cert)
    }

    /// Creates a Certificate Authority from an existing key and certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either PEM is unreadable or the key
    /// doesn't match the certificate.
    pub fn from_pem(key_pem: &str, cert_pem: &str) -> Result<Self> {
        let key = crypto::private_key_from_pem(key_pem)?;
        let cert = X509::from_pem(cert_pem.as_bytes())
            .map_err(|e| Error::Config(format!("failed to parse CA certificate: {e}")))?;

        let cert_key = cert
            .public_key()
            .map_err(|e| Error::Config(format!("unsupported CA certificate key: {e}")))?;
        if !cert_key.public_eq(&key) {
            return Err(Error::Config(
                "CA private key does not match the CA certificate".into(),
            ));
        }

        Self::assemble(key, cert)
    }

    fn assemble(key: PKey<Private>, cert: X509) -> Result<Self> {
        let der = cert.to_der()?;
        let (_, parsed) = X509Certificate::from_der(&der)
            .map_err(|e| Error::Config(format!("failed to parse CA certificate: {e}")))?;
        let subject = parsed.subject().to_string();
        Ok(Self { key, cert, subject })
    }

    /// Returns the CA certificate.
    #[must_use]
    pub fn certificate(&self) -> &X509Ref {
        &self.cert
    }

    /// Returns the CA certificate as PEM.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if encoding fails.
    pub fn certificate_pem(&self) -> Result<String> {
        Ok(pem::encode("CERTIFICATE", &self.cert.to_der()?))
    }

    /// Returns the CA subject as a distinguished name string.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the CA subject name.
    #[must_use]
    pub fn subject_name(&self) -> &X509NameRef {
        self.cert.subject_name()
    }

    pub(crate) fn private_key(&self) -> &PKeyRef<Private> {
        &self.key
    }
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("subject", &self.subject)
            .field("key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Process-wide CA holder.
///
/// The first successful [`get_or_create`](Self::get_or_create) fixes the CA for
/// the lifetime of the cache. Concurrent first calls block on one initializer,
/// so every caller observes the same CA. A failed initialization leaves the
/// cache empty and the next call tries again.
#[derive(Debug)]
pub struct AuthorityCache {
    config: CaConfig,
    cell: OnceCell<Arc<CertificateAuthority>>,
}

impl AuthorityCache {
    /// Creates an empty cache for the given configuration.
    #[must_use]
    pub const fn new(config: CaConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Creates a cache that already holds `ca`.
    #[must_use]
    pub fn with_authority(ca: Arc<CertificateAuthority>) -> Self {
        Self {
            config: CaConfig::default(),
            cell: OnceCell::with_value(ca),
        }
    }

    /// Returns the cached CA, loading or generating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the supplied PEM pair is unusable, or
    /// [`Error::Crypto`] if generation fails.
    pub fn get_or_create(&self) -> Result<Arc<CertificateAuthority>> {
        self.cell
            .get_or_try_init(|| self.initialize().map(Arc::new))
            .cloned()
    }

    /// Returns true once a CA has been cached.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    fn initialize(&self) -> Result<CertificateAuthority> {
        if let Some((key_pem, cert_pem)) = self.config.pem_pair() {
            let ca = CertificateAuthority::from_pem(&key_pem, cert_pem)?;
            info!(subject = %ca.subject(), "Loaded Certificate Authority from configuration");
            return Ok(ca);
        }

        if self.config.is_partial() {
            warn!("only one of the CA key and certificate was supplied; ignoring both");
        }

        let ca = CertificateAuthority::generate(&self.config.identity)?;
        warn!(
            subject = %ca.subject(),
            "using an ephemeral CA; certificates it signs will not chain after a restart"
        );
        Ok(ca)
    }
}
