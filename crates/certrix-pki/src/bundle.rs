//! Self-service certificate bundles.
//!
//! A bundle is a ZIP archive holding a freshly generated private key, the CSR
//! built over it, the signed leaf, the CA certificate and a PKCS#12 container
//! with the key and the chain.

use openssl::nid::Nid;
use openssl::x509::{X509, X509NameBuilder, X509ReqBuilder};
use serde::Deserialize;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::archive::ArchiveBuilder;
use crate::ca::CertificateAuthority;
use crate::crypto;
use crate::csr::CertificationRequest;
use crate::error::{Error, Result};
use crate::issuer;
use crate::naming::{safe_cert_name, sanitize_field};
use crate::types::{IssuedCertificate, KeySize, NumericInput, ValidityYears};

/// Maximum kept length of the common name.
pub const CN_MAX_LEN: usize = 128;
/// Maximum kept length of the country code.
pub const COUNTRY_MAX_LEN: usize = 2;
/// Maximum kept length of the state or province.
pub const STATE_MAX_LEN: usize = 64;
/// Maximum kept length of the locality.
pub const LOCALITY_MAX_LEN: usize = 64;
/// Maximum kept length of the organization.
pub const ORG_MAX_LEN: usize = 128;
/// Maximum kept length of the organizational unit.
pub const OU_MAX_LEN: usize = 128;

/// Archive entry name of the CA certificate.
pub const CA_CERT_ENTRY: &str = "ca_certificate.cer";

/// A request for a new certificate bundle.
///
/// Passwords are wiped from memory when the request is dropped.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct GenerateRequest {
    /// Common name. Required.
    #[serde(default)]
    pub cn: Option<String>,
    /// Two-letter country code.
    #[serde(default)]
    pub country: Option<String>,
    /// State or province.
    #[serde(default)]
    pub state: Option<String>,
    /// Locality.
    #[serde(default)]
    pub locality: Option<String>,
    /// Organization.
    #[serde(default)]
    pub org: Option<String>,
    /// Organizational unit.
    #[serde(default)]
    pub ou: Option<String>,
    /// Validity in years, clamped to [1, 50].
    #[zeroize(skip)]
    #[serde(default)]
    pub years: Option<NumericInput>,
    /// RSA key size: 2048, 3072 or 4096.
    #[zeroize(skip)]
    #[serde(default)]
    pub key_size: Option<NumericInput>,
    /// Password encrypting the PEM private key. Empty means unencrypted.
    #[serde(default)]
    pub key_pass: Option<String>,
    /// Password of the PKCS#12 container. Absent means empty.
    #[serde(default)]
    pub pfx_pass: Option<String>,
}

impl GenerateRequest {
    /// Creates a request for `cn` with every other field left at its default.
    #[must_use]
    pub fn new(cn: impl Into<String>) -> Self {
        let mut request = Self::default();
        request.cn = Some(cn.into());
        request
    }

    /// Checks that the request names a usable common name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the common name is empty after
    /// sanitization.
    pub fn validate(&self) -> Result<()> {
        BundleSubject::from_request(self).map(|_| ())
    }
}

impl std::fmt::Debug for GenerateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateRequest")
            .field("cn", &self.cn)
            .field("country", &self.country)
            .field("state", &self.state)
            .field("locality", &self.locality)
            .field("org", &self.org)
            .field("ou", &self.ou)
            .field("years", &self.years)
            .field("key_size", &self.key_size)
            .field("key_pass", &self.key_pass.as_ref().map(|_| "[REDACTED]"))
            .field("pfx_pass", &self.pfx_pass.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// The sanitized subject of a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BundleSubject {
    cn: String,
    country: String,
    state: String,
    locality: String,
    org: String,
    ou: String,
}

impl BundleSubject {
    fn from_request(request: &GenerateRequest) -> Result<Self> {
        let field = |value: &Option<String>, max_len| {
            sanitize_field(value.as_deref().unwrap_or_default(), max_len)
        };

        let cn = field(&request.cn, CN_MAX_LEN);
        if cn.is_empty() {
            return Err(Error::Validation("CN required".into()));
        }

        Ok(Self {
            cn,
            country: field(&request.country, COUNTRY_MAX_LEN),
            state: field(&request.state, STATE_MAX_LEN),
            locality: field(&request.locality, LOCALITY_MAX_LEN),
            org: field(&request.org, ORG_MAX_LEN),
            ou: field(&request.ou, OU_MAX_LEN),
        })
    }

    /// Subject entries in CSR order, empty optional fields omitted.
    fn entries(&self) -> impl Iterator<Item = (Nid, &str)> {
        [
            (Nid::COMMONNAME, self.cn.as_str()),
            (Nid::COUNTRYNAME, self.country.as_str()),
            (Nid::STATEORPROVINCENAME, self.state.as_str()),
            (Nid::LOCALITYNAME, self.locality.as_str()),
            (Nid::ORGANIZATIONNAME, self.org.as_str()),
            (Nid::ORGANIZATIONALUNITNAME, self.ou.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}

/// A generated certificate bundle.
#[derive(Debug, Clone)]
pub struct GeneratedBundle {
    /// Archive filename, `<cn>_certs.zip`.
    pub filename: String,
    /// ZIP archive bytes.
    pub archive: Vec<u8>,
    /// The issued leaf certificate.
    pub certificate: IssuedCertificate,
}

/// Generates a key pair, has the CA sign it and packages every artifact.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the common name is empty after
/// sanitization (before any key is generated) or a subject field is rejected
/// by the name encoder, and [`Error::Crypto`] or [`Error::Archive`] if any
/// later step fails.
pub fn generate(request: &GenerateRequest, ca: &CertificateAuthority) -> Result<GeneratedBundle> {
    let subject = BundleSubject::from_request(request)?;
    let years = ValidityYears::from_input(request.years.as_ref());
    let key_size = KeySize::from_input(request.key_size.as_ref());

    info!(
        cn = %subject.cn,
        years = %years,
        key_bits = key_size.bits(),
        "Generating certificate bundle"
    );

    let key = crypto::generate_rsa_key(key_size.bits())?;

    let mut name = X509NameBuilder::new()?;
    for (nid, value) in subject.entries() {
        name.append_entry_by_nid(nid, value).map_err(|e| {
            Error::Validation(format!("invalid {} '{value}': {e}", nid.short_name().unwrap_or("field")))
        })?;
    }
    let name = name.build();

    let mut req = X509ReqBuilder::new()?;
    req.set_version(0)?;
    req.set_subject_name(&name)?;
    req.set_pubkey(&key)?;
    req.sign(&key, crypto::signature_digest())?;
    let csr = CertificationRequest::from_req(req.build())?;

    let certificate = issuer::sign(&csr, years, ca)?;

    let key_pass = request.key_pass.as_deref().unwrap_or_default();
    let pfx_pass = request.pfx_pass.as_deref().unwrap_or_default();
    let leaf = X509::from_der(certificate.der())?;
    let pkcs12 = crypto::build_pkcs12(
        &subject.cn,
        &key,
        &leaf,
        &[ca.certificate().to_owned()],
        pfx_pass,
    )?;
    let key_pem = crypto::private_key_to_pem(&key, key_pass)?;

    let file_cn = safe_cert_name(&subject.cn);
    let mut archive = ArchiveBuilder::new();
    archive.insert(format!("{file_cn}.prv"), key_pem.to_vec());
    archive.insert(format!("{file_cn}.csr"), csr.to_pem()?.into_bytes());
    archive.insert(format!("{file_cn}.cer"), certificate.pem().into_bytes());
    archive.insert(format!("{file_cn}.pfx"), pkcs12);
    archive.insert(CA_CERT_ENTRY, ca.certificate_pem()?.into_bytes());

    Ok(GeneratedBundle {
        filename: format!("{file_cn}_certs.zip"),
        archive: archive.finish()?,
        certificate,
    })
}
