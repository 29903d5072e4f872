//! Leaf certificate issuance.
//!
//! Every leaf carries the CSR's requested extensions first, followed by a
//! subject key identifier, a fixed key usage and a fixed extended key usage.
//! A requested extension whose OID collides with one of the fixed three is
//! dropped, so each OID appears once.

use std::str::FromStr;

use openssl::asn1::{Asn1Object, Asn1OctetString};
use openssl::x509::extension::{ExtendedKeyUsage, KeyUsage, SubjectKeyIdentifier};
use openssl::x509::{X509Builder, X509Extension};
use tracing::{debug, info};

use crate::ca::CertificateAuthority;
use crate::crypto::{self, SerialNumber};
use crate::csr::{CertificationRequest, RequestedExtension};
use crate::error::{Error, Result};
use crate::types::{IssuedCertificate, ValidityYears};
use crate::validity::ValidityWindow;

/// OIDs of the extensions the issuer always sets itself.
pub const ENFORCED_EXTENSION_OIDS: [&str; 3] = [
    "2.5.29.14", // subjectKeyIdentifier
    "2.5.29.15", // keyUsage
    "2.5.29.37", // extKeyUsage
];

/// Signs `csr` with the CA for `years` calendar years starting now.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the CSR key is unusable, or
/// [`Error::Crypto`] if building or signing the certificate fails.
pub fn sign(
    csr: &CertificationRequest,
    years: ValidityYears,
    ca: &CertificateAuthority,
) -> Result<IssuedCertificate> {
    let window = ValidityWindow::from_now(years.get())?;
    sign_with_window(csr, window, ca)
}

/// Signs `csr` with the CA for an explicit validity window.
///
/// # Errors
///
/// Same as [`sign`].
pub fn sign_with_window(
    csr: &CertificationRequest,
    window: ValidityWindow,
    ca: &CertificateAuthority,
) -> Result<IssuedCertificate> {
    let serial = SerialNumber::random();
    let public_key = csr.public_key()?;

    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;
    builder.set_serial_number(&*serial.to_asn1()?)?;
    builder.set_subject_name(csr.as_req().subject_name())?;
    builder.set_issuer_name(ca.subject_name())?;
    builder.set_pubkey(&public_key)?;
    builder.set_not_before(&*crypto::asn1_time(window.not_before)?)?;
    builder.set_not_after(&*crypto::asn1_time(window.not_after)?)?;

    for requested in csr.requested_extensions() {
        if ENFORCED_EXTENSION_OIDS.contains(&requested.oid.as_str()) {
            debug!(oid = %requested.oid, "Dropping requested extension overridden by policy");
            continue;
        }
        builder.append_extension(copy_extension(requested)?)?;
    }

    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(Some(ca.certificate()), None))?;
    builder.append_extension(ski)?;
    builder.append_extension(
        KeyUsage::new()
            .digital_signature()
            .non_repudiation()
            .key_encipherment()
            .build()?,
    )?;
    builder.append_extension(ExtendedKeyUsage::new().server_auth().client_auth().build()?)?;

    builder
        .sign(ca.private_key(), crypto::signature_digest())
        .map_err(|e| Error::Crypto(format!("failed to sign certificate: {e}")))?;
    let cert = builder.build();

    let issued = IssuedCertificate::from_der(cert.to_der()?, serial.to_hex())?;
    info!(
        serial = %issued.serial(),
        not_after = %issued.not_after(),
        "Issued certificate for: {}",
        issued.subject()
    );
    Ok(issued)
}

fn copy_extension(requested: &RequestedExtension) -> Result<X509Extension> {
    let oid = Asn1Object::from_str(&requested.oid)?;
    let value = Asn1OctetString::new_from_bytes(&requested.value)?;
    Ok(X509Extension::new_from_der(&oid, requested.critical, &value)?)
}
