//! Test helpers for E2E tests.

#![allow(dead_code)]

use std::sync::Arc;

use once_cell::sync::Lazy;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509, X509NameBuilder, X509Req, X509ReqBuilder};

use certrix_pki::archive::{ArchiveBuilder, ArchiveEntry};
use certrix_pki::{CaIdentity, CertificateAuthority, Certrix};

/// Key shared by every test CSR.
static REQUEST_KEY: Lazy<PKey<Private>> = Lazy::new(|| {
    let rsa = Rsa::generate(2048).unwrap();
    PKey::from_rsa(rsa).unwrap()
});

/// One CA per test binary.
static SHARED_CA: Lazy<Arc<CertificateAuthority>> =
    Lazy::new(|| Arc::new(CertificateAuthority::generate(&CaIdentity::default()).unwrap()));

/// Returns the shared test CA.
pub fn shared_ca() -> Arc<CertificateAuthority> {
    Arc::clone(&SHARED_CA)
}

/// A service around the shared CA.
pub fn service() -> Certrix {
    Certrix::with_authority(shared_ca())
}

/// Builds a signed CSR with the given subject entries.
pub fn build_csr(subject: &[(&str, &str)]) -> X509Req {
    let mut name = X509NameBuilder::new().unwrap();
    for (field, value) in subject {
        name.append_entry_by_text(field, value).unwrap();
    }
    let name = name.build();

    let mut req = X509ReqBuilder::new().unwrap();
    req.set_subject_name(&name).unwrap();
    req.set_pubkey(&REQUEST_KEY).unwrap();
    req.sign(&REQUEST_KEY, MessageDigest::sha256()).unwrap();
    req.build()
}

/// PEM CSR for `cn` with a fixed organization.
pub fn csr_pem(cn: &str) -> Vec<u8> {
    build_csr(&[("CN", cn), ("O", "Certrix QA")]).to_pem().unwrap()
}

/// DER CSR for `cn` with a fixed organization.
pub fn csr_der(cn: &str) -> Vec<u8> {
    build_csr(&[("CN", cn), ("O", "Certrix QA")]).to_der().unwrap()
}

/// Builds a ZIP archive from `(name, data)` pairs.
pub fn zip_of<N: Into<String>>(entries: Vec<(N, Vec<u8>)>) -> Vec<u8> {
    let mut builder = ArchiveBuilder::new();
    for (name, data) in entries {
        builder.insert(name, data);
    }
    builder.finish().unwrap()
}

/// Finds an archive entry by name.
pub fn entry<'a>(entries: &'a [ArchiveEntry], name: &str) -> &'a ArchiveEntry {
    entries
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("missing entry {name}"))
}

/// A self-signed CA key and certificate created outside the library, as PEM.
pub fn external_ca_pem(common_name: &str) -> (String, String) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    name.append_entry_by_text("O", "External Org").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(4242).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let key_pem = String::from_utf8(key.private_key_to_pem_pkcs8().unwrap()).unwrap();
    let cert_pem = String::from_utf8(cert.to_pem().unwrap()).unwrap();
    (key_pem, cert_pem)
}
