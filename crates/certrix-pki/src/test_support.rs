//! Shared fixtures for unit tests.

use std::sync::Arc;

use once_cell::sync::Lazy;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::{X509Extension, X509NameBuilder, X509Req, X509ReqBuilder};

use crate::ca::CertificateAuthority;
use crate::config::CaIdentity;

static REQUEST_KEY: Lazy<PKey<Private>> = Lazy::new(|| {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
});

static TEST_CA: Lazy<Arc<CertificateAuthority>> = Lazy::new(|| {
    Arc::new(CertificateAuthority::generate(&CaIdentity::default()).unwrap())
});

/// Builds a signed request with the given subject entries and extensions.
pub(crate) fn build_req(
    subject: &[(&str, &str)],
    extensions: Option<Stack<X509Extension>>,
) -> X509Req {
    let mut name = X509NameBuilder::new().unwrap();
    for (field, value) in subject {
        name.append_entry_by_text(field, value).unwrap();
    }
    let name = name.build();

    let mut builder = X509ReqBuilder::new().unwrap();
    builder.set_version(0).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_pubkey(&REQUEST_KEY).unwrap();
    if let Some(extensions) = extensions {
        builder.add_extensions(&extensions).unwrap();
    }
    builder.sign(&REQUEST_KEY, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// PEM bytes of a request whose only subject entry is `CN=<cn>`.
pub(crate) fn csr_pem(cn: &str) -> Vec<u8> {
    build_req(&[("CN", cn)], None).to_pem().unwrap()
}

/// DER bytes of a request whose only subject entry is `CN=<cn>`.
pub(crate) fn csr_der(cn: &str) -> Vec<u8> {
    build_req(&[("CN", cn)], None).to_der().unwrap()
}

/// A CA shared by all tests in the crate.
pub(crate) fn test_ca() -> Arc<CertificateAuthority> {
    Arc::clone(&TEST_CA)
}
