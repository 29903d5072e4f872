//! Cryptographic capabilities used by the CA, the issuer and the bundle builder.
//!
//! Every call into the PKI backend goes through this module: RSA key generation,
//! serial numbers, time conversion, key encryption and PKCS#12 assembly. The rest
//! of the crate never names a cipher or a digest directly.

use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::symm::Cipher;
use openssl::x509::{X509, X509Ref};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Length of a certificate serial number in bytes (128 bits).
pub const SERIAL_LEN: usize = 16;

/// Digest used for every signature this crate produces.
#[must_use]
pub fn signature_digest() -> MessageDigest {
    MessageDigest::sha256()
}

/// Generates a fresh RSA key pair of the given modulus size.
pub fn generate_rsa_key(bits: u32) -> Result<PKey<Private>> {
    let rsa = Rsa::generate(bits)
        .map_err(|e| Error::Crypto(format!("failed to generate {bits}-bit RSA key: {e}")))?;
    Ok(PKey::from_rsa(rsa)?)
}

/// A random 128-bit certificate serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialNumber([u8; SERIAL_LEN]);

impl SerialNumber {
    /// Draws a new serial number.
    ///
    /// The top bit is cleared so the DER INTEGER stays positive, and the next bit
    /// is set so the encoding never loses a leading byte.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; SERIAL_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes[0] = (bytes[0] & 0x7f) | 0x40;
        Self(bytes)
    }

    /// Lowercase hexadecimal rendering, always 32 characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Converts the serial into an ASN.1 integer for the certificate builder.
    pub fn to_asn1(&self) -> Result<Asn1Integer> {
        let bn = BigNum::from_slice(&self.0)?;
        Ok(bn.to_asn1_integer()?)
    }
}

/// Converts a UTC timestamp into an ASN.1 time.
pub fn asn1_time(at: DateTime<Utc>) -> Result<Asn1Time> {
    Asn1Time::from_unix(at.timestamp())
        .map_err(|e| Error::Crypto(format!("invalid certificate time {at}: {e}")))
}

/// Loads a PEM private key. Both PKCS#8 and PKCS#1 armor are accepted.
pub fn private_key_from_pem(pem: &str) -> Result<PKey<Private>> {
    PKey::private_key_from_pem(pem.as_bytes())
        .map_err(|e| Error::Config(format!("failed to parse CA private key: {e}")))
}

/// Serializes an RSA private key as PKCS#1 PEM.
///
/// With a non-empty password the key is encrypted with AES-256-CBC.
pub fn private_key_to_pem(key: &PKeyRef<Private>, password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let rsa = key.rsa()?;
    let pem = if password.is_empty() {
        rsa.private_key_to_pem()?
    } else {
        rsa.private_key_to_pem_passphrase(Cipher::aes_256_cbc(), password.as_bytes())?
    };
    Ok(Zeroizing::new(pem))
}

/// Builds a DER-encoded PKCS#12 container holding `key`, `cert` and `chain`.
///
/// Key and certificate bags are encrypted with PBE-SHA1-3DES under `password`
/// (which may be empty).
pub fn build_pkcs12(
    friendly_name: &str,
    key: &PKeyRef<Private>,
    cert: &X509Ref,
    chain: &[X509],
    password: &str,
) -> Result<Vec<u8>> {
    let mut ca_stack = Stack::new()?;
    for ca in chain {
        ca_stack.push(ca.clone())?;
    }

    let pkcs12 = Pkcs12::builder()
        .name(friendly_name)
        .pkey(key)
        .cert(cert)
        .ca(ca_stack)
        .key_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC)
        .cert_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC)
        .build2(password)
        .map_err(|e| Error::Crypto(format!("failed to build PKCS#12 container: {e}")))?;

    Ok(pkcs12.to_der()?)
}
