//! Certificate signing request decoding.
//!
//! Raw bytes are sniffed once: text carrying a recognized CSR armor is decoded
//! as PEM and nothing else, anything else is decoded as binary DER. There is no
//! fallback between the two paths.

use openssl::nid::Nid;
use openssl::pkey::{PKey, Public};
use openssl::x509::{X509Req, X509ReqRef};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::cri_attributes::ParsedCriAttribute;
use x509_parser::prelude::FromDer;

use crate::error::{Error, Result};
use crate::pem;
use crate::types::SubjectAttribute;

/// Attribute name of the common name.
pub const COMMON_NAME: &str = "commonName";

/// An extension requested by the CSR through its `extensionRequest` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedExtension {
    /// Dotted extension OID.
    pub oid: String,
    /// Criticality flag as requested.
    pub critical: bool,
    /// DER contents of the extension value.
    pub value: Vec<u8>,
}

/// A decoded certificate signing request.
pub struct CertificationRequest {
    req: X509Req,
    subject: Vec<SubjectAttribute>,
    requested_extensions: Vec<RequestedExtension>,
}

impl CertificationRequest {
    /// Decodes a CSR from PEM or DER bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when the bytes are not a valid CSR.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(bytes);

        let req = if let Some(normalized) = pem::normalize_csr(text.trim()) {
            X509Req::from_pem(normalized.as_bytes())
                .map_err(|e| Error::Decode(format!("PEM decode failed: {e}")))?
        } else {
            X509Req::from_der(bytes).map_err(|_| Error::Decode("DER decode failed".into()))?
        };

        Self::from_req(req)
    }

    /// Wraps an already built request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the subject or the attributes cannot be read.
    pub fn from_req(req: X509Req) -> Result<Self> {
        let subject = subject_attributes(&req)?;
        let requested_extensions = requested_extensions(&req)?;
        Ok(Self {
            req,
            subject,
            requested_extensions,
        })
    }

    /// Returns the subject attributes in their original order.
    #[must_use]
    pub fn subject(&self) -> &[SubjectAttribute] {
        &self.subject
    }

    /// Returns the value of the first `commonName` attribute, if any.
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.subject
            .iter()
            .find(|attr| attr.name == COMMON_NAME)
            .map(|attr| attr.value.as_str())
    }

    /// Returns the extensions the requester asked for.
    #[must_use]
    pub fn requested_extensions(&self) -> &[RequestedExtension] {
        &self.requested_extensions
    }

    /// Returns the subject public key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the key is not usable.
    pub fn public_key(&self) -> Result<PKey<Public>> {
        self.req
            .public_key()
            .map_err(|e| Error::Decode(format!("unsupported public key: {e}")))
    }

    /// Returns the underlying request.
    #[must_use]
    pub fn as_req(&self) -> &X509ReqRef {
        &self.req
    }

    /// Returns the DER encoding of the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if encoding fails.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.req.to_der()?)
    }

    /// Returns the PEM encoding of the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if encoding fails.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem::encode(pem::CSR_LABEL, &self.to_der()?))
    }
}

impl std::fmt::Debug for CertificationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificationRequest")
            .field("subject", &self.subject)
            .field("requested_extensions", &self.requested_extensions.len())
            .finish_non_exhaustive()
    }
}

fn subject_attributes(req: &X509ReqRef) -> Result<Vec<SubjectAttribute>> {
    req.subject_name()
        .entries()
        .map(|entry| {
            let object = entry.object();
            let nid = object.nid();
            let name = if nid == Nid::UNDEF {
                object.to_string()
            } else {
                nid.long_name()
                    .map_or_else(|_| object.to_string(), str::to_string)
            };
            let value = entry
                .data()
                .as_utf8()
                .map_err(|e| Error::Decode(format!("unreadable subject attribute {name}: {e}")))?;
            Ok(SubjectAttribute::new(name, value.to_string()))
        })
        .collect()
}

fn requested_extensions(req: &X509ReqRef) -> Result<Vec<RequestedExtension>> {
    let der = req.to_der()?;
    let (_, parsed) = X509CertificationRequest::from_der(&der)
        .map_err(|e| Error::Decode(format!("failed to parse request attributes: {e}")))?;

    let mut extensions = Vec::new();
    for attribute in parsed.certification_request_info.attributes() {
        if let ParsedCriAttribute::ExtensionRequest(request) = attribute.parsed_attribute() {
            extensions.extend(request.extensions.iter().map(|ext| RequestedExtension {
                oid: ext.oid.to_id_string(),
                critical: ext.critical,
                value: ext.value.to_vec(),
            }));
        }
    }
    Ok(extensions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::stack::Stack;
    use openssl::x509::X509ReqBuilder;
    use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectAlternativeName};

    use crate::test_support::build_req;

    fn sample_req() -> X509Req {
        build_req(
            &[
                ("CN", "client01_prod"),
                ("O", "Example Org"),
                ("OU", "Payments"),
                ("C", "IN"),
                ("ST", "Maharashtra"),
                ("L", "Mumbai"),
            ],
            None,
        )
    }

    #[test]
    fn decodes_pem() {
        let req = sample_req();
        let pem = req.to_pem().unwrap();
        let csr = CertificationRequest::decode(&pem).unwrap();
        assert_eq!(csr.common_name(), Some("client01_prod"));
        assert_eq!(csr.subject().len(), 6);
        assert_eq!(csr.subject()[1], SubjectAttribute::new("organizationName", "Example Org"));
    }

    #[test]
    fn pem_and_der_decode_identically() {
        let req = sample_req();
        let from_pem = CertificationRequest::decode(&req.to_pem().unwrap()).unwrap();
        let from_der = CertificationRequest::decode(&req.to_der().unwrap()).unwrap();

        assert_eq!(from_pem.subject(), from_der.subject());
        assert_eq!(
            from_pem.public_key().unwrap().public_key_to_der().unwrap(),
            from_der.public_key().unwrap().public_key_to_der().unwrap()
        );
    }

    #[test]
    fn decodes_crlf_and_alternate_labels() {
        let req = sample_req();
        let pem = String::from_utf8(req.to_pem().unwrap()).unwrap();

        let crlf = pem.replace('\n', "\r\n");
        assert!(CertificationRequest::decode(crlf.as_bytes()).is_ok());

        let new_label = pem.replace("CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST");
        assert!(CertificationRequest::decode(new_label.as_bytes()).is_ok());

        let csr_label = pem.replace("CERTIFICATE REQUEST", "CSR");
        assert!(CertificationRequest::decode(csr_label.as_bytes()).is_ok());

        let padded = format!("\n\n  {pem}\n\n");
        assert!(CertificationRequest::decode(padded.as_bytes()).is_ok());
    }

    #[test]
    fn decodes_single_line_pem() {
        let pem = String::from_utf8(sample_req().to_pem().unwrap()).unwrap();
        let flat: String = pem.lines().collect();
        assert!(!flat.contains('\n'));

        let csr = CertificationRequest::decode(flat.as_bytes()).unwrap();
        assert_eq!(csr.common_name(), Some("client01_prod"));
    }

    #[test]
    fn malformed_pem_body_does_not_fall_back() {
        let text = "-----BEGIN CERTIFICATE REQUEST-----\nnot base64 at all!\n-----END CERTIFICATE REQUEST-----\n";
        let err = CertificationRequest::decode(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg.starts_with("PEM decode failed")));
    }

    #[test]
    fn garbage_is_der_decode_error() {
        let err = CertificationRequest::decode(b"\x00\x01garbage").unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg == "DER decode failed"));
        assert_eq!(err.to_string(), "invalid CSR: DER decode failed");
    }

    #[test]
    fn certificate_pem_is_not_a_csr() {
        let err = CertificationRequest::decode(
            b"-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn missing_common_name() {
        let req = build_req(&[("O", "No Name Ltd")], None);
        let csr = CertificationRequest::decode(&req.to_der().unwrap()).unwrap();
        assert_eq!(csr.common_name(), None);
    }

    #[test]
    fn unregistered_attribute_reported_by_oid() {
        let req = build_req(&[("CN", "oid-test"), ("1.3.6.1.4.1.55555.1", "custom")], None);
        let csr = CertificationRequest::decode(&req.to_der().unwrap()).unwrap();
        assert_eq!(csr.subject()[1].name, "1.3.6.1.4.1.55555.1");
        assert_eq!(csr.subject()[1].value, "custom");
    }

    #[test]
    fn reads_requested_extensions() {
        let mut extensions = Stack::new().unwrap();
        extensions
            .push(BasicConstraints::new().critical().build().unwrap())
            .unwrap();
        extensions
            .push(KeyUsage::new().digital_signature().build().unwrap())
            .unwrap();
        let builder = X509ReqBuilder::new().unwrap();
        let san = SubjectAlternativeName::new()
            .dns("svc.example.com")
            .build(&builder.x509v3_context(None))
            .unwrap();
        extensions.push(san).unwrap();

        let req = build_req(&[("CN", "svc.example.com")], Some(extensions));
        let csr = CertificationRequest::decode(&req.to_pem().unwrap()).unwrap();

        let oids: Vec<&str> = csr
            .requested_extensions()
            .iter()
            .map(|ext| ext.oid.as_str())
            .collect();
        assert_eq!(oids, ["2.5.29.19", "2.5.29.15", "2.5.29.17"]);
        assert!(csr.requested_extensions()[0].critical);
        assert!(!csr.requested_extensions()[2].critical);
    }

    #[test]
    fn debug_lists_subject() {
        let csr = CertificationRequest::from_req(sample_req()).unwrap();
        let debug = format!("{csr:?}");
        assert!(debug.contains("client01_prod"));
    }
}
