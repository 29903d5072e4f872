//! Core PKI types shared by the issuer, the bundle builder and the batch engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Smallest accepted validity in years.
pub const MIN_VALIDITY_YEARS: u32 = 1;
/// Largest accepted validity in years.
pub const MAX_VALIDITY_YEARS: u32 = 50;

/// A subject attribute as it appears in a CSR: long attribute name and value.
///
/// Attributes without a registered name carry their dotted OID as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAttribute {
    /// Long attribute name, e.g. `commonName`.
    pub name: String,
    /// Attribute value as UTF-8 text.
    pub value: String,
}

impl SubjectAttribute {
    /// Creates a new subject attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The fixed identity record projected from a CSR subject.
///
/// Absent fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIdentity {
    /// Common name.
    #[serde(rename = "CN")]
    pub common_name: String,
    /// Organization.
    #[serde(rename = "O")]
    pub organization: String,
    /// Organizational unit.
    #[serde(rename = "OU")]
    pub organizational_unit: String,
    /// Country.
    #[serde(rename = "C")]
    pub country: String,
    /// State or province.
    #[serde(rename = "ST")]
    pub state: String,
    /// Locality.
    #[serde(rename = "L")]
    pub locality: String,
}

/// A numeric request field that may arrive as a JSON number or as text.
///
/// Deserialization never fails on the value itself: fractional numbers are
/// truncated, out-of-range integers saturate, and booleans, arrays or objects
/// become [`NumericInput::Other`] so the field falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NumericInput {
    /// A JSON number.
    Number(i64),
    /// Free text, parsed by its leading integer prefix.
    Text(String),
    /// A value with no numeric reading.
    Other,
}

impl NumericInput {
    /// Returns the integer value, or `None` if the input is not numeric.
    ///
    /// Text is parsed like a lenient form field: leading whitespace and an
    /// optional sign are accepted, then as many digits as follow. `"12abc"`
    /// yields 12, `"abc"` yields `None`.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => parse_leading_integer(text),
            Self::Other => None,
        }
    }
}

impl<'de> Deserialize<'de> for NumericInput {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NumericInputVisitor)
    }
}

struct NumericInputVisitor;

impl<'de> Visitor<'de> for NumericInputVisitor {
    type Value = NumericInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or numeric text")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<Self::Value, E> {
        Ok(NumericInput::Other)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(NumericInput::Number(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(NumericInput::Number(i64::try_from(v).unwrap_or(i64::MAX)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        if v.is_finite() {
            // Float to int casts saturate.
            Ok(NumericInput::Number(v.trunc() as i64))
        } else {
            Ok(NumericInput::Other)
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(NumericInput::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(NumericInput::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(NumericInput::Other)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(NumericInput::Other)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(NumericInput::Other)
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(NumericInput::Other)
    }
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

fn parse_leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    // Saturate absurdly long digit runs; the caller clamps anyway.
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Certificate validity in whole calendar years, always within [1, 50].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ValidityYears(u32);

impl ValidityYears {
    /// Clamps `years` into the accepted range.
    #[must_use]
    pub fn clamped(years: i64) -> Self {
        let clamped = years.clamp(i64::from(MIN_VALIDITY_YEARS), i64::from(MAX_VALIDITY_YEARS));
        Self(clamped as u32)
    }

    /// Resolves an optional request field. Missing or non-numeric input is one year.
    #[must_use]
    pub fn from_input(input: Option<&NumericInput>) -> Self {
        input
            .and_then(NumericInput::as_integer)
            .map_or(Self(MIN_VALIDITY_YEARS), Self::clamped)
    }

    /// Returns the number of years.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for ValidityYears {
    fn default() -> Self {
        Self(MIN_VALIDITY_YEARS)
    }
}

impl std::fmt::Display for ValidityYears {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RSA modulus sizes accepted for generated end-entity keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeySize {
    /// 2048-bit RSA.
    #[default]
    Rsa2048,
    /// 3072-bit RSA.
    Rsa3072,
    /// 4096-bit RSA.
    Rsa4096,
}

impl KeySize {
    /// Maps a requested bit count onto an accepted size; anything else is 2048.
    #[must_use]
    pub const fn from_bits(bits: i64) -> Self {
        match bits {
            3072 => Self::Rsa3072,
            4096 => Self::Rsa4096,
            _ => Self::Rsa2048,
        }
    }

    /// Resolves an optional request field. Missing or non-numeric input is 2048.
    #[must_use]
    pub fn from_input(input: Option<&NumericInput>) -> Self {
        input
            .and_then(NumericInput::as_integer)
            .map_or(Self::Rsa2048, Self::from_bits)
    }

    /// Returns the modulus size in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa3072 => 3072,
            Self::Rsa4096 => 4096,
        }
    }
}

/// A leaf certificate signed by the CA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCertificate {
    der: Vec<u8>,
    serial: String,
    subject: String,
    issuer: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    extensions: Vec<String>,
}

impl IssuedCertificate {
    /// Parses a DER certificate and records the serial it was issued with.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed.
    pub fn from_der(der: Vec<u8>, serial: String) -> Result<Self> {
        use x509_parser::prelude::*;

        let (_, cert) = X509Certificate::from_der(&der)
            .map_err(|e| Error::Crypto(format!("failed to parse issued certificate: {e}")))?;

        let not_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or_else(|| Error::Crypto("invalid not_before timestamp".into()))?;
        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| Error::Crypto("invalid not_after timestamp".into()))?;

        let subject = cert.subject().to_string();
        let issuer = cert.issuer().to_string();
        let extensions = cert
            .extensions()
            .iter()
            .map(|ext| ext.oid.to_id_string())
            .collect();

        Ok(Self {
            der,
            serial,
            subject,
            issuer,
            not_before,
            not_after,
            extensions,
        })
    }

    /// Returns the DER-encoded certificate bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the PEM-encoded certificate.
    #[must_use]
    pub fn pem(&self) -> String {
        crate::pem::encode("CERTIFICATE", &self.der)
    }

    /// Returns the serial number as 32 lowercase hex characters.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Returns the subject distinguished name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the issuer distinguished name.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the certificate validity start time.
    #[must_use]
    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// Returns the certificate validity end time.
    #[must_use]
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Returns the extension OIDs in the order they were emitted.
    #[must_use]
    pub fn extension_oids(&self) -> &[String] {
        &self.extensions
    }
}

/// Result of signing a single uploaded CSR.
#[derive(Debug, Clone)]
pub struct RenewedCertificate {
    /// Suggested filename, `<identifier>.cer`.
    pub filename: String,
    /// DER-encoded certificate.
    pub der: Vec<u8>,
}

/// Subject preview of an uploaded CSR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrPreview {
    /// Where the CSR came from (file name, `file`, `pasted`, `unknown`).
    pub source: String,
    /// The projected subject record.
    pub subject: SubjectIdentity,
}
