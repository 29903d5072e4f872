//! Subject projection and the name-derivation policy for output files.
//!
//! # Name-derivation policy
//!
//! Output files are named after an *identifier* taken from the CSR:
//!
//! 1. Use the CSR's common name. If it has none, use the caller's fallback
//!    (an uploaded filename, a batch entry's base name, or `certificate`).
//! 2. Cut at the first `_`: `client01_prod` names the file `client01`. The
//!    part before the delimiter is the organizational identifier.
//! 3. Keep only ASCII alphanumerics and `- _ . @ ( )`, then trim. An empty
//!    result becomes `certificate`.

use crate::csr::CertificationRequest;
use crate::types::SubjectIdentity;

/// Identifier used when nothing better can be derived.
pub const DEFAULT_IDENTIFIER: &str = "certificate";

/// Characters kept by [`safe_cert_name`] besides ASCII alphanumerics.
const IDENTIFIER_EXTRA: &str = "-_.@()";

/// Characters kept by [`sanitize_field`] besides ASCII alphanumerics.
const FIELD_EXTRA: &str = " -_.@()&,/";

/// Projects the well-known subject attributes of a CSR into a fixed record.
///
/// Unknown attribute names are ignored. Repeated names keep the last value.
#[must_use]
pub fn subject_identity(csr: &CertificationRequest) -> SubjectIdentity {
    let mut identity = SubjectIdentity::default();
    for attr in csr.subject() {
        let slot = match attr.name.as_str() {
            "commonName" => &mut identity.common_name,
            "organizationName" => &mut identity.organization,
            "organizationalUnitName" => &mut identity.organizational_unit,
            "countryName" => &mut identity.country,
            "stateOrProvinceName" => &mut identity.state,
            "localityName" => &mut identity.locality,
            _ => continue,
        };
        slot.clone_from(&attr.value);
    }
    identity
}

/// Derives the output identifier for a CSR, per the module's naming policy.
#[must_use]
pub fn derive_identifier(common_name: Option<&str>, fallback: Option<&str>) -> String {
    let raw = common_name
        .filter(|cn| !cn.is_empty())
        .or_else(|| fallback.filter(|name| !name.is_empty()))
        .unwrap_or(DEFAULT_IDENTIFIER);
    let client_id = raw.split('_').next().unwrap_or(raw);
    safe_cert_name(client_id)
}

/// Keeps ASCII alphanumerics and `- _ . @ ( )`, then trims.
///
/// Returns [`DEFAULT_IDENTIFIER`] when nothing survives.
#[must_use]
pub fn safe_cert_name(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || IDENTIFIER_EXTRA.contains(*ch))
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() {
        DEFAULT_IDENTIFIER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitizes a free-form subject field from the generation form.
///
/// Keeps ASCII alphanumerics and `space - _ . @ ( ) & , /`, stops once
/// `max_len` characters have been kept, then trims.
#[must_use]
pub fn sanitize_field(raw: &str, max_len: usize) -> String {
    let kept: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || FIELD_EXTRA.contains(*ch))
        .take(max_len)
        .collect();
    kept.trim().to_string()
}

/// Returns the base name of an archive entry: directories and the final
/// extension stripped. Both `/` and `\` count as separators.
#[must_use]
pub fn entry_base_name(entry_name: &str) -> &str {
    let file = entry_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(entry_name);
    match file.rfind('.') {
        Some(dot) if dot + 1 < file.len() => &file[..dot],
        _ => file,
    }
}
