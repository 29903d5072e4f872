//! PEM armor helpers.

use base64::Engine;

/// Labels recognized as a certificate signing request, in match order.
const CSR_LABELS: [&str; 3] = ["NEW CERTIFICATE REQUEST", "CERTIFICATE REQUEST", "CSR"];

/// Label the PKI backend expects for a certificate signing request.
pub const CSR_LABEL: &str = "CERTIFICATE REQUEST";

/// Encodes DER bytes as PEM with the given label.
#[must_use]
pub fn encode(label: &str, der: &[u8]) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(der);
    format!(
        "-----BEGIN {label}-----\n{}\n-----END {label}-----\n",
        b64.as_bytes()
            .chunks(64)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
    )
}

/// Finds a CSR `BEGIN` marker in `text`, ignoring case and runs of whitespace
/// between `BEGIN` and the label.
///
/// Returns the byte offset of the marker and the label as it appears in the
/// text.
#[must_use]
pub fn find_csr_header(text: &str) -> Option<(usize, &str)> {
    let upper = text.to_ascii_uppercase();
    let mut search_from = 0;
    while let Some(found) = upper[search_from..].find("-----BEGIN") {
        let start = search_from + found;
        let after_begin = start + "-----BEGIN".len();
        let rest = &upper[after_begin..];
        let label_start = after_begin + (rest.len() - rest.trim_start().len());
        if label_start > after_begin {
            for label in CSR_LABELS {
                let candidate = &upper[label_start..];
                if candidate.starts_with(label) && candidate[label.len()..].starts_with("-----") {
                    return Some((start, &text[label_start..label_start + label.len()]));
                }
            }
        }
        search_from = after_begin;
    }
    None
}

/// Rewrites a recognized CSR armor to the canonical `CERTIFICATE REQUEST`
/// label with the body re-wrapped at 64 columns.
///
/// The body is delimited by the markers themselves, so CRLF endings and
/// armor pasted onto a single line are both accepted. Returns `None` when
/// the text carries no recognized CSR header.
#[must_use]
pub fn normalize_csr(text: &str) -> Option<String> {
    let (start, label) = find_csr_header(text)?;
    let upper = text.to_ascii_uppercase();
    let label_upper = label.to_ascii_uppercase();

    let header_close = format!("{label_upper}-----");
    let body_start = start + upper[start..].find(&header_close)? + header_close.len();
    let footer = format!("-----END {label_upper}-----");
    let body_end = upper[body_start..]
        .find(&footer)
        .map_or(text.len(), |at| body_start + at);

    let body: String = text[body_start..body_end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let lines: Vec<&str> = body
        .as_bytes()
        .chunks(64)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect();

    Some(format!(
        "-----BEGIN {CSR_LABEL}-----\n{}\n-----END {CSR_LABEL}-----\n",
        lines.join("\n")
    ))
}
