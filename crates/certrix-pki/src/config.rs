//! CA configuration.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Environment variable holding the CA private key PEM.
pub const ENV_CA_KEY_PEM: &str = "CERTRIX_CA_KEY_PEM";
/// Environment variable holding the CA certificate PEM.
pub const ENV_CA_CERT_PEM: &str = "CERTRIX_CA_CERT_PEM";
/// Environment variable overriding the ephemeral CA common name.
pub const ENV_CA_COMMON_NAME: &str = "CERTRIX_CA_COMMON_NAME";
/// Environment variable overriding the ephemeral CA organization.
pub const ENV_CA_ORGANIZATION: &str = "CERTRIX_CA_ORGANIZATION";
/// Environment variable overriding the ephemeral CA country.
pub const ENV_CA_COUNTRY: &str = "CERTRIX_CA_COUNTRY";

/// Subject of a generated CA certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaIdentity {
    /// CA common name.
    pub common_name: String,
    /// CA organization.
    pub organization: String,
    /// Two-letter country code.
    pub country: String,
}

impl Default for CaIdentity {
    fn default() -> Self {
        Self {
            common_name: "Certrix Certifying Authority".to_string(),
            organization: "Certrix".to_string(),
            country: "IN".to_string(),
        }
    }
}

/// Where the CA comes from.
///
/// When both PEM values are present the CA is loaded from them; otherwise an
/// ephemeral CA with [`CaIdentity`] as its subject is generated per process.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaConfig {
    /// CA private key, PKCS#8 or PKCS#1 PEM.
    #[serde(skip_serializing)]
    pub key_pem: Option<String>,
    /// CA certificate PEM.
    pub cert_pem: Option<String>,
    /// Subject used for an ephemeral CA.
    pub identity: CaIdentity,
}

impl CaConfig {
    /// Reads the configuration from `CERTRIX_CA_*` environment variables.
    ///
    /// Unset or blank variables are treated as absent.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut identity = CaIdentity::default();
        if let Some(cn) = get(ENV_CA_COMMON_NAME) {
            identity.common_name = cn;
        }
        if let Some(org) = get(ENV_CA_ORGANIZATION) {
            identity.organization = org;
        }
        if let Some(country) = get(ENV_CA_COUNTRY) {
            identity.country = country;
        }

        Self {
            key_pem: get(ENV_CA_KEY_PEM),
            cert_pem: get(ENV_CA_CERT_PEM),
            identity,
        }
    }

    /// Returns the supplied PEM pair when both halves are present.
    #[must_use]
    pub fn pem_pair(&self) -> Option<(Zeroizing<String>, &str)> {
        match (&self.key_pem, &self.cert_pem) {
            (Some(key), Some(cert)) => Some((Zeroizing::new(key.clone()), cert.as_str())),
            _ => None,
        }
    }

    /// Returns true when exactly one half of the PEM pair is present.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.key_pem.is_some() != self.cert_pem.is_some()
    }
}

impl std::fmt::Debug for CaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaConfig")
            .field("key_pem", &self.key_pem.as_ref().map(|_| "[REDACTED]"))
            .field("cert_pem", &self.cert_pem.is_some())
            .field("identity", &self.identity)
            .finish()
    }
}
