//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use certrix_pki::config::{
    ENV_CA_CERT_PEM, ENV_CA_COMMON_NAME, ENV_CA_COUNTRY, ENV_CA_KEY_PEM, ENV_CA_ORGANIZATION,
};
use certrix_pki::{CaConfig, NumericInput};

/// Certrix - issue and renew certificates from a self-managed CA.
#[derive(Parser, Debug, Clone)]
#[command(name = "certrix")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// CA settings.
    #[command(flatten)]
    pub ca: CaArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[derive(Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Where the CA comes from.
///
/// Supplying both PEM values makes the CA persistent; otherwise a fresh CA
/// is generated for this invocation.
#[derive(Args, Debug, Clone, Default)]
pub struct CaArgs {
    /// CA private key (PEM contents).
    #[arg(long, global = true, env = "CERTRIX_CA_KEY_PEM", hide_env_values = true)]
    pub ca_key_pem: Option<String>,

    /// CA certificate (PEM contents).
    #[arg(long, global = true, env = "CERTRIX_CA_CERT_PEM", hide_env_values = true)]
    pub ca_cert_pem: Option<String>,

    /// Common name of a generated CA.
    #[arg(long, global = true, env = "CERTRIX_CA_COMMON_NAME")]
    pub ca_common_name: Option<String>,

    /// Organization of a generated CA.
    #[arg(long, global = true, env = "CERTRIX_CA_ORGANIZATION")]
    pub ca_organization: Option<String>,

    /// Country of a generated CA.
    #[arg(long, global = true, env = "CERTRIX_CA_COUNTRY")]
    pub ca_country: Option<String>,
}

impl CaArgs {
    /// Builds the library configuration. Blank values count as absent.
    #[must_use]
    pub fn to_config(&self) -> CaConfig {
        CaConfig::from_lookup(|name| {
            let value = match name {
                ENV_CA_KEY_PEM => &self.ca_key_pem,
                ENV_CA_CERT_PEM => &self.ca_cert_pem,
                ENV_CA_COMMON_NAME => &self.ca_common_name,
                ENV_CA_ORGANIZATION => &self.ca_organization,
                ENV_CA_COUNTRY => &self.ca_country,
                _ => return None,
            };
            value.clone()
        })
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate a key, CSR, certificate and PKCS#12 bundle.
    Generate(GenerateArgs),

    /// Sign a single CSR.
    Renew(RenewArgs),

    /// Sign every CSR inside a ZIP archive.
    RenewBulk(RenewBulkArgs),

    /// Show the subject of a CSR.
    Preview(PreviewArgs),
}

/// Arguments for the generate command.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Common name.
    #[arg(long)]
    pub cn: String,

    /// Two-letter country code.
    #[arg(long)]
    pub country: Option<String>,

    /// State or province.
    #[arg(long)]
    pub state: Option<String>,

    /// Locality.
    #[arg(long)]
    pub locality: Option<String>,

    /// Organization.
    #[arg(long)]
    pub org: Option<String>,

    /// Organizational unit.
    #[arg(long)]
    pub ou: Option<String>,

    /// Validity in years (1-50).
    #[arg(short, long)]
    pub years: Option<String>,

    /// RSA key size: 2048, 3072 or 4096.
    #[arg(short, long)]
    pub key_size: Option<String>,

    /// Password encrypting the private key PEM.
    #[arg(long, env = "CERTRIX_KEY_PASS", hide_env_values = true)]
    pub key_pass: Option<String>,

    /// Password of the PKCS#12 container.
    #[arg(long, env = "CERTRIX_PFX_PASS", hide_env_values = true)]
    pub pfx_pass: Option<String>,

    /// Directory the bundle is written to.
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,
}

/// Arguments for the renew command.
#[derive(Args, Debug, Clone)]
pub struct RenewArgs {
    /// CSR file, or `-` for stdin.
    pub input: String,

    /// Treat the input as base64 text.
    #[arg(long)]
    pub base64: bool,

    /// Validity in years (1-50).
    #[arg(short, long)]
    pub years: Option<String>,

    /// Name used when the CSR has no common name. Defaults to the input file name.
    #[arg(long)]
    pub name: Option<String>,

    /// Directory the certificate is written to.
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,
}

/// Arguments for the renew-bulk command.
#[derive(Args, Debug, Clone)]
pub struct RenewBulkArgs {
    /// ZIP archive, or `-` for stdin.
    pub input: String,

    /// Treat the input as base64 text.
    #[arg(long)]
    pub base64: bool,

    /// Validity in years (1-50), shared by the whole batch.
    #[arg(short, long)]
    pub years: Option<String>,

    /// Concurrent signing workers. Defaults to the available parallelism.
    #[arg(short, long, env = "CERTRIX_WORKERS")]
    pub workers: Option<usize>,

    /// Directory the output archive is written to.
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,
}

/// Arguments for the preview command.
#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// CSR file, or `-` for stdin.
    pub input: String,

    /// Treat the input as base64 text.
    #[arg(long)]
    pub base64: bool,
}

/// Converts a raw years/key-size argument into a lenient numeric input.
#[must_use]
pub fn numeric(value: Option<&str>) -> Option<NumericInput> {
    value.map(NumericInput::from)
}
