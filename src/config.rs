// vaultkenv Configuration Module
//
// Resolved once at startup from flags and their environment fallbacks, then
// passed by reference into the session and the launcher.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Address used when neither `--address` nor `VAULT_ADDR` is set.
pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";

/// How to reach the Vault server.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base address, e.g. `https://vault.vault.svc:8200`
    pub address: String,

    /// Vault Enterprise namespace sent as `X-Vault-Namespace`
    pub namespace: Option<String>,

    /// PEM bundle of extra CA certificates to trust
    pub ca_cert: Option<PathBuf>,

    /// Disable TLS certificate verification
    pub skip_verify: bool,
}

impl StoreConfig {
    /// Plain configuration for `address` with default TLS settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            namespace: None,
            ca_cert: None,
            skip_verify: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_VAULT_ADDR)
    }
}

/// Everything one launch needs.
#[derive(Debug)]
pub struct Config {
    /// Vault connection settings
    pub store: StoreConfig,

    /// Kubernetes auth role to log in as
    pub role: String,

    /// KV v2 path to read, e.g. `kv/data/my-app`
    pub secret_path: String,

    /// Pre-issued token; when set, Kubernetes login is skipped
    pub token: Option<SecretString>,

    /// Command vector to execute with the injected environment
    pub command: Vec<String>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let address = self.store.address.trim();
        if address.is_empty() {
            anyhow::bail!("Vault address cannot be empty");
        }

        let url = reqwest::Url::parse(address)
            .with_context(|| format!("Invalid Vault address: '{}'", address))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Unsupported Vault address scheme: '{}'. Use http or https.",
                url.scheme()
            );
        }

        if self.secret_path.trim_matches('/').is_empty() {
            anyhow::bail!("Secret path cannot be empty (set --secret or VAULT_SECRET)");
        }

        match self.command.first() {
            None => anyhow::bail!("A command to run is required"),
            Some(program) if program.is_empty() => anyhow::bail!("Command cannot be empty"),
            Some(_) => {}
        }

        Ok(())
    }
}
