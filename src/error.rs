//! Error taxonomy for the login-and-read sequence and the process launcher.
//!
//! Every variant is fatal: nothing here is retried. The binary maps each
//! variant to a launcher exit code with [`exit_code_for`]. Apart from
//! [`ExecError::Wait`], every code is produced before the child starts.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for bad flags or environment (`EX_USAGE`).
pub const EXIT_USAGE: i32 = 64;
/// Exit code for a store payload that could not be decoded (`EX_DATAERR`).
pub const EXIT_DATA: i32 = 65;
/// Exit code for a secret path with no data behind it (`EX_NOINPUT`).
pub const EXIT_NOT_FOUND: i32 = 66;
/// Exit code for an unreachable store (`EX_UNAVAILABLE`).
pub const EXIT_UNAVAILABLE: i32 = 69;
/// Exit code when the started child can no longer be waited on (`EX_SOFTWARE`).
pub const EXIT_SOFTWARE: i32 = 70;
/// Exit code for credential, login and authorization failures (`EX_NOPERM`).
pub const EXIT_NO_PERMISSION: i32 = 77;
/// Exit code for an unusable client setup, e.g. a bad CA bundle (`EX_CONFIG`).
pub const EXIT_CONFIG: i32 = 78;
/// Exit code when the command exists but cannot be started.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Exit code when the command cannot be found.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Failures while talking to Vault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Identity token file missing or unreadable
    #[error("identity token unavailable at {}: {source}", .path.display())]
    CredentialUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Network, DNS or TLS failure on an HTTP call
    #[error("request to Vault failed: {0}")]
    TransportFailure(#[from] reqwest::Error),

    /// Vault answered with something that is not JSON
    #[error("could not decode Vault response: {0}")]
    ResponseDecodeFailure(#[from] serde_json::Error),

    /// Login response carried no usable `auth.client_token`
    #[error("Vault login returned no client token (status {status}){}", format_store_errors(.errors))]
    AuthFieldMissing { status: u16, errors: Vec<String> },

    /// Authenticated read rejected by Vault
    #[error("reading secret '{path}' failed with status {status}{}", format_store_errors(.errors))]
    ReadFailure {
        path: String,
        status: u16,
        errors: Vec<String>,
    },

    /// Nothing stored at the requested path
    #[error("secret not found at path: {0}")]
    SecretNotFound(String),

    /// Data present but not in the KV v2 `data.data` layout
    #[error("secret at '{0}' is not a versioned key/value secret (missing data.data object)")]
    SecretShapeInvalid(String),

    /// HTTP client could not be configured
    #[error("invalid Vault client configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Launcher exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::SecretNotFound(_) => EXIT_NOT_FOUND,
            Self::TransportFailure(_) => EXIT_UNAVAILABLE,
            Self::ResponseDecodeFailure(_) | Self::SecretShapeInvalid(_) => EXIT_DATA,
            Self::CredentialUnavailable { .. }
            | Self::AuthFieldMissing { .. }
            | Self::ReadFailure { .. } => EXIT_NO_PERMISSION,
            Self::InvalidConfig(_) => EXIT_CONFIG,
        }
    }
}

fn format_store_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        format!(": {}", errors.join("; "))
    }
}

/// Failures while starting the child command.
#[derive(Error, Debug)]
pub enum ExecError {
    /// No command was given
    #[error("no command given")]
    EmptyCommand,

    /// Program not found on PATH
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// Program found but the OS refused to start it
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Child started but its exit status could not be collected
    #[error("lost track of '{program}' after it started: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    /// Launcher exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyCommand => EXIT_USAGE,
            Self::CommandNotFound(_) => EXIT_COMMAND_NOT_FOUND,
            Self::Spawn { .. } => EXIT_CANNOT_EXECUTE,
            Self::Wait { .. } => EXIT_SOFTWARE,
        }
    }
}

/// Map any launcher failure to its exit code.
///
/// Walks the `anyhow` chain so errors wrapped in context still map to their
/// specific code; anything unrecognised is treated as a usage error.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(vault) = cause.downcast_ref::<VaultError>() {
            return vault.exit_code();
        }
        if let Some(exec) = cause.downcast_ref::<ExecError>() {
            return exec.exit_code();
        }
    }
    EXIT_USAGE
}
