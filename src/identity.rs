//! Kubernetes service-account token loading.
//!
//! The token is the workload's identity credential. It is read verbatim and
//! kept behind [`SecretString`] so it never shows up in `Debug` output or logs.

use crate::error::{VaultError, VaultResult};
use secrecy::SecretString;
use std::path::Path;

/// Where the kubelet mounts the projected service-account token.
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Read the identity token at `path`.
///
/// The contents are returned as-is, without trimming.
///
/// # Errors
///
/// Returns [`VaultError::CredentialUnavailable`] if the file is missing,
/// unreadable or not valid UTF-8, which usually means the process is not
/// running inside a pod.
pub fn read_identity_token(path: impl AsRef<Path>) -> VaultResult<SecretString> {
    let path = path.as_ref();
    let token = std::fs::read_to_string(path).map_err(|source| VaultError::CredentialUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(SecretString::from(token))
}
