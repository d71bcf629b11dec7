//! Vault wire types and KV v2 payload narrowing.
//!
//! Only the two response shapes the launcher consumes are modelled:
//! `{ auth: { client_token } }` for login and `{ data: { data: {..} } }` for
//! a KV v2 read. Everything else in those payloads is ignored.

use crate::error::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Secret fields ready to be exported as environment variables.
pub type SecretMap = HashMap<String, String>;

/// Body of `POST /v1/auth/kubernetes/login`.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub jwt: &'a str,
    pub role: &'a str,
}

/// Vault auth response
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub auth: LoginAuth,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginAuth {
    pub client_token: String,
}

/// Vault KV v2 response wrapper
#[derive(Debug, Deserialize)]
struct KvResponse {
    data: KvData,
}

#[derive(Debug, Deserialize)]
struct KvData {
    data: serde_json::Map<String, serde_json::Value>,
}

/// The `errors` array Vault attaches to failed requests.
///
/// Unparseable bodies yield an empty list rather than an error; the caller
/// is already on a failure path and only wants something to show.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StoreErrors {
    #[serde(default)]
    pub errors: Vec<String>,
}

impl StoreErrors {
    pub fn from_value(value: &serde_json::Value) -> Vec<String> {
        Self::deserialize(value).map(|e| e.errors).unwrap_or_default()
    }
}

/// Whether a 404 body still describes a secret.
///
/// Vault answers 404 both for "nothing here" and for a soft-deleted KV v2
/// version, in which case the body carries metadata and `data.data: null`.
pub(crate) fn has_data_or_warnings(value: &serde_json::Value) -> bool {
    let non_empty = |key: &str| match value.get(key) {
        Some(serde_json::Value::Object(map)) => !map.is_empty(),
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        _ => false,
    };
    non_empty("data") || non_empty("warnings")
}

/// Flatten a KV v2 read response into a string map.
///
/// Only string values under `data.data` are kept; numbers, booleans, nulls,
/// arrays and nested objects are dropped. `path` is used for error messages.
///
/// # Errors
///
/// Returns [`VaultError::SecretShapeInvalid`] if `data.data` is absent, null
/// or not an object.
pub fn flatten_kv_payload(path: &str, payload: serde_json::Value) -> VaultResult<SecretMap> {
    let response: KvResponse = serde_json::from_value(payload)
        .map_err(|_| VaultError::SecretShapeInvalid(path.to_string()))?;

    Ok(response
        .data
        .data
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            _ => None,
        })
        .collect())
}
