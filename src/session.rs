//! Vault session: Kubernetes login and KV v2 reads.
//!
//! A [`Session`] starts unauthenticated. It becomes authenticated once, either
//! through [`Session::authenticate`] (service-account token exchanged for a
//! Vault token) or [`Session::set_token`] (pre-issued token), and is then
//! used for a single [`Session::read_secret`] before the process execs.
//!
//! # Security
//!
//! - The identity token and the session token are held as [`SecretString`]
//!   and are never logged
//! - The token header is marked sensitive so it is redacted from `Debug`
//!   output of the request
//! - Secret values never reach the logs; only the path and field names do
//!
//! # Example
//!
//! ```no_run
//! use vaultkenv::config::StoreConfig;
//! use vaultkenv::session::Session;
//!
//! # async fn run() -> vaultkenv::error::VaultResult<()> {
//! let mut session = Session::new(&StoreConfig::new("https://vault.vault.svc:8200"))?;
//! let secrets = session
//!     .authenticate("my-webapp")
//!     .await?
//!     .read_secret("kv/data/my-webapp")
//!     .await?;
//! println!("fetched {} variable(s)", secrets.len());
//! # Ok(())
//! # }
//! ```

use crate::config::StoreConfig;
use crate::error::{VaultError, VaultResult};
use crate::identity::{read_identity_token, SERVICE_ACCOUNT_TOKEN_PATH};
use crate::secrets::{
    flatten_kv_payload, has_data_or_warnings, LoginRequest, LoginResponse, SecretMap, StoreErrors,
};
use reqwest::header::HeaderValue;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
const REQUEST_HEADER: &str = "X-Vault-Request";
const KUBERNETES_LOGIN_PATH: &str = "auth/kubernetes/login";

/// Authenticated (or about to be) connection to one Vault server.
pub struct Session {
    address: String,
    namespace: Option<String>,
    http: Client,
    token_path: PathBuf,
    token: Option<SecretString>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("token_path", &self.token_path)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl Session {
    /// Create an unauthenticated session for the given server.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if the CA bundle cannot be loaded
    /// or the HTTP client cannot be built.
    pub fn new(store: &StoreConfig) -> VaultResult<Self> {
        let mut builder = Client::builder();

        if let Some(ca_cert) = &store.ca_cert {
            let pem = std::fs::read(ca_cert).map_err(|e| {
                VaultError::InvalidConfig(format!(
                    "cannot read CA certificate {}: {e}",
                    ca_cert.display()
                ))
            })?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                VaultError::InvalidConfig(format!(
                    "cannot parse CA certificate {}: {e}",
                    ca_cert.display()
                ))
            })?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        if store.skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| VaultError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            address: store.address.trim_end_matches('/').to_string(),
            namespace: store.namespace.clone().filter(|ns| !ns.is_empty()),
            http,
            token_path: PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH),
            token: None,
        })
    }

    /// Read the identity token from `path` instead of the in-cluster mount.
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Server address without a trailing slash.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Identity token location used by [`Session::authenticate`].
    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Whether a session token has been obtained or supplied.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Use a pre-issued Vault token, skipping Kubernetes login entirely.
    pub fn set_token(&mut self, token: SecretString) -> &mut Self {
        self.token = Some(token);
        self
    }

    /// Exchange the service-account token for a Vault token.
    ///
    /// The identity token is read before any request is made, so a missing
    /// token file fails without touching the network. On failure the session
    /// stays unauthenticated.
    ///
    /// # Errors
    ///
    /// - [`VaultError::CredentialUnavailable`] if the token file cannot be read
    /// - [`VaultError::TransportFailure`] if the login request fails
    /// - [`VaultError::ResponseDecodeFailure`] if the body is not JSON
    /// - [`VaultError::AuthFieldMissing`] if the body has no `auth.client_token`
    #[instrument(skip(self), fields(address = %self.address))]
    pub async fn authenticate(&mut self, role: &str) -> VaultResult<&mut Self> {
        let jwt = read_identity_token(&self.token_path)?;

        let body = LoginRequest {
            jwt: jwt.expose_secret(),
            role,
        };

        let response = self
            .request(Method::POST, KUBERNETES_LOGIN_PATH)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let payload: serde_json::Value = serde_json::from_slice(&bytes)?;

        let login = LoginResponse::deserialize(&payload).map_err(|_| VaultError::AuthFieldMissing {
            status: status.as_u16(),
            errors: StoreErrors::from_value(&payload),
        })?;

        self.token = Some(SecretString::from(login.auth.client_token));
        debug!(role, "Logged in to Vault via Kubernetes auth");

        Ok(self)
    }

    /// Read a KV v2 secret and keep its string fields.
    ///
    /// The request is sent with whatever token the session holds; an
    /// unauthenticated session sends none and Vault's answer decides.
    ///
    /// # Errors
    ///
    /// - [`VaultError::TransportFailure`] if the request fails
    /// - [`VaultError::SecretNotFound`] if nothing is stored at `path`
    /// - [`VaultError::ReadFailure`] if Vault rejects the read
    /// - [`VaultError::ResponseDecodeFailure`] if a non-empty body is not JSON,
    ///   including on a 404
    /// - [`VaultError::SecretShapeInvalid`] if `data.data` is not an object
    #[instrument(skip(self), fields(address = %self.address))]
    pub async fn read_secret(&self, path: &str) -> VaultResult<SecretMap> {
        let path = path.trim_start_matches('/');

        let mut request = self.request(Method::GET, path);
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(token.expose_secret()).map_err(|_| {
                VaultError::InvalidConfig(
                    "Vault token contains characters not allowed in an HTTP header".to_string(),
                )
            })?;
            value.set_sensitive(true);
            request = request.header(TOKEN_HEADER, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            if is_blank(&bytes) {
                return Err(VaultError::SecretNotFound(path.to_string()));
            }
            // A body that is not JSON here usually means the address points at a proxy
            let payload: serde_json::Value = serde_json::from_slice(&bytes)?;
            if has_data_or_warnings(&payload) {
                return flatten_kv_payload(path, payload);
            }
            return Err(VaultError::SecretNotFound(path.to_string()));
        }

        if !status.is_success() {
            let errors = serde_json::from_slice::<serde_json::Value>(&bytes)
                .map(|payload| StoreErrors::from_value(&payload))
                .unwrap_or_default();
            return Err(VaultError::ReadFailure {
                path: path.to_string(),
                status: status.as_u16(),
                errors,
            });
        }

        if is_blank(&bytes) {
            return Err(VaultError::SecretNotFound(path.to_string()));
        }

        let payload: serde_json::Value = serde_json::from_slice(&bytes)?;
        let secrets = flatten_kv_payload(path, payload)?;

        debug!(path, fields = secrets.len(), "Read secret from Vault");
        Ok(secrets)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.address, path);
        let mut request = self.http.request(method, url).header(REQUEST_HEADER, "true");
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }
        request
    }
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}
