//! Common testing utilities for vaultkenv integration tests.

use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Service-account token written by [`TestContext::create_identity_token`].
#[allow(dead_code)]
pub const TEST_JWT: &str = "eyJhbGciOiJSUzI1NiIsImtpZCI6InRlc3QifQ.eyJzdWIiOiJzeXN0ZW06c2VydmljZWFjY291bnQifQ.c2ln";

/// Test context that manages temporary files and directories.
#[allow(dead_code)]
pub struct TestContext {
    /// Path to temporary directory
    pub temp_path: PathBuf,
    /// The temporary directory (kept to prevent early deletion)
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a new test context with a temporary directory.
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let temp_path = temp_dir.path().to_path_buf();

        Ok(Self {
            temp_path,
            _temp_dir: temp_dir,
        })
    }

    /// Write a mock service-account token and return its path.
    pub fn create_identity_token(&self, jwt: &str) -> anyhow::Result<PathBuf> {
        let file_path = self.temp_path.join("token");
        fs::write(&file_path, jwt)?;
        Ok(file_path)
    }

    /// Path of a token file that does not exist.
    pub fn missing_identity_token(&self) -> PathBuf {
        self.temp_path.join("no-such-token")
    }
}

/// Canned Vault responses.
pub struct MockVault;

#[allow(dead_code)]
impl MockVault {
    /// Successful Kubernetes login response.
    pub fn login_response(client_token: &str) -> Value {
        json!({
            "request_id": "9bc4b5c2-1f4a-4b4b-a2c0-1a2b3c4d5e6f",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 0,
            "data": null,
            "auth": {
                "client_token": client_token,
                "accessor": "8609694a-cdbc-db9b-d345-e782dbb562ed",
                "policies": ["default", "my-webapp"],
                "token_policies": ["default", "my-webapp"],
                "metadata": {
                    "role": "my-webapp",
                    "service_account_name": "my-webapp",
                    "service_account_namespace": "default"
                },
                "lease_duration": 3600,
                "renewable": true
            }
        })
    }

    /// KV v2 read response wrapping `fields`.
    pub fn kv_response(fields: Value) -> Value {
        json!({
            "request_id": "c2a5e8d4-0f0e-4f4d-9b8a-7a6b5c4d3e2f",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 0,
            "data": {
                "data": fields,
                "metadata": {
                    "created_time": "2024-01-01T00:00:00.000000Z",
                    "custom_metadata": null,
                    "deletion_time": "",
                    "destroyed": false,
                    "version": 1
                }
            },
            "wrap_info": null,
            "warnings": null,
            "auth": null
        })
    }

    /// Vault error body.
    pub fn errors(messages: &[&str]) -> Value {
        json!({ "errors": messages })
    }

    /// Expect exactly `times` Kubernetes logins for `role` and answer them.
    pub async fn mount_login(server: &MockServer, role: &str, client_token: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/auth/kubernetes/login"))
            .and(header("X-Vault-Request", "true"))
            .and(body_json(json!({ "jwt": TEST_JWT, "role": role })))
            .respond_with(ResponseTemplate::new(200).set_body_json(Self::login_response(client_token)))
            .expect(times)
            .mount(server)
            .await;
    }

    /// Serve `fields` at `secret_path` to requests carrying `token`.
    pub async fn mount_secret(server: &MockServer, secret_path: &str, token: &str, fields: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/{}", secret_path)))
            .and(header("X-Vault-Token", token))
            .respond_with(ResponseTemplate::new(200).set_body_json(Self::kv_response(fields)))
            .mount(server)
            .await;
    }
}
