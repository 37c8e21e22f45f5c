#![allow(dead_code)]

use phase_provider::client::{ClientConfig, PhaseClient};
use phase_provider::config::ProviderConfig;
use phase_provider::provider::PhaseProvider;
use phase_provider::token::resolve_token;
use secrecy::SecretString;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Path of the secrets collection when the host is a self-hosted instance.
pub const SELF_HOSTED_SECRETS_PATH: &str = "/service/public/v1/secrets/";

/// Path of the secrets collection for a client pointed directly at a host.
pub const SECRETS_PATH: &str = "/v1/secrets/";

pub const BEARER_HEX: &str = "1111111111111111111111111111111111111111111111111111111111111111";
const KEY_HEX: &str = "2222222222222222222222222222222222222222222222222222222222222222";

pub fn service_token(version: u32) -> String {
    format!("pss_service:v{version}:{BEARER_HEX}:{KEY_HEX}:{KEY_HEX}")
}

pub fn user_token() -> String {
    format!("pss_user:v1:{BEARER_HEX}:{KEY_HEX}:{KEY_HEX}")
}

/// A client that talks to `server` without the self-hosted suffix.
pub fn client_for(server: &MockServer, raw_token: &str) -> anyhow::Result<PhaseClient> {
    Ok(PhaseClient::new(ClientConfig {
        host: server.uri(),
        token: resolve_token(raw_token),
        skip_tls_verification: false,
    })?)
}

/// A provider configured the way a provider block pointing at `server` would be.
pub fn provider_for(server: &MockServer) -> anyhow::Result<PhaseProvider> {
    let config = ProviderConfig {
        host: Some(server.uri()),
        phase_token: Some(SecretString::from(service_token(2))),
        skip_tls_verification: false,
    };
    PhaseProvider::configure(&config)
}

/// A secret as the API returns it.
pub fn secret_json(id: &str, key: &str, value: &str, path: &str, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "key": key,
        "value": value,
        "comment": "",
        "path": path,
        "tags": tags,
        "version": 1,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z",
        "override": null
    })
}

pub fn with_override(mut secret: Value, value: &str, is_active: bool) -> Value {
    secret["override"] = json!({ "value": value, "is_active": is_active });
    secret
}

pub fn with_version(mut secret: Value, version: i64) -> Value {
    secret["version"] = json!(version);
    secret
}

pub fn body(secrets: &[Value]) -> String {
    Value::Array(secrets.to_vec()).to_string()
}
