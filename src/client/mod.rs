//! Phase secrets REST client.
//!
//! All operations target the single `/v1/secrets/` collection, scoped by
//! `app_id` and `env` query parameters. Mutations send one secret per call
//! wrapped in a `{"secrets": [...]}` envelope, and every successful response
//! is a JSON array of secrets.

mod error;
mod memory;
mod user_agent;

pub use error::{ClientError, Operation};
pub use memory::MemorySecretsApi;
pub use user_agent::{user_agent, PROVIDER_VERSION, SDK_VERSION};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::{json, Value};

use crate::models::Secret;
use crate::token::ResolvedToken;

/// Phase cloud API base URL.
pub const DEFAULT_HOST: &str = "https://api.phase.dev";

/// Immutable settings for one configured provider instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, already including any self-hosted path suffix.
    pub host: String,
    pub token: ResolvedToken,
    /// Disables certificate validation for every request this client sends.
    pub skip_tls_verification: bool,
}

/// The secrets operations the resource and data source are built on.
#[async_trait]
pub trait SecretsApi: Send + Sync {
    async fn create_secret(
        &self,
        app_id: &str,
        env: &str,
        secret: &Secret,
    ) -> Result<Secret, ClientError>;

    /// Secrets in `(app_id, env)`, narrowed to `key` when non-empty and to
    /// secrets carrying any of `tags` when non-empty.
    ///
    /// Returns `ClientError::NotFound` when nothing matches.
    async fn read_secrets(
        &self,
        app_id: &str,
        env: &str,
        key: &str,
        tags: &[String],
    ) -> Result<Vec<Secret>, ClientError>;

    /// Same query as [`SecretsApi::read_secrets`], with entries left as raw JSON.
    async fn read_secrets_raw(
        &self,
        app_id: &str,
        env: &str,
        key: &str,
        tags: &[String],
    ) -> Result<Vec<Value>, ClientError>;

    async fn update_secret(
        &self,
        app_id: &str,
        env: &str,
        secret: &Secret,
    ) -> Result<Secret, ClientError>;

    async fn delete_secret(&self, app_id: &str, env: &str, id: &str) -> Result<(), ClientError>;
}

/// Phase API client over HTTP.
#[derive(Debug, Clone)]
pub struct PhaseClient {
    http: Client,
    secrets_url: String,
    token: ResolvedToken,
}

impl PhaseClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder().user_agent(user_agent());
        if config.skip_tls_verification {
            tracing::warn!(host = %config.host, "TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().map_err(ClientError::Transport)?;

        Ok(Self {
            http,
            secrets_url: format!("{}/v1/secrets/", config.host.trim_end_matches('/')),
            token: config.token,
        })
    }

    pub fn secrets_url(&self) -> &str {
        &self.secrets_url
    }

    /// Send one request and return the body of a 2xx response.
    async fn send(
        &self,
        operation: Operation,
        method: Method,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<String, ClientError> {
        tracing::debug!(%method, %operation, url = %self.secrets_url, "Phase API request");

        let mut req = self
            .http
            .request(method, &self.secrets_url)
            .query(query)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.token.authorization_header());
        if let Some(body) = body {
            req = req.body(body.to_string());
        }

        let response = req.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(ClientError::Transport)?;

        if !status.is_success() {
            tracing::debug!(%operation, %status, "Phase API request rejected");
            return Err(ClientError::Api {
                operation,
                status,
                body,
            });
        }

        Ok(body)
    }

    /// POST or PUT a single secret and return the echoed secret.
    async fn write(
        &self,
        operation: Operation,
        method: Method,
        app_id: &str,
        env: &str,
        secret: &Secret,
    ) -> Result<Secret, ClientError> {
        let body = self
            .send(
                operation,
                method,
                &[("app_id", app_id), ("env", env)],
                Some(json!({ "secrets": [secret] })),
            )
            .await?;

        if body.trim().is_empty() {
            return Err(ClientError::EmptyResponse { operation });
        }
        let secrets: Vec<Secret> = serde_json::from_str(&body).map_err(ClientError::Decode)?;
        secrets
            .into_iter()
            .next()
            .ok_or(ClientError::EmptyResponse { operation })
    }
}

#[async_trait]
impl SecretsApi for PhaseClient {
    async fn create_secret(
        &self,
        app_id: &str,
        env: &str,
        secret: &Secret,
    ) -> Result<Secret, ClientError> {
        self.write(Operation::Create, Method::POST, app_id, env, secret)
            .await
    }

    async fn read_secrets(
        &self,
        app_id: &str,
        env: &str,
        key: &str,
        tags: &[String],
    ) -> Result<Vec<Secret>, ClientError> {
        self.read_secrets_raw(app_id, env, key, tags)
            .await?
            .into_iter()
            .map(|entry| serde_json::from_value(entry).map_err(ClientError::Decode))
            .collect()
    }

    async fn read_secrets_raw(
        &self,
        app_id: &str,
        env: &str,
        key: &str,
        tags: &[String],
    ) -> Result<Vec<Value>, ClientError> {
        let tags = tags
            .iter()
            .filter(|t| !t.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut query = vec![("app_id", app_id), ("env", env)];
        if !key.is_empty() {
            query.push(("key", key));
        }
        if !tags.is_empty() {
            query.push(("tags", tags.as_str()));
        }

        let body = self
            .send(Operation::Read, Method::GET, &query, None)
            .await?;
        if body.trim().is_empty() {
            return Err(ClientError::NotFound);
        }

        let secrets: Vec<Value> = serde_json::from_str(&body).map_err(ClientError::Decode)?;
        if secrets.is_empty() {
            return Err(ClientError::NotFound);
        }
        Ok(secrets)
    }

    async fn update_secret(
        &self,
        app_id: &str,
        env: &str,
        secret: &Secret,
    ) -> Result<Secret, ClientError> {
        self.write(Operation::Update, Method::PUT, app_id, env, secret)
            .await
    }

    async fn delete_secret(&self, app_id: &str, env: &str, id: &str) -> Result<(), ClientError> {
        self.send(
            Operation::Delete,
            Method::DELETE,
            &[("app_id", app_id), ("env", env)],
            Some(json!({ "secrets": [id] })),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::resolve_token;

    #[test]
    fn test_secrets_url_trims_trailing_slash() {
        let client = PhaseClient::new(ClientConfig {
            host: "https://phase.internal/service/public/".to_string(),
            token: resolve_token("opaque"),
            skip_tls_verification: false,
        })
        .unwrap();
        assert_eq!(
            client.secrets_url(),
            "https://phase.internal/service/public/v1/secrets/"
        );
    }

    #[test]
    fn test_client_builds_with_tls_verification_disabled() {
        let client = PhaseClient::new(ClientConfig {
            host: DEFAULT_HOST.to_string(),
            token: resolve_token("opaque"),
            skip_tls_verification: true,
        });
        assert!(client.is_ok());
    }
}
