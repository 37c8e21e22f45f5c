//! Provider registration.
//!
//! A [`PhaseProvider`] is configured once per provider block and hands out
//! the `phase_secret` resource and `phase_secrets` data source, both bound
//! to the same API client.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::client::{PhaseClient, SecretsApi};
use crate::config::ProviderConfig;

mod error;
pub mod schema;
mod secret_resource;
mod secrets_data_source;

pub use error::{Diagnostic, ProviderError};
pub use schema::{Attribute, AttributeType, Block, Schema, Sensitive};
pub use secret_resource::{
    plan, PlanAction, SecretOverrideBlock, SecretResource, SecretResourceConfig,
    SecretResourceState, SECRET_RESOURCE,
};
pub use secrets_data_source::{
    SecretsDataSource, SecretsDataSourceConfig, SecretsDataSourceState, SECRETS_DATA_SOURCE,
};

#[derive(Clone)]
pub struct PhaseProvider {
    api: Arc<dyn SecretsApi>,
}

impl PhaseProvider {
    /// Build the HTTP client for one provider block.
    pub fn configure(config: &ProviderConfig) -> Result<Self> {
        let client_config = config.resolve()?;
        tracing::debug!(
            host = %client_config.host,
            token_kind = %client_config.token.kind,
            "Configuring Phase provider"
        );
        let client = PhaseClient::new(client_config).context("Failed to build Phase API client")?;
        Ok(Self::with_api(Arc::new(client)))
    }

    /// Use an already constructed backend, e.g. `MemorySecretsApi` in tests.
    pub fn with_api(api: Arc<dyn SecretsApi>) -> Self {
        Self { api }
    }

    pub fn secret_resource(&self) -> SecretResource {
        SecretResource::new(Arc::clone(&self.api))
    }

    pub fn secrets_data_source(&self) -> SecretsDataSource {
        SecretsDataSource::new(Arc::clone(&self.api))
    }

    /// Schema of the provider block itself.
    pub fn schema() -> Schema {
        Schema::new(vec![
            Attribute::optional("host", AttributeType::String).describe(
                "The host URL for the Phase API. Defaults to https://api.phase.dev or PHASE_HOST.",
            ),
            Attribute::optional("phase_token", AttributeType::String)
                .sensitive()
                .describe(
                    "The Phase service token or personal access token. May also be set with \
                     PHASE_TOKEN, PHASE_SERVICE_TOKEN or PHASE_PAT_TOKEN.",
                ),
            Attribute::optional("skip_tls_verification", AttributeType::Bool)
                .default_value(false)
                .describe("Skip TLS certificate verification for the Phase API host."),
        ])
    }

    pub fn resource_schemas() -> BTreeMap<&'static str, Schema> {
        BTreeMap::from([(SECRET_RESOURCE, SecretResource::schema())])
    }

    pub fn data_source_schemas() -> BTreeMap<&'static str, Schema> {
        BTreeMap::from([(SECRETS_DATA_SOURCE, SecretsDataSource::schema())])
    }
}
