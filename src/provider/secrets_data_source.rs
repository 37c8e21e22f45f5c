//! The `phase_secrets` data source.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::client::SecretsApi;
use crate::models::ROOT_PATH;

use super::schema::{Attribute, AttributeType, Schema, Sensitive};
use super::ProviderError;

pub const SECRETS_DATA_SOURCE: &str = "phase_secrets";

/// Data source arguments.
///
/// An empty `path` disables path filtering; any other path keeps only
/// secrets stored at exactly that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretsDataSourceConfig {
    pub app_id: String,
    pub env: String,
    pub path: String,
    pub key: String,
    pub tags: Vec<String>,
}

impl SecretsDataSourceConfig {
    pub fn new(app_id: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            env: env.into(),
            path: ROOT_PATH.to_string(),
            key: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Stable identifier derived from the query arguments alone.
    ///
    /// Empty tags are dropped, as they are from the request query.
    pub fn synthetic_id(&self) -> String {
        let tags: Vec<&str> = self
            .tags
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .collect();
        format!(
            "{}-{}-{}-{}-{}",
            self.app_id,
            self.env,
            self.path,
            self.key,
            tags.join(",")
        )
    }

    fn matches_path(&self, path: &str) -> bool {
        self.path.is_empty() || self.path == path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretsDataSourceState {
    pub id: String,
    pub path: String,
    /// Secret key to effective value.
    pub secrets: BTreeMap<String, Sensitive>,
}

/// Key, path and effective value pulled from one raw API entry.
struct Entry<'a> {
    key: &'a str,
    path: &'a str,
    value: &'a str,
}

/// Extract an entry, or `None` if the fields have unexpected types.
fn extract_entry(raw: &Value) -> Option<Entry<'_>> {
    let key = raw.get("key")?.as_str()?;
    let path = raw
        .get("path")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .unwrap_or(ROOT_PATH);

    let active_override = raw
        .get("override")
        .filter(|o| o.get("is_active").and_then(Value::as_bool) == Some(true));
    let value = match active_override {
        Some(o) => o.get("value")?.as_str()?,
        None => raw.get("value")?.as_str()?,
    };

    Some(Entry { key, path, value })
}

/// The `phase_secrets` data source bound to a configured API client.
#[derive(Clone)]
pub struct SecretsDataSource {
    api: Arc<dyn SecretsApi>,
}

impl SecretsDataSource {
    pub fn new(api: Arc<dyn SecretsApi>) -> Self {
        Self { api }
    }

    pub fn schema() -> Schema {
        Schema::new(vec![
            Attribute::computed("id", AttributeType::String),
            Attribute::required("app_id", AttributeType::String)
                .describe("The ID of the Phase App."),
            Attribute::required("env", AttributeType::String).describe("The environment name."),
            Attribute::optional("path", AttributeType::String)
                .default_value(ROOT_PATH)
                .describe("The path to fetch secrets from. An empty path matches every path."),
            Attribute::optional("key", AttributeType::String)
                .describe("The key of a specific secret to fetch."),
            Attribute::optional("tags", AttributeType::ListOfString).describe(
                "List of tags to filter secrets by. Multiple tags are combined with OR logic.",
            ),
            Attribute::computed("secrets", AttributeType::MapOfString).sensitive(),
        ])
    }

    pub async fn read(
        &self,
        config: &SecretsDataSourceConfig,
    ) -> Result<SecretsDataSourceState, ProviderError> {
        let raw = self
            .api
            .read_secrets_raw(&config.app_id, &config.env, &config.key, &config.tags)
            .await?;

        let mut secrets = BTreeMap::new();
        for (index, item) in raw.iter().enumerate() {
            let Some(entry) = extract_entry(item) else {
                tracing::warn!(index, "Skipping secret with unexpected field types");
                continue;
            };
            if config.matches_path(entry.path) {
                secrets.insert(entry.key.to_string(), Sensitive::new(entry.value));
            }
        }

        tracing::debug!(
            app_id = %config.app_id,
            env = %config.env,
            returned = raw.len(),
            kept = secrets.len(),
            "Read secrets"
        );

        Ok(SecretsDataSourceState {
            id: config.synthetic_id(),
            path: config.path.clone(),
            secrets,
        })
    }
}
