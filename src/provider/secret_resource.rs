//! The `phase_secret` managed resource.
//!
//! Secrets are looked up by `(app_id, env, key)` rather than by stored id.
//! Creating a secret whose key already exists in scope converges the
//! existing secret to the declared attributes instead of failing.

use std::sync::Arc;

use serde::Serialize;

use crate::client::{ClientError, SecretsApi};
use crate::models::{Secret, SecretAddress, ROOT_PATH};

use super::schema::{Attribute, AttributeType, Block, Schema, Sensitive};
use super::ProviderError;

pub const SECRET_RESOURCE: &str = "phase_secret";

/// The `override` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretOverrideBlock {
    pub value: Sensitive,
    pub is_active: bool,
}

/// Attributes declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretResourceConfig {
    pub app_id: String,
    pub env: String,
    pub key: String,
    pub value: Sensitive,
    pub comment: Option<String>,
    pub path: String,
    pub tags: Option<Vec<String>>,
    pub override_: Option<SecretOverrideBlock>,
}

impl SecretResourceConfig {
    pub fn new(
        app_id: impl Into<String>,
        env: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Sensitive>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            env: env.into(),
            key: key.into(),
            value: value.into(),
            comment: None,
            path: ROOT_PATH.to_string(),
            tags: None,
            override_: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_override(mut self, value: impl Into<Sensitive>, is_active: bool) -> Self {
        self.override_ = Some(SecretOverrideBlock {
            value: value.into(),
            is_active,
        });
        self
    }

    pub fn address(&self) -> SecretAddress {
        SecretAddress::new(&self.app_id, &self.env, &self.path, &self.key)
    }

    /// Check attribute values before any API call is made.
    pub fn validate(&self) -> Result<(), ProviderError> {
        for (attribute, value) in [("app_id", &self.app_id), ("env", &self.env), ("key", &self.key)] {
            if value.trim().is_empty() {
                return Err(ProviderError::Invalid {
                    attribute,
                    message: "must not be empty".to_string(),
                });
            }
        }
        if !self.path.starts_with('/') {
            return Err(ProviderError::Invalid {
                attribute: "path",
                message: format!("{:?} must start with '/'", self.path),
            });
        }
        Ok(())
    }

    /// The value reads are expected to report once applied.
    fn effective_value(&self) -> &str {
        match &self.override_ {
            Some(o) if o.is_active => o.value.expose(),
            _ => self.value.expose(),
        }
    }

    fn to_secret(&self, id: Option<String>) -> Secret {
        let mut secret = Secret::new(&self.key, self.value.expose())
            .with_path(&self.path)
            .with_comment(self.comment.clone().unwrap_or_default())
            .with_tags(self.tags.clone().unwrap_or_default());
        if let Some(o) = &self.override_ {
            secret = secret.with_override(o.value.expose(), o.is_active);
        }
        secret.id = id;
        secret
    }
}

/// Attributes recorded in state after apply or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretResourceState {
    pub id: String,
    pub app_id: String,
    pub env: String,
    pub key: String,
    /// The effective value: the active override if there is one.
    pub value: Sensitive,
    pub comment: String,
    pub path: String,
    pub tags: Vec<String>,
    pub version: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Populated only while an override is active.
    #[serde(rename = "override")]
    pub override_: Option<SecretOverrideBlock>,
}

impl SecretResourceState {
    pub fn address(&self) -> SecretAddress {
        SecretAddress::new(&self.app_id, &self.env, &self.path, &self.key)
    }

    fn from_secret(app_id: &str, env: &str, secret: Secret) -> Self {
        let override_ = secret.active_override().map(|o| SecretOverrideBlock {
            value: Sensitive::new(o.value.clone()),
            is_active: o.is_active,
        });

        Self {
            id: secret.id.clone().unwrap_or_default(),
            app_id: app_id.to_string(),
            env: env.to_string(),
            value: Sensitive::new(secret.effective_value()),
            key: secret.key,
            comment: secret.comment,
            path: secret.path,
            tags: secret.tags,
            version: secret.version,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
            override_,
        }
    }
}

/// What applying a configuration against prior state would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update,
    /// An immutable identity attribute changed: delete, then create.
    Replace,
    NoOp,
}

/// Diff a configuration against prior state.
pub fn plan(prior: Option<&SecretResourceState>, config: &SecretResourceConfig) -> PlanAction {
    let Some(prior) = prior else {
        return PlanAction::Create;
    };

    if prior.app_id != config.app_id || prior.env != config.env {
        return PlanAction::Replace;
    }

    let expected_override = config.override_.as_ref().filter(|o| o.is_active);
    let unchanged = prior.key == config.key
        && prior.path == config.path
        && prior.value.expose() == config.effective_value()
        && prior.comment == config.comment.as_deref().unwrap_or_default()
        && prior.tags.as_slice() == config.tags.as_deref().unwrap_or_default()
        && prior.override_.as_ref() == expected_override;

    if unchanged {
        PlanAction::NoOp
    } else {
        PlanAction::Update
    }
}

/// Pick the secret a lookup refers to.
///
/// Preference: the known id, then an exact `(key, path)` match, then any
/// secret with the key.
fn select_secret(secrets: Vec<Secret>, address: &SecretAddress, id: Option<&str>) -> Option<Secret> {
    let mut candidates: Vec<Secret> = secrets
        .into_iter()
        .filter(|s| s.key == address.key)
        .collect();

    let position = id
        .and_then(|id| candidates.iter().position(|s| s.id.as_deref() == Some(id)))
        .or_else(|| candidates.iter().position(|s| s.path == address.path))
        .or(if candidates.is_empty() { None } else { Some(0) })?;

    Some(candidates.swap_remove(position))
}

/// The `phase_secret` resource bound to a configured API client.
#[derive(Clone)]
pub struct SecretResource {
    api: Arc<dyn SecretsApi>,
}

impl SecretResource {
    pub fn new(api: Arc<dyn SecretsApi>) -> Self {
        Self { api }
    }

    pub fn schema() -> Schema {
        use AttributeType::*;

        Schema::new(vec![
            Attribute::computed("id", String).describe("Server-assigned secret identifier."),
            Attribute::required("app_id", String)
                .force_new()
                .describe("The ID of the Phase App."),
            Attribute::required("env", String)
                .force_new()
                .describe("The environment name."),
            Attribute::required("key", String).describe("The secret key."),
            Attribute::required("value", String)
                .sensitive()
                .describe("The secret value."),
            Attribute::optional("comment", String).describe("A comment for the secret."),
            Attribute::optional("path", String)
                .default_value(ROOT_PATH)
                .describe("The path of the secret."),
            Attribute::optional("tags", ListOfString).describe("Tags attached to the secret."),
            Attribute::computed("version", Int),
            Attribute::computed("created_at", String),
            Attribute::computed("updated_at", String),
        ])
        .with_block(Block {
            name: "override",
            max_items: Some(1),
            attributes: vec![
                Attribute::required("value", String).sensitive(),
                Attribute::required("is_active", Bool),
            ],
        })
    }

    /// Create the secret, or converge an existing one with the same key.
    pub async fn create(
        &self,
        config: &SecretResourceConfig,
    ) -> Result<SecretResourceState, ProviderError> {
        config.validate()?;
        let secret = config.to_secret(None);

        let id = match self
            .api
            .create_secret(&config.app_id, &config.env, &secret)
            .await
        {
            Ok(created) => created.id,
            Err(err) if err.is_conflict() => Some(self.adopt_existing(config, secret, err).await?),
            Err(err) => return Err(err.into()),
        };

        self.refresh(&config.address(), id.as_deref()).await
    }

    /// Update the pre-existing secret that made a create fail with 409.
    async fn adopt_existing(
        &self,
        config: &SecretResourceConfig,
        mut secret: Secret,
        conflict: ClientError,
    ) -> Result<String, ProviderError> {
        tracing::info!(
            app_id = %config.app_id,
            env = %config.env,
            key = %config.key,
            "Secret already exists; updating it in place"
        );

        let existing = match self
            .api
            .read_secrets(&config.app_id, &config.env, &config.key, &[])
            .await
        {
            Ok(existing) => existing,
            Err(err) if err.is_not_found() => {
                return Err(ProviderError::ConflictUnresolved {
                    key: config.key.clone(),
                    source: conflict,
                })
            }
            Err(err) => {
                return Err(ProviderError::ConflictLookup {
                    key: config.key.clone(),
                    source: err,
                })
            }
        };

        let Some(existing) = select_secret(existing, &config.address(), None) else {
            return Err(ProviderError::ConflictUnresolved {
                key: config.key.clone(),
                source: conflict,
            });
        };

        secret.id = existing.id;
        let updated = self
            .api
            .update_secret(&config.app_id, &config.env, &secret)
            .await
            .map_err(|source| ProviderError::ConflictUpdate {
                key: config.key.clone(),
                source,
            })?;

        Ok(updated.id.or(secret.id).unwrap_or_default())
    }

    /// Refresh state for the secret at `address`.
    pub async fn read(&self, address: &SecretAddress) -> Result<SecretResourceState, ProviderError> {
        self.refresh(address, None).await
    }

    async fn refresh(
        &self,
        address: &SecretAddress,
        id: Option<&str>,
    ) -> Result<SecretResourceState, ProviderError> {
        let not_found = || ProviderError::SecretNotFound {
            app_id: address.app_id.clone(),
            env: address.env.clone(),
            key: address.key.clone(),
        };

        let secrets = match self
            .api
            .read_secrets(&address.app_id, &address.env, &address.key, &[])
            .await
        {
            Ok(secrets) => secrets,
            Err(err) if err.is_not_found() => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };

        let secret = select_secret(secrets, address, id).ok_or_else(not_found)?;
        Ok(SecretResourceState::from_secret(
            &address.app_id,
            &address.env,
            secret,
        ))
    }

    /// Apply configuration changes to an existing secret in place.
    pub async fn update(
        &self,
        prior: &SecretResourceState,
        config: &SecretResourceConfig,
    ) -> Result<SecretResourceState, ProviderError> {
        if prior.app_id != config.app_id {
            return Err(ProviderError::RequiresReplacement { attribute: "app_id" });
        }
        if prior.env != config.env {
            return Err(ProviderError::RequiresReplacement { attribute: "env" });
        }
        config.validate()?;

        let secret = config.to_secret(Some(prior.id.clone()));
        let updated = self
            .api
            .update_secret(&config.app_id, &config.env, &secret)
            .await?;

        let id = updated.id.unwrap_or_else(|| prior.id.clone());
        self.refresh(&config.address(), Some(&id)).await
    }

    pub async fn delete(&self, state: &SecretResourceState) -> Result<(), ProviderError> {
        self.api
            .delete_secret(&state.app_id, &state.env, &state.id)
            .await?;
        Ok(())
    }

    /// Adopt an existing secret from an `{app_id}:{env}:{path}:{key}` id.
    pub async fn import(&self, import_id: &str) -> Result<SecretResourceState, ProviderError> {
        let address = SecretAddress::parse(import_id)?;
        self.read(&address).await
    }

    /// Plan and apply `config` against `prior`, as a host would on `apply`.
    pub async fn apply(
        &self,
        prior: Option<&SecretResourceState>,
        config: &SecretResourceConfig,
    ) -> Result<(PlanAction, SecretResourceState), ProviderError> {
        let action = plan(prior, config);
        let state = match (action, prior) {
            (PlanAction::NoOp, Some(prior)) => prior.clone(),
            (PlanAction::Update, Some(prior)) => self.update(prior, config).await?,
            (PlanAction::Replace, Some(prior)) => {
                self.delete(prior).await?;
                self.create(config).await?
            }
            _ => self.create(config).await?,
        };
        Ok((action, state))
    }
}
