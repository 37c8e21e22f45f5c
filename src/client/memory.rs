// src/client/memory.rs
//! In-memory secrets backend for testing.
//!
//! Mirrors the API behavior the provider relies on: 409 on a duplicate
//! `(path, key)` within an app/env, server-assigned ids, a version bump on
//! every update and `NotFound` for an empty read.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Secret, SecretOverride};

use super::{ClientError, Operation, SecretsApi};

type Scope = (String, String);

/// In-memory stand-in for the Phase secrets API.
pub struct MemorySecretsApi {
    secrets: Mutex<HashMap<Scope, Vec<Secret>>>,
    calls: Mutex<Vec<Operation>>,
}

impl MemorySecretsApi {
    pub fn new() -> Self {
        Self {
            secrets: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Store a secret directly, as if created out of band. Returns its id.
    pub async fn insert(&self, app_id: &str, env: &str, mut secret: Secret) -> String {
        let id = secret
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        secret.id = Some(id.clone());
        secret.version = secret.version.max(1);

        let mut secrets = self.secrets.lock().await;
        secrets
            .entry(scope(app_id, env))
            .or_default()
            .push(secret);
        id
    }

    /// Replace the override on a stored secret, as the console would.
    ///
    /// Returns false if no secret with `key` exists in scope.
    pub async fn set_override(
        &self,
        app_id: &str,
        env: &str,
        key: &str,
        value_override: Option<SecretOverride>,
    ) -> bool {
        let mut secrets = self.secrets.lock().await;
        let Some(stored) = secrets
            .get_mut(&scope(app_id, env))
            .and_then(|list| list.iter_mut().find(|s| s.key == key))
        else {
            return false;
        };
        stored.override_ = value_override;
        true
    }

    /// All secrets currently stored in `(app_id, env)`.
    pub async fn snapshot(&self, app_id: &str, env: &str) -> Vec<Secret> {
        let secrets = self.secrets.lock().await;
        secrets
            .get(&scope(app_id, env))
            .cloned()
            .unwrap_or_default()
    }

    /// Operations issued through [`SecretsApi`], in call order.
    pub async fn calls(&self) -> Vec<Operation> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, operation: Operation) {
        self.calls.lock().await.push(operation);
    }
}

impl Default for MemorySecretsApi {
    fn default() -> Self {
        Self::new()
    }
}

fn scope(app_id: &str, env: &str) -> Scope {
    (app_id.to_string(), env.to_string())
}

fn rejected(operation: Operation, status: StatusCode, message: &str) -> ClientError {
    ClientError::Api {
        operation,
        status,
        body: serde_json::json!({ "error": message }).to_string(),
    }
}

fn is_duplicate(existing: &Secret, candidate: &Secret) -> bool {
    existing.key == candidate.key
        && existing.path == candidate.path
        && existing.id != candidate.id
}

#[async_trait]
impl SecretsApi for MemorySecretsApi {
    async fn create_secret(
        &self,
        app_id: &str,
        env: &str,
        secret: &Secret,
    ) -> Result<Secret, ClientError> {
        self.record(Operation::Create).await;

        let mut secrets = self.secrets.lock().await;
        let list = secrets.entry(scope(app_id, env)).or_default();

        let mut created = secret.clone();
        created.id = Some(Uuid::new_v4().to_string());
        if list.iter().any(|s| is_duplicate(s, &created)) {
            return Err(rejected(
                Operation::Create,
                StatusCode::CONFLICT,
                "A secret with this key already exists at this path",
            ));
        }

        created.version = 1;
        list.push(created.clone());
        Ok(created)
    }

    async fn read_secrets(
        &self,
        app_id: &str,
        env: &str,
        key: &str,
        tags: &[String],
    ) -> Result<Vec<Secret>, ClientError> {
        self.record(Operation::Read).await;

        let tags: Vec<String> = tags.iter().filter(|t| !t.is_empty()).cloned().collect();
        let secrets = self.secrets.lock().await;
        let matched: Vec<Secret> = secrets
            .get(&scope(app_id, env))
            .into_iter()
            .flatten()
            .filter(|s| key.is_empty() || s.key == key)
            .filter(|s| tags.is_empty() || s.has_any_tag(&tags))
            .cloned()
            .collect();

        if matched.is_empty() {
            return Err(ClientError::NotFound);
        }
        Ok(matched)
    }

    async fn read_secrets_raw(
        &self,
        app_id: &str,
        env: &str,
        key: &str,
        tags: &[String],
    ) -> Result<Vec<Value>, ClientError> {
        self.read_secrets(app_id, env, key, tags)
            .await?
            .iter()
            .map(|s| serde_json::to_value(s).map_err(ClientError::Decode))
            .collect()
    }

    async fn update_secret(
        &self,
        app_id: &str,
        env: &str,
        secret: &Secret,
    ) -> Result<Secret, ClientError> {
        self.record(Operation::Update).await;

        let mut secrets = self.secrets.lock().await;
        let list = secrets.entry(scope(app_id, env)).or_default();

        if list.iter().any(|s| is_duplicate(s, secret)) {
            return Err(rejected(
                Operation::Update,
                StatusCode::CONFLICT,
                "A secret with this key already exists at this path",
            ));
        }

        let Some(stored) = list
            .iter_mut()
            .find(|s| s.id.is_some() && s.id == secret.id)
        else {
            return Err(rejected(
                Operation::Update,
                StatusCode::NOT_FOUND,
                "Secret not found",
            ));
        };

        stored.key = secret.key.clone();
        stored.value = secret.value.clone();
        stored.comment = secret.comment.clone();
        stored.path = secret.path.clone();
        stored.tags = secret.tags.clone();
        stored.override_ = secret.override_.clone();
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete_secret(&self, app_id: &str, env: &str, id: &str) -> Result<(), ClientError> {
        self.record(Operation::Delete).await;

        let mut secrets = self.secrets.lock().await;
        let list = secrets.entry(scope(app_id, env)).or_default();
        let before = list.len();
        list.retain(|s| s.id.as_deref() != Some(id));

        if list.len() == before {
            return Err(rejected(
                Operation::Delete,
                StatusCode::NOT_FOUND,
                "Secret not found",
            ));
        }
        Ok(())
    }
}
