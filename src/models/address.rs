use std::fmt;
use std::str::FromStr;

use super::secret::ROOT_PATH;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid import id {value:?}: expected {{app_id}}:{{env}}:{{path}}:{{key}} ({reason})")]
pub struct ImportIdError {
    value: String,
    reason: &'static str,
}

/// Where a secret lives from the caller's point of view.
///
/// `(app_id, env, path, key)` is unique; the server-assigned id is not part
/// of it. Import ids use the form `{app_id}:{env}:{path}:{key}`, where the
/// path is everything between the second and the last `:`, so it may itself
/// contain `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretAddress {
    pub app_id: String,
    pub env: String,
    pub path: String,
    pub key: String,
}

impl SecretAddress {
    pub fn new(
        app_id: impl Into<String>,
        env: impl Into<String>,
        path: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            env: env.into(),
            path: path.into(),
            key: key.into(),
        }
    }

    /// Parse an import id.
    pub fn parse(value: &str) -> Result<Self, ImportIdError> {
        let err = |reason| ImportIdError {
            value: value.to_string(),
            reason,
        };

        let mut head = value.splitn(3, ':');
        let app_id = head.next().unwrap_or_default();
        let env = head.next().ok_or_else(|| err("missing env"))?;
        let rest = head.next().ok_or_else(|| err("missing path and key"))?;
        let (path, key) = rest
            .rsplit_once(':')
            .ok_or_else(|| err("missing path or key"))?;

        if app_id.is_empty() {
            return Err(err("app_id is empty"));
        }
        if env.is_empty() {
            return Err(err("env is empty"));
        }
        if key.is_empty() {
            return Err(err("key is empty"));
        }

        let path = if path.is_empty() { ROOT_PATH } else { path };

        Ok(Self {
            app_id: app_id.to_string(),
            env: env.to_string(),
            path: path.to_string(),
            key: key.to_string(),
        })
    }
}

impl FromStr for SecretAddress {
    type Err = ImportIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SecretAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.app_id, self.env, self.path, self.key)
    }
}
