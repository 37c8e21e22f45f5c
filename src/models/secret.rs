use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Default secret path.
pub const ROOT_PATH: &str = "/";

fn default_path() -> String {
    ROOT_PATH.to_string()
}

/// The API sends `null` for unset optional strings and lists.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_root_path<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|p| !p.is_empty())
        .unwrap_or_else(default_path))
}

/// A secret as exchanged with the Phase API.
///
/// `version`, `created_at` and `updated_at` are computed by the server and
/// never sent back in request bodies. `comment` and `tags` are always sent so
/// that an update can clear them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
    #[serde(default = "default_path", deserialize_with = "null_as_root_path")]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing)]
    pub version: i64,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
    #[serde(
        rename = "override",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub override_: Option<SecretOverride>,
}

impl Secret {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
            comment: String::new(),
            path: default_path(),
            tags: Vec::new(),
            version: 0,
            created_at: None,
            updated_at: None,
            override_: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_override(mut self, value: impl Into<String>, is_active: bool) -> Self {
        self.override_ = Some(SecretOverride {
            value: value.into(),
            is_active,
        });
        self
    }

    /// The override, if one exists and is active.
    pub fn active_override(&self) -> Option<&SecretOverride> {
        self.override_.as_ref().filter(|o| o.is_active)
    }

    /// The value callers should see: the active override, else the base value.
    pub fn effective_value(&self) -> &str {
        match self.active_override() {
            Some(o) => &o.value,
            None => &self.value,
        }
    }

    /// Returns true if any of `tags` is attached to this secret.
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .field("comment", &self.comment)
            .field("path", &self.path)
            .field("tags", &self.tags)
            .field("version", &self.version)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("override", &self.override_)
            .finish()
    }
}

/// A per-user value substituted for the secret's value while active.
///
/// Activation happens outside the provider; the provider only stages the
/// value and reads the flag back.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretOverride {
    pub value: String,
    pub is_active: bool,
}

impl fmt::Debug for SecretOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretOverride")
            .field("value", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .finish()
    }
}
