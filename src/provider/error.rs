use serde::Serialize;

use crate::client::ClientError;
use crate::models::ImportIdError;

/// Errors surfaced from resource and data-source callbacks.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    ImportId(#[from] ImportIdError),

    #[error("invalid {attribute}: {message}")]
    Invalid {
        attribute: &'static str,
        message: String,
    },

    #[error("secret {key:?} not found in {app_id}/{env}")]
    SecretNotFound {
        app_id: String,
        env: String,
        key: String,
    },

    #[error("received 409 Conflict for secret {key:?} but couldn't find the existing secret")]
    ConflictUnresolved {
        key: String,
        #[source]
        source: ClientError,
    },

    #[error("error reading existing secret {key:?}: {source}")]
    ConflictLookup {
        key: String,
        #[source]
        source: ClientError,
    },

    #[error("error updating existing secret {key:?}: {source}")]
    ConflictUpdate {
        key: String,
        #[source]
        source: ClientError,
    },

    #[error("changing {attribute} requires replacing the secret")]
    RequiresReplacement { attribute: &'static str },
}

impl ProviderError {
    /// True when the remote system holds no matching secret.
    pub fn is_not_found(&self) -> bool {
        match self {
            ProviderError::Client(err) => err.is_not_found(),
            ProviderError::SecretNotFound { .. } => true,
            _ => false,
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            ProviderError::Client(err) if err.is_not_found() => "No secrets found",
            ProviderError::Client(_) => "Phase API request failed",
            ProviderError::ImportId(_) => "Invalid import ID",
            ProviderError::Invalid { .. } => "Invalid configuration",
            ProviderError::SecretNotFound { .. } => "Secret not found",
            ProviderError::ConflictUnresolved { .. }
            | ProviderError::ConflictLookup { .. }
            | ProviderError::ConflictUpdate { .. } => "Failed to reconcile existing secret",
            ProviderError::RequiresReplacement { .. } => "Resource replacement required",
        }
    }

    fn attribute(&self) -> Option<&'static str> {
        match self {
            ProviderError::Invalid { attribute, .. }
            | ProviderError::RequiresReplacement { attribute } => Some(*attribute),
            _ => None,
        }
    }
}

/// An error diagnostic as reported back to the plugin host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        Self {
            summary: err.summary().to_string(),
            detail: err.to_string(),
            attribute: err.attribute().map(str::to_string),
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        Self::from(&err)
    }
}
