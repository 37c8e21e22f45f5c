use std::fmt;

use reqwest::StatusCode;

/// The secrets operation a request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create secret",
            Operation::Read => "read secret(s)",
            Operation::Update => "update secret",
            Operation::Delete => "delete secret",
        })
    }
}

/// Phase API error types.
///
/// `NotFound` means the request succeeded but matched nothing, which callers
/// must be able to tell apart from a failed request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error communicating with Phase: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to parse Phase API response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to {operation}: {status} - {body}")]
    Api {
        operation: Operation,
        status: StatusCode,
        body: String,
    },

    #[error("no secrets found")]
    NotFound,

    #[error("failed to {operation}: API returned no secret")]
    EmptyResponse { operation: Operation },
}

impl ClientError {
    /// True for an API rejection caused by a duplicate key in scope.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::CONFLICT)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
