//! Phase credential parsing.
//!
//! Phase tokens look like `pss_service:v2:<hex64>:<hex64>:<hex64>` or
//! `pss_user:v1:<hex64>:<hex64>:<hex64>`. The third field is the bearer
//! secret sent to the API; the prefix and version decide which auth scheme
//! the API expects.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

static SERVICE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^pss_service:v(\d+):([a-fA-F0-9]{64}):([a-fA-F0-9]{64}):([a-fA-F0-9]{64})(?::|$)",
    )
    .expect("service token pattern is valid")
});

static USER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^pss_user:v(\d+):([a-fA-F0-9]{64}):([a-fA-F0-9]{64}):([a-fA-F0-9]{64})(?::|$)",
    )
    .expect("user token pattern is valid")
});

/// The auth scheme a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Service,
    ServiceAccount,
    User,
    /// The credential matched no known shape.
    Unknown,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Service => "Service",
            TokenKind::ServiceAccount => "ServiceAccount",
            TokenKind::User => "User",
            TokenKind::Unknown => "",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential split into its kind and the bearer value sent to the API.
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub kind: TokenKind,
    pub bearer: SecretString,
}

impl ResolvedToken {
    /// Authorization scheme, e.g. `Bearer ServiceAccount`.
    pub fn auth_scheme(&self) -> String {
        match self.kind {
            TokenKind::Unknown => "Bearer".to_string(),
            kind => format!("Bearer {kind}"),
        }
    }

    /// Full `Authorization` header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.auth_scheme(), self.bearer.expose_secret())
    }
}

/// Classify a raw credential string.
///
/// Unrecognized input is passed through verbatim as the bearer so that the
/// API, not the provider, rejects it.
pub fn resolve_token(raw: &str) -> ResolvedToken {
    if let Some(caps) = SERVICE_TOKEN.captures(raw) {
        let kind = if &caps[1] == "2" {
            TokenKind::ServiceAccount
        } else {
            TokenKind::Service
        };
        return ResolvedToken {
            kind,
            bearer: SecretString::from(caps[2].to_string()),
        };
    }

    if let Some(caps) = USER_TOKEN.captures(raw) {
        return ResolvedToken {
            kind: TokenKind::User,
            bearer: SecretString::from(caps[2].to_string()),
        };
    }

    ResolvedToken {
        kind: TokenKind::Unknown,
        bearer: SecretString::from(raw.to_string()),
    }
}
