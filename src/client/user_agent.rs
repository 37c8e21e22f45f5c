//! `User-Agent` construction.

/// Provider release reported to the API.
pub const PROVIDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the client library embedded in this provider.
pub const SDK_VERSION: &str = "0.1.0";

/// Builds `terraform-provider-phase/{v} phase-rust-sdk/{v} ({os} {arch}; {user}@{host})`.
///
/// The `user@host` detail is dropped when either lookup fails.
pub fn user_agent() -> String {
    render(local_identity().as_deref())
}

fn render(identity: Option<&str>) -> String {
    let mut details = vec![format!(
        "{} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )];
    if let Some(identity) = identity {
        details.push(identity.to_string());
    }

    format!(
        "terraform-provider-phase/{PROVIDER_VERSION} phase-rust-sdk/{SDK_VERSION} ({})",
        details.join("; ")
    )
}

fn local_identity() -> Option<String> {
    let user = whoami::fallible::username().ok()?;
    let host = hostname::get().ok()?.into_string().ok()?;
    if user.is_empty() || host.is_empty() {
        return None;
    }
    Some(format!("{user}@{host}"))
}
