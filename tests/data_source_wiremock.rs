mod support;

use anyhow::Result;
use phase_provider::provider::SecretsDataSourceConfig;
use serde_json::json;
use support::{body, provider_for, secret_json, with_override, SELF_HOSTED_SECRETS_PATH};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_mixed_paths(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SELF_HOSTED_SECRETS_PATH))
        .and(query_param("app_id", "A1"))
        .and(query_param("env", "prod"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            body(&[
                secret_json("s-1", "ROOT_KEY", "r", "/", &[]),
                secret_json("s-2", "DB_PASS", "abc123", "/db", &["database"]),
                secret_json("s-3", "DB_USER", "admin", "/db", &["database"]),
                secret_json("s-4", "CACHE_URL", "redis://", "/cache", &["cache"]),
            ]),
            "application/json",
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn empty_path_returns_every_path() -> Result<()> {
    let server = MockServer::start().await;
    mount_mixed_paths(&server).await;
    let provider = provider_for(&server)?;

    let query = SecretsDataSourceConfig::new("A1", "prod").with_path("");
    let state = provider.secrets_data_source().read(&query).await?;

    let keys: Vec<_> = state.secrets.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["CACHE_URL", "DB_PASS", "DB_USER", "ROOT_KEY"]);
    assert_eq!(state.id, "A1-prod---");

    Ok(())
}

#[tokio::test]
async fn explicit_path_filters_exact_matches() -> Result<()> {
    let server = MockServer::start().await;
    mount_mixed_paths(&server).await;
    let provider = provider_for(&server)?;

    let query = SecretsDataSourceConfig::new("A1", "prod").with_path("/db");
    let state = provider.secrets_data_source().read(&query).await?;

    assert_eq!(state.secrets.len(), 2);
    assert_eq!(state.secrets["DB_PASS"].expose(), "abc123");
    assert_eq!(state.secrets["DB_USER"].expose(), "admin");

    let root = provider
        .secrets_data_source()
        .read(&SecretsDataSourceConfig::new("A1", "prod"))
        .await?;
    assert_eq!(root.secrets.keys().collect::<Vec<_>>(), vec!["ROOT_KEY"]);

    Ok(())
}

#[tokio::test]
async fn tags_and_key_are_forwarded_as_query() -> Result<()> {
    let server = MockServer::start().await;
    let provider = provider_for(&server)?;

    Mock::given(method("GET"))
        .and(path(SELF_HOSTED_SECRETS_PATH))
        .and(query_param("key", "DB_PASS"))
        .and(query_param("tags", "database,cache"))
        .and(query_param_is_missing("path"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            body(&[secret_json("s-2", "DB_PASS", "abc123", "/db", &["database"])]),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let query = SecretsDataSourceConfig::new("A1", "prod")
        .with_path("/db")
        .with_key("DB_PASS")
        .with_tags(vec!["database".to_string(), "cache".to_string()]);
    let state = provider.secrets_data_source().read(&query).await?;

    assert_eq!(state.secrets["DB_PASS"].expose(), "abc123");
    assert_eq!(state.id, "A1-prod-/db-DB_PASS-database,cache");

    Ok(())
}

#[tokio::test]
async fn active_override_wins() -> Result<()> {
    let server = MockServer::start().await;
    let provider = provider_for(&server)?;

    Mock::given(method("GET"))
        .and(path(SELF_HOSTED_SECRETS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            body(&[
                with_override(secret_json("s-1", "ACTIVE", "base", "/", &[]), "mine", true),
                with_override(
                    secret_json("s-2", "INACTIVE", "base", "/", &[]),
                    "mine",
                    false,
                ),
            ]),
            "application/json",
        ))
        .mount(&server)
        .await;

    let state = provider
        .secrets_data_source()
        .read(&SecretsDataSourceConfig::new("A1", "prod"))
        .await?;

    assert_eq!(state.secrets["ACTIVE"].expose(), "mine");
    assert_eq!(state.secrets["INACTIVE"].expose(), "base");

    Ok(())
}

#[tokio::test]
async fn malformed_entries_are_skipped() -> Result<()> {
    let server = MockServer::start().await;
    let provider = provider_for(&server)?;

    Mock::given(method("GET"))
        .and(path(SELF_HOSTED_SECRETS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            body(&[
                json!({ "id": "bad-1", "key": 42, "value": "v", "path": "/" }),
                json!({ "id": "bad-2", "key": "NUMERIC", "value": 7, "path": "/" }),
                json!({ "id": "ok", "key": "GOOD", "value": "fine", "path": null }),
            ]),
            "application/json",
        ))
        .mount(&server)
        .await;

    let state = provider
        .secrets_data_source()
        .read(&SecretsDataSourceConfig::new("A1", "prod"))
        .await?;

    assert_eq!(state.secrets.len(), 1);
    assert_eq!(state.secrets["GOOD"].expose(), "fine");

    Ok(())
}

#[tokio::test]
async fn no_secrets_is_not_found() -> Result<()> {
    let server = MockServer::start().await;
    let provider = provider_for(&server)?;

    Mock::given(method("GET"))
        .and(path(SELF_HOSTED_SECRETS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[]", "application/json"))
        .mount(&server)
        .await;

    let err = provider
        .secrets_data_source()
        .read(&SecretsDataSourceConfig::new("A1", "prod"))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn secrets_are_redacted_when_serialized() -> Result<()> {
    let server = MockServer::start().await;
    mount_mixed_paths(&server).await;
    let provider = provider_for(&server)?;

    let state = provider
        .secrets_data_source()
        .read(&SecretsDataSourceConfig::new("A1", "prod").with_path("/db"))
        .await?;

    let rendered = serde_json::to_string(&state)?;
    assert!(!rendered.contains("abc123"));
    assert!(rendered.contains("(sensitive value)"));

    Ok(())
}
