mod support;

use std::io::Write;

use anyhow::Result;
use phase_provider::client::DEFAULT_HOST;
use phase_provider::config::ProviderConfig;
use phase_provider::provider::{PhaseProvider, SecretsDataSourceConfig};
use phase_provider::token::TokenKind;
use support::{body, secret_json, service_token, BEARER_HEX, SELF_HOSTED_SECRETS_PATH};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &TempDir, contents: &str) -> Result<std::path::PathBuf> {
    let config_path = dir.path().join("phase.toml");
    let mut file = std::fs::File::create(&config_path)?;
    write!(file, "{contents}")?;
    Ok(config_path)
}

#[tokio::test]
async fn config_file_points_provider_at_self_hosted_instance() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let config_path = write_config(
        &dir,
        &format!(
            "host = \"{}\"\nphase_token = \"{}\"\n",
            server.uri(),
            service_token(1)
        ),
    )?;

    Mock::given(method("GET"))
        .and(path(SELF_HOSTED_SECRETS_PATH))
        .and(header(
            "authorization",
            format!("Bearer Service {BEARER_HEX}").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            body(&[secret_json("s-1", "K", "v", "/", &[])]),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::load(&config_path)?.with_defaults_from(|_| None);
    let resolved = config.resolve()?;
    assert_eq!(resolved.host, format!("{}/service/public", server.uri()));
    assert_eq!(resolved.token.kind, TokenKind::Service);

    let provider = PhaseProvider::configure(&config)?;
    let state = provider
        .secrets_data_source()
        .read(&SecretsDataSourceConfig::new("A1", "prod"))
        .await?;
    assert_eq!(state.secrets["K"].expose(), "v");

    Ok(())
}

#[tokio::test]
async fn token_from_environment_is_used_when_file_has_none() -> Result<()> {
    let server = MockServer::start().await;
    let dir = TempDir::new()?;
    let config_path = write_config(
        &dir,
        &format!("host = \"{}\"\nskip_tls_verification = true\n", server.uri()),
    )?;

    Mock::given(method("GET"))
        .and(path(SELF_HOSTED_SECRETS_PATH))
        .and(header(
            "authorization",
            format!("Bearer ServiceAccount {BEARER_HEX}").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            body(&[secret_json("s-1", "K", "v", "/", &[])]),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let token = service_token(2);
    let config = ProviderConfig::load_or_default(&config_path)?.with_defaults_from(|name| {
        (name == "PHASE_PAT_TOKEN").then(|| token.clone())
    });
    assert!(config.skip_tls_verification);

    let provider = PhaseProvider::configure(&config)?;
    provider
        .secrets_data_source()
        .read(&SecretsDataSourceConfig::new("A1", "prod"))
        .await?;

    Ok(())
}

#[test]
fn missing_file_and_environment_use_cloud_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let config = ProviderConfig::load_or_default(&dir.path().join("phase.toml"))?
        .with_defaults_from(|name| (name == "PHASE_TOKEN").then(|| "opaque-token".to_string()));

    let resolved = config.resolve()?;
    assert_eq!(resolved.host, DEFAULT_HOST);
    assert_eq!(resolved.token.kind, TokenKind::Unknown);
    assert_eq!(
        resolved.token.authorization_header(),
        "Bearer opaque-token"
    );
    assert!(!resolved.skip_tls_verification);

    Ok(())
}

#[test]
fn malformed_config_file_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = write_config(&dir, "skip_tls_verification = \"sometimes\"\n")?;

    let err = ProviderConfig::load(&config_path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));

    Ok(())
}
