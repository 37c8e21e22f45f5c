use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phase_provider::config::{default_config_path, ProviderConfig};
use phase_provider::models::{SecretAddress, ROOT_PATH};
use phase_provider::provider::{
    PhaseProvider, SecretResourceConfig, SecretsDataSourceConfig, Sensitive,
};
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "terraform-provider-phase")]
#[command(about = "Drive the Phase secrets provider outside of Terraform")]
struct Cli {
    /// Path to provider config file.
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the resolved provider configuration
    Config,

    /// Read secrets the way the phase_secrets data source does
    Secrets {
        #[arg(long)]
        app_id: String,

        #[arg(long)]
        env: String,

        /// Path to read from. Pass an empty string to match every path.
        #[arg(long, default_value = ROOT_PATH)]
        path: String,

        #[arg(long, default_value = "")]
        key: String,

        /// Tag filter; repeat for OR matching.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Print secret values instead of redacting them.
        #[arg(long)]
        reveal: bool,
    },

    /// Create or converge a secret the way the phase_secret resource does
    Apply {
        #[arg(long)]
        app_id: String,

        #[arg(long)]
        env: String,

        #[arg(long)]
        key: String,

        #[arg(long)]
        value: String,

        #[arg(long)]
        comment: Option<String>,

        #[arg(long, default_value = ROOT_PATH)]
        path: String,

        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Stage a personal override value.
        #[arg(long)]
        override_value: Option<String>,

        #[arg(long, requires = "override_value")]
        override_active: bool,
    },

    /// Import an existing secret by `{app_id}:{env}:{path}:{key}`
    Import { id: String },

    /// Delete a secret
    Delete {
        #[arg(long)]
        app_id: String,

        #[arg(long)]
        env: String,

        #[arg(long)]
        key: String,

        #[arg(long, default_value = ROOT_PATH)]
        path: String,
    },

    /// Print the provider, resource and data source schemas as JSON
    Schema,
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: &Path) -> Result<ProviderConfig> {
    let config = ProviderConfig::load_or_default(path)
        .with_context(|| format!("Failed to load provider config: {}", path.display()))?;
    Ok(config.with_env_defaults())
}

fn configure(path: &Path) -> Result<PhaseProvider> {
    PhaseProvider::configure(&load_config(path)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Config => {
            let resolved = load_config(&cli.config)?.resolve()?;

            print_json(&json!({
                "config_file": cli.config.display().to_string(),
                "host": resolved.host,
                "token_kind": resolved.token.kind.as_str(),
                "skip_tls_verification": resolved.skip_tls_verification,
            }))?;
        }

        Command::Secrets {
            app_id,
            env,
            path,
            key,
            tags,
            reveal,
        } => {
            let provider = configure(&cli.config)?;
            let query = SecretsDataSourceConfig::new(app_id, env)
                .with_path(path)
                .with_key(key)
                .with_tags(tags);
            let state = provider.secrets_data_source().read(&query).await?;

            if reveal {
                let secrets: BTreeMap<&str, &str> = state
                    .secrets
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.expose()))
                    .collect();
                print_json(&json!({ "id": state.id, "secrets": secrets }))?;
            } else {
                print_json(&state)?;
            }
        }

        Command::Apply {
            app_id,
            env,
            key,
            value,
            comment,
            path,
            tags,
            override_value,
            override_active,
        } => {
            let provider = configure(&cli.config)?;
            let resource = provider.secret_resource();

            let mut config = SecretResourceConfig::new(app_id, env, key, value).with_path(path);
            if let Some(comment) = comment {
                config = config.with_comment(comment);
            }
            if !tags.is_empty() {
                config = config.with_tags(tags);
            }
            if let Some(override_value) = override_value {
                config = config.with_override(Sensitive::from(override_value), override_active);
            }

            let prior = match resource.read(&config.address()).await {
                Ok(state) => Some(state),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err.into()),
            };
            let (action, state) = resource.apply(prior.as_ref(), &config).await?;
            print_json(&json!({ "action": action, "state": state }))?;
        }

        Command::Import { id } => {
            let provider = configure(&cli.config)?;
            let state = provider
                .secret_resource()
                .import(&id)
                .await
                .with_context(|| format!("Failed to import {id}"))?;
            print_json(&state)?;
        }

        Command::Delete {
            app_id,
            env,
            key,
            path,
        } => {
            let provider = configure(&cli.config)?;
            let resource = provider.secret_resource();
            let address = SecretAddress::new(app_id, env, path, key);

            let state = resource.read(&address).await?;
            resource.delete(&state).await?;
            print_json(&json!({ "deleted": address.to_string(), "id": state.id }))?;
        }

        Command::Schema => {
            print_json(&json!({
                "provider": PhaseProvider::schema(),
                "resources": PhaseProvider::resource_schemas(),
                "data_sources": PhaseProvider::data_source_schemas(),
            }))?;
        }
    }

    Ok(())
}
