//! Taskdeck command-line client.
//!
//! Wires the authenticated request pipeline over reqwest and a file-backed
//! credential store, restores the previous session, then runs one command.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskdeck_application::AuthPipeline;
use taskdeck_domain::{ApiRequest, CredentialKind, ErrorPayload};
use taskdeck_infrastructure::{
    AppConfig, FileCredentialRepository, ReqwestTransport, SystemClock, TokioFileSystem,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "taskdeck", version, about = "Authenticated client for the Taskdeck API")]
struct Cli {
    /// Overrides the API base URL.
    #[arg(long, env = "TASKDECK_API_BASE_URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Signs in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Signs out and clears stored credentials.
    Logout,
    /// Shows the restored session and credential state.
    Status,
    /// Performs an authenticated GET and prints the JSON body.
    Get {
        /// Path relative to the API base URL.
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url;
    }
    debug!(?config, "configuration loaded");

    let pipeline = build_pipeline(&config)?;
    match pipeline.session.check_auth_status().await {
        Ok(restored) => debug!(authenticated = restored.is_authenticated, "session restored"),
        Err(e) => warn!(error = %e, "stored session unreadable, continuing signed out"),
    }

    run(&pipeline, cli.command).await
}

fn build_pipeline(config: &AppConfig) -> Result<AuthPipeline> {
    let endpoints = config.endpoints()?;
    let storage_dir = config.credential_dir()?;
    let transport = ReqwestTransport::new(config.request_timeout())
        .context("creating HTTP client")?;
    let repository = FileCredentialRepository::new(TokioFileSystem::new(), &storage_dir);

    info!(
        base_url = %endpoints.base_url(),
        storage = %repository.path().display(),
        "Starting Taskdeck v{}",
        env!("CARGO_PKG_VERSION")
    );

    Ok(AuthPipeline::new(
        Arc::new(transport),
        Arc::new(repository),
        Arc::new(SystemClock::new()),
        endpoints,
        config.policy(),
    ))
}

async fn run(pipeline: &AuthPipeline, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = pipeline
                .auth
                .sign_in(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!(ErrorPayload::from(&e)))?;
            println!("Signed in as {} ({})", user.email, user.id);
        }
        Command::Logout => {
            pipeline.auth.sign_out().await;
            println!("Signed out");
        }
        Command::Status => {
            let snapshot = pipeline.session.snapshot();
            match &snapshot.user {
                Some(user) if snapshot.is_authenticated => {
                    println!("Signed in as {} ({})", user.email, user.id);
                }
                _ => println!("Not signed in"),
            }
            for kind in CredentialKind::ALL {
                let status = pipeline.tokens.status(kind).await?;
                println!("  {kind}: {}", status.display_message());
            }
        }
        Command::Get { path } => {
            let body: serde_json::Value = pipeline
                .gateway
                .json(ApiRequest::get(path))
                .await
                .map_err(|e| anyhow::anyhow!(ErrorPayload::from(&e)))?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}
