mod cli;
mod config;
mod server;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use wx_component::{
    AuthType, Component, ComponentIdentity, CredentialStore, HttpInvoker, MemoryCredentialStore,
    SqliteCredentialStore,
};

use crate::cli::{Args, Commands, StoreKind};
use crate::config::AppConfig;

const DEFAULT_LOG_FILTER: &str = "wxc=info,wx_component=info";

#[tokio::main]
async fn main() {
    // A missing .env is fine.
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("wxc=debug,wx_component=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose).with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.merge_args(&args);

    let identity = ComponentIdentity::new(config.component_config()?)
        .context("Invalid component configuration")?;
    let store = open_store(&config).await?;
    let invoker = Arc::new(HttpInvoker::new()?);
    let component = Component::new(identity, config.cache.clone(), store, invoker);

    match args.command {
        Commands::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.server.listen.clone());
            server::serve(component, &listen, config.server.body_limit_bytes).await?;
        }
        Commands::Token { timeout, refresh } => {
            let credentials = component.credentials();
            if refresh {
                credentials.invalidate_access_token().await?;
            }
            let token = credentials
                .access_token_within(Duration::from_secs(timeout))
                .await
                .context("Failed to obtain the component access token")?;
            println!("{token}");
        }
        Commands::Ticket { show } => {
            match component.credentials().current_verify_ticket().await? {
                Some(ticket) if show => println!("{ticket}"),
                Some(_) => println!("verify ticket cached for {}", component.app_id()),
                None => {
                    anyhow::bail!(
                        "no verify ticket cached for {}; the platform pushes one every 10 minutes to the serve endpoint",
                        component.app_id()
                    );
                }
            }
        }
        Commands::AuthUrl {
            redirect_uri,
            auth_type,
        } => {
            let auth_type = AuthType::from_code(auth_type).context("auth type must be 1, 2 or 3")?;
            let url = component
                .authorization_url(&redirect_uri, auth_type)
                .await
                .context("Failed to build the authorization URL")?;
            println!("{url}");
        }
    }

    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.store.kind {
        StoreKind::Memory => {
            info!("Using in-memory credential store");
            Arc::new(MemoryCredentialStore::new())
        }
        StoreKind::Sqlite => Arc::new(
            SqliteCredentialStore::connect(&config.store.database_url)
                .await
                .with_context(|| {
                    format!("Failed to open credential store {}", config.store.database_url)
                })?,
        ),
    };
    Ok(store)
}
