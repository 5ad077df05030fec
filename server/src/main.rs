use std::time::Duration;

use tokio::net::TcpListener;

use harbor_server::commands::CommandRegistry;
use harbor_server::config::{generate_config_template, Config};
use harbor_server::conn::{actor, sweeper, ServerHandle};
use harbor_server::state::AppState;
use harbor_server::transcript::TranscriptSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "harbor_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "harbor_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("HARBOR server v{} starting", env!("CARGO_PKG_VERSION"));

    // Registries are owned here and shared through the state bundle.
    let handle = ServerHandle::new();
    let state = AppState::new(
        handle.clone(),
        CommandRegistry::builtin(),
        TranscriptSink::spawn(config.log_file.clone().into()),
    );

    // Idle eviction runs on its own task for the life of the process.
    tokio::spawn(sweeper::run(
        handle,
        Duration::from_secs(config.idle_ttl_secs),
        Duration::from_secs(config.sweep_interval_secs),
    ));

    // Bind and serve; a bind failure is fatal, accept failures are not.
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((stream, _peer)) => {
                tokio::spawn(actor::run_connection(stream, state.clone()));
            }
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
            }
        }
    }
}
