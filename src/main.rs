//! Secure Upload Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────────────┐
//!                       │                   UPLOAD GATEWAY                      │
//!                       │                                                       │
//!   Client Request      │  ┌──────────┐   ┌──────────────┐   ┌──────────────┐   │
//!   ────────────────────┼─▶│   net    │──▶│   security   │──▶│     http     │   │
//!                       │  │ listener │   │ gate/throttle│   │ decode form  │   │
//!                       │  └──────────┘   └──────┬───────┘   └──────┬───────┘   │
//!                       │        blocked: drop ◀─┘                  │           │
//!                       │                        ▲                  ▼           │
//!                       │                 ┌──────┴───────┐   ┌──────────────┐   │
//!                       │                 │     auth     │   │   modules    │   │
//!                       │                 │ basic chain  │   │  dispatcher  │   │
//!                       │                 └──────────────┘   └──────┬───────┘   │
//!   Client Response     │  ┌──────────┐                             │           │
//!   ◀───────────────────┼──│ response │◀────────────────────────────┘           │
//!                       │  │ render   │                                         │
//!                       │  └──────────┘                                         │
//!                       │                                                       │
//!                       │  config · observability · lifecycle                   │
//!                       └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use secure_upload::config::{load_config, validate_config};
use secure_upload::lifecycle::{shutdown_on_signal, start, Shutdown};
use secure_upload::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "secure-upload", version, about = "Authenticated upload gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the listener port
    #[arg(short = 'p', long)]
    http_port: Option<u16>,

    /// Override the listener host
    #[arg(short = 'b', long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    config
        .listener
        .override_bind(cli.bind.as_deref(), cli.http_port);
    validate_config(&config).map_err(secure_upload::config::ConfigError::Validation)?;

    logging::init(&config.observability)?;

    tracing::info!("secure-upload v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let (server, listener) = start(&config).await?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(shutdown_on_signal(shutdown));

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
