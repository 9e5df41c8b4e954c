//! Business Gateway
//!
//! API gateway fronting the ERP backend services.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────────────┐
//!                        │                   BUSINESS GATEWAY                    │
//!                        │                                                       │
//!   Client Request       │  ┌─────────┐   ┌────────────┐   ┌──────────────────┐  │
//!   ─────────────────────┼─▶│  http   │──▶│  routing   │──▶│       auth       │  │
//!                        │  │ server  │   │ RouteTable │   │ local → remote   │  │
//!                        │  └─────────┘   └────────────┘   └────────┬─────────┘  │
//!                        │                                          ▼            │
//!                        │                                 ┌──────────────────┐  │     Licensing
//!                        │                                 │    licensing     │◀─┼──── Service
//!                        │                                 │ coalescing cache │  │
//!                        │                                 └────────┬─────────┘  │
//!                        │                                          ▼            │
//!   Client Response      │  ┌─────────┐                    ┌──────────────────┐  │
//!   ◀────────────────────┼──│ gateway │◀───────────────────│    transport     │◀─┼──── Backend
//!                        │  │  error  │                    │ (hyper client)   │  │     Service
//!                        │  └─────────┘                    └──────────────────┘  │
//!                        │                                                       │
//!                        │  Cross-cutting: config, health, observability,        │
//!                        │  security (rate limit), lifecycle                     │
//!                        └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use business_gateway::config::load_config;
use business_gateway::lifecycle::{watch_signals, Shutdown};
use business_gateway::observability::{logging, metrics};
use business_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "business-gateway", version, about = "API gateway for the Business ERP services")]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(config.observability.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "business-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        services = config.services.len(),
        license_ttl_secs = config.licensing.ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
