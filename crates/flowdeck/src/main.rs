//! Flowdeck - piece action execution service.
//!
//! Main entry point for the Flowdeck server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flowdeck_broker::{JobBroker, run_worker};
use flowdeck_engine::EngineServices;
use flowdeck_pieces::InMemoryPieceRegistry;
use flowdeck_server::{AppState, ExecutionMode, InMemoryConnectionStore, Server, ServerConfig};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Flowdeck - piece action execution service
#[derive(Parser, Debug)]
#[command(name = "flowdeck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1:8080", env = "FLOWDECK_BIND")]
    bind: SocketAddr,

    /// Dispatch executions through the in-process worker loop instead of
    /// running them on the request task
    #[arg(long)]
    workers: bool,

    /// Seconds to wait for a worker response
    #[arg(long, default_value_t = 60)]
    execution_timeout: u64,

    /// Platform id requests are attributed to
    #[arg(long, default_value = "default", env = "FLOWDECK_PLATFORM_ID")]
    platform_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig {
        bind_address: cli.bind,
        execution_mode: if cli.workers {
            ExecutionMode::Worker
        } else {
            ExecutionMode::Local
        },
        execution_timeout: Duration::from_secs(cli.execution_timeout),
        platform_id: cli.platform_id,
        ..ServerConfig::default()
    };

    let registry = Arc::new(InMemoryPieceRegistry::new());
    let connections = Arc::new(InMemoryConnectionStore::new());
    let services = Arc::new(EngineServices::in_memory());

    let mut state = AppState::new(registry.clone(), connections, services.clone(), config);

    if cli.workers {
        let (broker, jobs) = JobBroker::new(state.config.broker_config());
        let broker = Arc::new(broker);

        // One consumer loop; jobs fan out into their own tasks inside it.
        tokio::spawn(run_worker(jobs, broker.clone(), registry, services));
        info!("worker loop started");

        state = state.with_broker(broker);
    }

    Server::from_state(state).run().await?;
    Ok(())
}
