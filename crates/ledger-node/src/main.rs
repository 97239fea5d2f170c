mod api;
mod constants;

use std::net::SocketAddr;

use clap::Parser;
use ledger_core::{Ledger, LedgerConfig, MiningStrategy};
use tracing::{info, Level};

use crate::api::AppState;
use crate::constants::{DEFAULT_LISTEN, DEFAULT_NETWORK};

#[derive(Parser, Debug)]
#[command(name = "ledger-node")]
#[command(about = "HTTP front end for an in-memory proof-of-work ledger")]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Leading zero hex digits required of each mined block hash
    #[arg(long, default_value_t = ledger_core::constants::DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Search nonces on all cores
    #[arg(long)]
    parallel: bool,

    /// Network name reported by /status
    #[arg(long, default_value = DEFAULT_NETWORK)]
    network: String,

    /// Fixed genesis timestamp (Unix seconds) for reproducible chains
    #[arg(long)]
    genesis_timestamp: Option<u64>,
}

impl Args {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            mining: if self.parallel {
                MiningStrategy::Parallel
            } else {
                MiningStrategy::Sequential
            },
            genesis_timestamp: self.genesis_timestamp,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let ledger = Ledger::with_config(args.ledger_config())?;
    let state = AppState::new(ledger, args.network.clone());
    let app = api::router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("ledger-node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
