//! Cathedral - Unified CLI
//!
//! Runs the game server or prints the piece catalog.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use cathedral::{
    BroadcastHub, GameService, MemorySessionStore, PieceTypeId, ServerConfig, catalog, router,
};
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, host, config } => run_server(host, port, config).await,
        Command::Pieces => {
            print_pieces();
            Ok(())
        }
    }
}

/// Run the HTTP game server
#[instrument(skip_all)]
async fn run_server(host: Option<String>, port: Option<u16>, config: Option<PathBuf>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load(config.as_deref())?.with_address(host, port);
    info!(?config, "Starting Cathedral server");

    let service = Arc::new(GameService::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(BroadcastHub::new()),
        *config.territory_start(),
    ));

    let reaper = service
        .reaper(config.reaper_policy(), config.sweep_interval())
        .spawn();

    let app = router(Arc::clone(&service));
    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(address = %listener.local_addr()?, "Server ready");

    let result = axum::serve(listener, app).await;
    reaper.abort();
    info!(?result, "Server exited");
    result?;

    Ok(())
}

/// Print every piece shape in its base orientation
fn print_pieces() {
    for (id, shape) in catalog().iter().enumerate() {
        let label = match PieceTypeId::new(id as u8) {
            Some(piece) if piece.is_cathedral() => "cathedral".to_string(),
            _ => format!("piece {id}"),
        };
        println!("{label} ({} cells)\n{shape}\n", shape.footprint());
    }
}
