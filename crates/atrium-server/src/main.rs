mod dto;
mod error;
mod handlers;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use atrium_core::now_unix_secs;
use atrium_store::Store;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "atrium", about = "Room occupancy tracking and group merging")]
struct Cli {
    /// Database file (defaults to $ATRIUM_DB, then ./atrium.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },

    /// Show occupancy statistics
    Stats,

    /// Populate the database with demo rooms, groups and students
    Seed,
}

fn db_path(cli: &Cli) -> PathBuf {
    cli.db
        .clone()
        .or_else(|| std::env::var("ATRIUM_DB").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("atrium.db"))
}

fn open_store(cli: &Cli) -> Result<Store> {
    let path = db_path(cli);
    Store::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve { addr } => cmd_serve(&cli, *addr).await,
        Commands::Stats => cmd_stats(&cli),
        Commands::Seed => cmd_seed(&cli),
    }
}

async fn cmd_serve(cli: &Cli, addr: SocketAddr) -> Result<()> {
    let store = open_store(cli)?;
    let app = routes::build_router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {addr}");
    println!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let now = now_unix_secs();

    let rooms = store
        .current_rooms(now)
        .map_err(|e| anyhow::anyhow!("failed to read occupancy: {e}"))?;
    let today = store
        .today_visits(now)
        .map_err(|e| anyhow::anyhow!("failed to read visits: {e}"))?;
    let combined = store
        .active_combined_groups(now)
        .map_err(|e| anyhow::anyhow!("failed to read combined groups: {e}"))?;

    let present: usize = rooms.iter().map(|r| r.count()).sum();
    println!("present now:     {present}");
    for room in &rooms {
        println!("  {:<16} {}", room.room_name, room.count());
    }
    println!("visits today:    {}", today.len());
    println!("combined groups: {}", combined.len());
    for group in &combined {
        println!("  {} ({} members)", group.name, group.member_groups.len());
    }
    Ok(())
}

fn cmd_seed(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let seed = || -> atrium_store::Result<()> {
        let mint = store.add_room("Mint", Some(25))?;
        let indigo = store.add_room("Indigo", Some(25))?;
        store.add_room("Atelier", None)?;

        let anna = store.add_supervisor("Anna")?;
        let bruno = store.add_supervisor("Bruno")?;
        let g1 = store.add_group("1a", Some(mint), None)?;
        let g2 = store.add_group("1b", Some(indigo), None)?;
        store.assign_supervisor(g1, anna)?;
        store.assign_supervisor(g2, bruno)?;

        store.add_subject("Mara", Some("STUDENT0001"))?;
        store.add_subject("Jonas", Some("STUDENT0002"))?;
        store.add_subject("Lena", Some("STUDENT0003"))?;
        Ok(())
    };
    seed().map_err(|e| anyhow::anyhow!("failed to seed database: {e}"))?;

    println!("seeded {}", db_path(cli).display());
    Ok(())
}
