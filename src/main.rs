//! Bolillero - Unified CLI
//!
//! Shared 90-ball bingo: serve the game, watch tickets, or drive draws.

#![warn(missing_docs)]

use anyhow::Result;
use bolillero::announce::LogAnnouncer;
use bolillero::claim::ClaimGate;
use bolillero::cli::{Cli, Command};
use bolillero::client::HttpGameClient;
use bolillero::config::{ParticipantConfig, ServerConfig};
use bolillero::participant::ParticipantRuntime;
use bolillero::server::AppState;
use bolillero::session::GameSession;
use bolillero::storage::{FileStore, KeyValueStore, MemoryStore};
use bolillero::sync::{Poller, SyncConfig};
use bolillero::tickets::TicketStore;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the admin key.
const ADMIN_KEY_ENV: &str = "BOLILLERO_ADMIN_KEY";

/// Cadence for the participant presence ping.
const PRESENCE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            data_dir,
        } => run_server(config, host, port, data_dir).await,
        Command::Watch {
            config,
            server_url,
            tickets,
            interval,
        } => run_watch(config, server_url, tickets, interval).await,
        Command::Generate {
            server_url,
            owner,
            count,
            code,
        } => run_generate(server_url, owner, count, code).await,
        Command::Draw { server_url } => run_draw(server_url).await,
        Command::Reset { server_url } => run_reset(server_url).await,
    }
}

fn load_server_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    match path {
        Some(path) => Ok(ServerConfig::from_file(path)?),
        None => Ok(ServerConfig::default()),
    }
}

fn load_participant_config(path: Option<PathBuf>) -> Result<ParticipantConfig> {
    match path {
        Some(path) => Ok(ParticipantConfig::from_file(path)?),
        None => Ok(ParticipantConfig::default()),
    }
}

async fn run_server(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_server_config(config)?;
    let host = host.unwrap_or_else(|| config.host().clone());
    let port = port.unwrap_or(*config.port());
    let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(config.data_dir()));

    let admin_key = std::env::var(ADMIN_KEY_ENV).ok();
    if admin_key.is_none() {
        info!("No {ADMIN_KEY_ENV} set; admin endpoints are open");
    }

    let session = GameSession::new(config.host_ttl());
    info!(
        game_id = %session.game_id(),
        join_code = %session.join_code(),
        "Game ready"
    );

    let state = AppState {
        session,
        tickets: Arc::new(TicketStore::open(data_dir)?),
        admin_key,
    };
    let addr = format!("{host}:{port}").parse()?;
    bolillero::server::serve(addr, state).await
}

async fn run_watch(
    config: Option<PathBuf>,
    server_url: Option<String>,
    ticket_ids: Vec<String>,
    interval: Option<u64>,
) -> Result<()> {
    let config = load_participant_config(config)?;
    let server_url = server_url.unwrap_or_else(|| config.server_url().clone());
    let interval = interval
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());

    let client = HttpGameClient::new(server_url);
    let mut tickets = Vec::with_capacity(ticket_ids.len());
    for id in &ticket_ids {
        let ticket = client.fetch_ticket(id).await?;
        info!(ticket_id = %ticket.id, owner = %ticket.owner, "Watching ticket");
        println!("Ticket {} ({}):\n{}\n", ticket.id, ticket.owner, ticket.grid.display());
        tickets.push(ticket);
    }

    // Presence runs as its own polling task so the draw loop never waits
    // on it.
    let presence_client = client.clone();
    let device_id = format!("watch-{}", std::process::id());
    tokio::spawn(async move {
        Poller::new(PRESENCE_INTERVAL)
            .run(async move || {
                if let Err(e) = presence_client.ping_presence(&device_id).await {
                    tracing::debug!(error = %e, "Presence ping failed");
                }
                true
            })
            .await;
    });

    let sync_config = SyncConfig {
        host_grace: config.host_grace(),
    };
    match config.claim_store() {
        Some(path) => {
            let gate = ClaimGate::new(FileStore::open(path)?);
            watch_loop(client, sync_config, tickets, gate, interval).await
        }
        None => {
            let gate = ClaimGate::new(MemoryStore::new());
            watch_loop(client, sync_config, tickets, gate, interval).await
        }
    }
}

async fn watch_loop<S: KeyValueStore>(
    client: HttpGameClient,
    config: SyncConfig,
    tickets: Vec<bolillero::Ticket>,
    mut gate: ClaimGate<S>,
    interval: std::time::Duration,
) -> Result<()> {
    // Remember which tickets belong to this device across restarts.
    for ticket in &tickets {
        gate.store_mut()
            .set(&format!("ticket/{}", ticket.id), &ticket.owner)?;
    }
    let mut runtime = ParticipantRuntime::new(config, tickets, gate, LogAnnouncer);
    info!(interval_secs = interval.as_secs(), "Watching draws");
    runtime.run(&client, interval).await;
    Ok(())
}

async fn run_generate(server_url: String, owner: String, count: usize, code: String) -> Result<()> {
    let client = HttpGameClient::new(server_url);
    let tickets = client
        .generate_tickets(&owner, count, &code, None)
        .await?;
    for ticket in &tickets {
        println!("Ticket {} ({}):\n{}\n", ticket.id, ticket.owner, ticket.grid.display());
    }
    println!("Created {} ticket(s). Watch them with: bolillero watch <id>...", tickets.len());
    Ok(())
}

async fn run_draw(server_url: String) -> Result<()> {
    let client = admin_client(server_url)?;
    let report = client.draw().await?;
    println!("{}", report.phrase);
    println!("({} drawn, {} remaining)", report.count, report.remaining);
    Ok(())
}

async fn run_reset(server_url: String) -> Result<()> {
    let client = admin_client(server_url)?;
    let game_id = client.reset().await?;
    let session = client.admin_session().await?;
    println!("New game {game_id}, join code {}", session.join_code);
    Ok(())
}

fn admin_client(server_url: String) -> Result<HttpGameClient> {
    let client = HttpGameClient::new(server_url);
    Ok(match std::env::var(ADMIN_KEY_ENV) {
        Ok(key) => client.with_admin_key(key),
        Err(_) => client,
    })
}
