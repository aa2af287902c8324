use std::net::SocketAddrV4;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lanlobby::prelude::*;
use lanlobby::{Advertisement, SettingValue};
use lanlobby_transport::TransportFactory;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Host or search for LAN game sessions.
#[derive(Debug, Parser)]
#[command(name = "lan-lobby", version)]
struct Cli {
    /// JSON file with a `LobbyConfig`. Missing fields keep their defaults.
    #[arg(long, env = "LANLOBBY_CONFIG")]
    config: Option<PathBuf>,

    /// Local player id and nickname.
    #[arg(long, default_value = "lan-player", env = "LANLOBBY_PLAYER")]
    player: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Subcommand)]
enum Command {
    /// Advertise a session until ctrl-c.
    Host {
        /// Session name.
        #[arg(long, default_value = "Game")]
        name: String,

        /// Public connection slots.
        #[arg(long, default_value_t = 4)]
        slots: u32,

        /// Advertised MAPNAME setting.
        #[arg(long, default_value = "Lobby")]
        map: String,

        /// Advertise via presence (routed) instead of as a LAN match.
        #[arg(long)]
        presence: bool,
    },
    /// Search once and print what answered.
    Search {
        /// Query one host directly instead of broadcasting.
        #[arg(long)]
        target: Option<SocketAddrV4>,
    },
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn host_settings(slots: u32, map: &str, presence: bool) -> SessionSettings {
    let mut settings = SessionSettings {
        num_public_connections: slots,
        should_advertise: true,
        is_lan_match: !presence,
        allow_join_via_presence: presence,
        allow_join_in_progress: true,
        ..Default::default()
    };
    settings.set(
        "MAPNAME",
        SettingValue::String(map.to_owned()),
        Advertisement::ViaOnlineService,
    );
    settings
}

/// Runs one search to completion. A poll loop must be driving `lobby`.
async fn search<F: TransportFactory>(
    lobby: &LanSessionInterface<F>,
    settings: SearchSettings,
) -> Result<Vec<SearchResult>, LobbyError> {
    let (id, mut events) = lobby.events().subscribe_channel();
    let started = lobby.find_sessions(settings);
    if started.is_ok() {
        while let Some(event) = events.recv().await {
            if let LobbyEvent::FindSessionsComplete { .. } = event {
                break;
            }
        }
    }
    lobby.events().unsubscribe(id);
    started.map(|()| lobby.search_results())
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("no sessions found");
        return;
    }
    for result in results {
        let s = &result.session;
        let map = match s.settings.get("MAPNAME") {
            Some(SettingValue::String(map)) => map.as_str(),
            _ => "?",
        };
        println!(
            "{:<20} {:<22} map={:<12} open={}/{} ping={}ms",
            s.owning_user_name,
            result.connect_string().unwrap_or_else(|| "-".into()),
            map,
            s.num_open_public_connections,
            s.settings.num_public_connections,
            result.ping_ms,
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LobbyConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => LobbyConfig::default(),
    };
    let identity = StaticIdentity::single(cli.player.clone(), cli.player.clone());
    let lobby = Arc::new(LanSessionInterface::new(
        UdpFactory::new(),
        config,
        Capabilities::none().with_identity(Arc::new(identity)),
    ));
    let poller = spawn_poll_loop(Arc::clone(&lobby), PollConfig::default());

    match cli.command {
        Command::Host {
            name,
            slots,
            map,
            presence,
        } => {
            lobby.create_session(0, &name, host_settings(slots, &map, presence))?;
            info!(
                session = %name,
                addr = %lobby.host_addr(),
                query_port = lobby.host_session_port(),
                "hosting, ctrl-c to stop"
            );
            tokio::signal::ctrl_c().await?;
            if let Err(e) = lobby.destroy_session(&name) {
                warn!(error = %e, "failed to destroy session");
            }
        }
        Command::Search { target } => {
            let settings = target.map_or_else(SearchSettings::lan, SearchSettings::routed);
            let results = search(&lobby, settings).await?;
            print_results(&results);
        }
    }

    let polls = poller.shutdown().await;
    info!(polls, "stopped");
    Ok(())
}
