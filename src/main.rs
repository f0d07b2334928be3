use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use leader_lite::codec::Message;
use leader_lite::config::{
    load_members, parse_members, ElectionStrategy, NodeConfig, PeerConfig,
};
use leader_lite::node::Node;
use leader_lite::shutdown::install_shutdown_handler;
use leader_lite::transport::{TcpTransport, Transport};

#[derive(Parser, Debug)]
#[command(name = "leader-lite")]
#[command(version)]
#[command(about = "Leader election for a fixed cluster (bully or ring)")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start an election node
    Server(ServerArgs),

    /// Check whether a node accepts election traffic
    Ping(PingArgs),
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Node ID (unique, higher wins)
    #[arg(long, default_value = "1")]
    node_id: u64,

    /// Port to listen on for election messages
    #[arg(long, default_value = "5001")]
    port: u16,

    /// Port for the status API (optional)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Full membership including this node (comma-separated, format: "id:host:port").
    /// Order defines the ring.
    /// Example: "1:127.0.0.1:5001,2:127.0.0.1:5002,3:127.0.0.1:5003"
    #[arg(long, conflicts_with = "topology")]
    members: Option<String>,

    /// JSON membership file: [{"id": 1, "host": "127.0.0.1", "port": 5001}, ...]
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Election algorithm
    #[arg(long, value_enum, default_value = "bully")]
    strategy: ElectionStrategy,

    /// Minimum delay between leader checks (ms)
    #[arg(long, default_value = "3000")]
    probe_min_ms: u64,

    /// Maximum delay between leader checks (ms)
    #[arg(long, default_value = "5000")]
    probe_max_ms: u64,

    /// Timeout for each outbound connection (ms)
    #[arg(long, default_value = "2000")]
    connect_timeout_ms: u64,
}

// =============================================================================
// Ping Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct PingArgs {
    /// Node address (host:port)
    #[arg(long, short = 'a', default_value = "127.0.0.1:5001")]
    addr: String,

    /// Timeout (ms)
    #[arg(long, default_value = "2000")]
    timeout_ms: u64,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct PingOutput {
    addr: String,
    reachable: bool,
    elapsed_ms: u128,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Ping(ping_args) => {
            if !handle_ping(ping_args).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let members = match (&args.members, &args.topology) {
        (Some(list), _) => parse_members(list)?,
        (None, Some(path)) => load_members(path)?,
        (None, None) => return Err("one of --members or --topology is required".into()),
    };

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let dashboard_addr: Option<SocketAddr> = match args.dashboard_port {
        Some(p) => Some(format!("0.0.0.0:{}", p).parse()?),
        None => None,
    };

    let config = NodeConfig {
        node_id: args.node_id,
        listen_addr,
        members,
        strategy: args.strategy,
        probe_interval_min_ms: args.probe_min_ms,
        probe_interval_max_ms: args.probe_max_ms,
        connect_timeout_ms: args.connect_timeout_ms,
        ..NodeConfig::default()
    };

    tracing::info!(
        node_id = config.node_id,
        listen_addr = %config.listen_addr,
        dashboard_addr = ?dashboard_addr,
        strategy = %config.strategy,
        members = ?config.members.iter().map(|p| format!("{}:{}", p.node_id, p.addr)).collect::<Vec<_>>(),
        "Starting leader-lite node"
    );

    let node = Node::new(config, dashboard_addr)?;
    let shutdown = install_shutdown_handler();
    node.run(shutdown).await?;

    Ok(())
}

/// Returns whether the node accepted the probe.
async fn handle_ping(args: PingArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let transport = TcpTransport::new(Duration::from_millis(args.timeout_ms));
    let peer = PeerConfig {
        node_id: 0,
        addr: args.addr.clone(),
    };

    let started = Instant::now();
    let result = transport.send(&peer, &Message::Ping { sender_id: 0 }).await;
    let output = PingOutput {
        addr: args.addr,
        reachable: result.is_ok(),
        elapsed_ms: started.elapsed().as_millis(),
        error: result.err().map(|e| e.to_string()),
    };

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            if output.reachable {
                println!("{} is reachable ({} ms)", output.addr, output.elapsed_ms);
            } else {
                println!(
                    "{} is unreachable: {}",
                    output.addr,
                    output.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    Ok(output.reachable)
}
