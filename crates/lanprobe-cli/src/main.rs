//! Lanprobe - command line neighbor discovery scanner
//!
//! Sends an MNDP probe to the configured targets and prints the devices
//! that answer within the listen window.

mod config;

use anyhow::Result;
use clap::Parser;
use lanprobe_core::DeviceRecord;
use lanprobe_discovery::DiscoveryEngine;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lanprobe")]
#[command(about = "Neighbor discovery scanner for MNDP-capable devices")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lanprobe.toml")]
    config: PathBuf,

    /// Listen window in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Probe target as addr:port (repeatable; replaces configured targets)
    #[arg(long)]
    target: Vec<SocketAddr>,

    /// Probe the broadcast address of every usable interface
    #[arg(long)]
    all_interfaces: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print records as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Lanprobe v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration, then apply command line overrides
    let mut config = config::load_config(&args.config)?;

    if let Some(timeout_ms) = args.timeout_ms {
        config.discovery.timeout_ms = timeout_ms;
    }
    if !args.target.is_empty() {
        config.discovery.targets = args.target;
    }
    if args.all_interfaces {
        config.discovery.all_interfaces = true;
    }
    if args.json {
        config.output.json = true;
    }

    let engine = DiscoveryEngine::new(config.to_discovery_config());

    let effective = engine.config();
    info!(
        port = effective.port,
        timeout_ms = effective.timeout_ms,
        all_interfaces = effective.all_interfaces,
        "Configuration loaded"
    );

    let records = engine.discover().await?;

    if config.output.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_listing(&records);
    }

    Ok(())
}

fn print_listing(records: &[DeviceRecord]) {
    println!("Discovered {} devices:", records.len());
    for record in records {
        println!(
            "  - {} at {}",
            record.display_name(),
            record.source_address
        );
        if let Some(mac) = &record.mac_address {
            println!("    MAC: {}", mac);
        }
        if let Some(platform) = &record.platform {
            println!("    Platform: {}", platform);
        }
        if let Some(board) = &record.board_name {
            println!("    Board: {}", board);
        }
        if let Some(version) = &record.version_info {
            println!("    Version: {}", version);
        }
        if let Some(software_id) = &record.software_id {
            println!("    Software ID: {}", software_id);
        }
        if let Some(uptime) = &record.uptime {
            println!("    Uptime: {}", uptime);
        }
        if let Some(interface) = &record.interface_name {
            println!("    Interface: {}", interface);
        }
    }
}
