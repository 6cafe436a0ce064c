use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::json;

use repair_liveness::config::loader::load_config;
use repair_liveness::config::{AppConfig, ConnectionConfig};
use repair_liveness::connection::{resolve_address, AddressTranslator, MappedAddressTranslator};
use repair_liveness::lifecycle::startup::{init_observability, watch_connection_config};

#[derive(Parser)]
#[command(name = "liveness-cli")]
#[command(about = "Inspect repair-liveness configuration", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config file and print the effective settings
    Check,
    /// Print the address a host would be dialed on
    Resolve {
        host: String,
    },
    /// Watch the config file and print connection settings whenever they change
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Check => {
            println!("{}", serde_json::to_string_pretty(&summary(&config))?);
        }
        Commands::Resolve { host } => {
            let connection = &config.connection;
            let address = resolve_address(&host, connection.local_mode, &connection.ports);
            let translated = MappedAddressTranslator::from_config(&connection.address_translation)
                .map(|t| t.translate(&address));
            let out = json!({
                "host": host,
                "address": address,
                "translated": translated,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Watch => {
            init_observability(&config.observability);
            let (_watcher, mut updates) = watch_connection_config(&cli.config, &config)?;

            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(connection) => println!("{}", serde_json::to_string_pretty(&connection_summary(&connection))?),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }

    Ok(())
}

fn summary(config: &AppConfig) -> serde_json::Value {
    json!({
        "connection": connection_summary(&config.connection),
        "heartbeat": {
            "interval_secs": config.heartbeat.effective_interval().as_secs(),
            "tick_secs": config.heartbeat.tick_secs,
            "datacenter_availability": config.heartbeat.datacenter_availability,
            "worker_pool_size": config.heartbeat.worker_pool_size,
        },
        "observability": config.observability,
    })
}

fn connection_summary(connection: &ConnectionConfig) -> serde_json::Value {
    json!({
        "local_mode": connection.local_mode,
        "timeout_secs": connection.timeout_secs,
        "ports": connection.ports,
        "authenticated": connection.credentials.is_some(),
        "address_translation": connection.address_translation.enabled,
    })
}
