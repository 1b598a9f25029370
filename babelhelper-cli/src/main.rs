//! babelctl - Command-line client for the babel routing daemon
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use babelhelper_client::{Client, ConnectionConfig, Message};
use babelhelper_protocol::DEFAULT_PORT;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "babelctl")]
#[command(about = "Command-line client for the babel routing daemon's control socket")]
#[command(version)]
struct Cli {
    /// Daemon address
    #[arg(long, env = "BABEL_HOST", default_value = "::1")]
    host: IpAddr,

    /// Control port
    #[arg(short, long, env = "BABEL_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Print events as JSON, one object per line
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start interactive REPL
    Repl,

    /// Subscribe to topology changes and print them until interrupted
    Monitor,

    /// Print the daemon's current interfaces, neighbours and routes
    Dump,

    /// Send a raw command and print the response lines
    Send {
        /// Command words, joined with spaces
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },

    /// Derive the EUI-64 IPv6 address of a MAC address
    MacToIp {
        /// MAC address (aa:bb:cc:dd:ee:ff)
        mac: String,

        /// Prefix supplying the upper 64 bits
        #[arg(long, default_value = "fe80::")]
        prefix: Ipv6Addr,
    },

    /// Recover the MAC address from an EUI-64 IPv6 address
    IpToMac {
        /// IPv6 address
        addr: Ipv6Addr,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Address conversions need no daemon connection
    if let Some(cmd @ (Commands::MacToIp { .. } | Commands::IpToMac { .. })) = &cli.command {
        match commands::execute_offline(cmd) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = ConnectionConfig::new(SocketAddr::new(cli.host, cli.port))
        .with_connect_timeout(Duration::from_secs(cli.connect_timeout));
    let addr = config.addr;
    tracing::debug!("Using daemon at {}", addr);

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(config, cli.json).await?;
        }
        Some(Commands::MacToIp { .. } | Commands::IpToMac { .. }) => unreachable!(), // Already handled above
        Some(Commands::Monitor) => {
            let mut client = Client::connect(config).await.map_err(|e| {
                eprintln!("{} to {}: {}", "Connection failed".red(), addr, e);
                e
            })?;

            client.connection().write_line("monitor").await?;
            eprintln!("{} to {}", "Monitoring".green(), addr.to_string().cyan());
            eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

            // Stream events until interrupted
            loop {
                tokio::select! {
                    message = client.next_event() => {
                        match message {
                            Ok(Message::EndOfBatch) => eprintln!("{}", "synced".dimmed()),
                            Ok(Message::Event(event)) => {
                                println!("{}", commands::format_event(&event, cli.json));
                            }
                            Err(e) => {
                                eprintln!("{}: {}", "Connection lost".red(), e);
                                std::process::exit(1);
                            }
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        eprintln!("\n{}", "Stopping monitor...".dimmed());
                        break;
                    }
                }
            }

            client.close().await?;
        }
        Some(cmd) => {
            // Connect for one-shot command
            let mut client = Client::connect(config).await.map_err(|e| {
                eprintln!("{} to {}: {}", "Connection failed".red(), addr, e);
                e
            })?;

            match commands::execute(&mut client, cmd, cli.json).await {
                Ok(output) => {
                    println!("{}", output);
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }

            client.close().await?;
        }
    }

    Ok(())
}
