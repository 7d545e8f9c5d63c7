//! Unified vless-rs CLI.
//!
//! - `vless-rs server` - Run the relay server
//! - `vless-rs links` - Print the base64 subscription for the configured identity
//!
//! The server can also be run as the standalone `vless-server` binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// vless-rs unified CLI.
#[derive(Parser)]
#[command(
    name = "vless-rs",
    version,
    about = "VLESS over WebSocket relay",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server.
    #[command(name = "server", alias = "serve")]
    Server(Box<vless_server::ServerArgs>),

    /// Print share links as a base64 subscription.
    #[command(name = "links")]
    Links(Box<vless_server::LinksArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => vless_server::cli::run(*args).await,
        Commands::Links(args) => vless_server::cli::links(*args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
