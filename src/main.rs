//! Unified destiny-rs CLI.
//!
//! - `destiny-rs server` - Run the HTTP service
//! - `destiny-rs cleanup` - Run image cleanup and the usage sweep once
//!
//! The server can also be run as the standalone `destiny-server` binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Destiny-rs unified CLI.
#[derive(Parser)]
#[command(
    name = "destiny-rs",
    version,
    about = "Daily-limited destiny match service",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    #[command(name = "server", alias = "serve")]
    Server(Box<destiny_server::ServerArgs>),

    /// Remove expired images and usage records, then exit.
    #[command(name = "cleanup")]
    Cleanup(Box<destiny_server::CleanupArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => destiny_server::cli::run(*args).await,
        Commands::Cleanup(args) => destiny_server::cli::run_cleanup(*args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
