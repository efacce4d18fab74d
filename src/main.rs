//! Unified netes-rs CLI.
//!
//! This binary provides a unified interface to all netes components:
//! - `netes-rs server` - Run the multi-tenant proxy
//! - `netes-rs check` - Validate a configuration and print the effective values
//!
//! The server can also be run as the standalone `netes-server` binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// netes-rs unified CLI.
#[derive(Parser)]
#[command(
    name = "netes-rs",
    version,
    about = "Multi-tenant control-plane proxy with relay-tunneled embedded backends",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy server.
    #[command(name = "server", alias = "serve")]
    Server(Box<netes_server::cli::ServerArgs>),

    /// Validate configuration and print the effective result.
    #[command(name = "check")]
    Check(Box<netes_server::cli::ServerArgs>),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => netes_server::cli::run(*args).await,
        Commands::Check(args) => netes_rs::check_config(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
