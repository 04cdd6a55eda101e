//! passage - CLI tool for a token-authenticated API.
//!
//! A thin wrapper over `passage-http`: log in or register, inspect the stored
//! session, and send authenticated requests that refresh the access token
//! transparently.

mod cli;
mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{login, logout, refresh_token, register, request, whoami};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output only
    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Login(args) => login::run(args, &cli.global).await,
        Commands::Register(args) => register::run(args, &cli.global).await,
        Commands::Logout(args) => logout::run(args, &cli.global).await,
        Commands::Whoami(args) => whoami::run(args, &cli.global).await,
        Commands::RefreshToken(args) => refresh_token::run(args, &cli.global).await,
        Commands::Request(args) => request::run(args, &cli.global).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
