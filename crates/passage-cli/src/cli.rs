//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::{login, logout, refresh_token, register, request, whoami};

/// Log in to a token-authenticated API and call it.
#[derive(Parser, Debug)]
#[command(name = "passage")]
#[command(author, version = env!("PASSAGE_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Base URL of the API
    #[arg(
        long,
        env = "PASSAGE_API_URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    pub api_url: String,

    /// Session file (defaults to the platform data directory)
    #[arg(long, env = "PASSAGE_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "PASSAGE_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with email and password
    Login(login::LoginArgs),

    /// Create an account and log in to it
    Register(register::RegisterArgs),

    /// End the session
    Logout(logout::LogoutArgs),

    /// Display the stored session
    Whoami(whoami::WhoamiArgs),

    /// Refresh the session tokens
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// Send an authenticated request
    Request(request::RequestArgs),
}
