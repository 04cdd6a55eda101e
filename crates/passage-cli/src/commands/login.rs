//! Login command implementation.

use anyhow::Result;
use clap::Args;

use passage_core::Credentials;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "PASSAGE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, global: &GlobalArgs) -> Result<()> {
    let manager = session::manager(global)?;
    let credentials = Credentials::new(args.email, args.password);

    output::progress("Logging in...");

    let record = manager
        .login(credentials)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to login: {}", e.display_message()))?;

    output::success("Logged in successfully");
    println!();
    output::session(&record);

    Ok(())
}
