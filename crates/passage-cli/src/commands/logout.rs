//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, global: &GlobalArgs) -> Result<()> {
    let manager = session::manager(global)?;

    manager
        .logout()
        .await
        .context("Failed to clear session")?;

    output::success("Logged out");

    Ok(())
}
