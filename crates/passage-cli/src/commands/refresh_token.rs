//! Refresh token command implementation.

use anyhow::{Result, bail};
use clap::Args;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(_args: RefreshTokenArgs, global: &GlobalArgs) -> Result<()> {
    let manager = session::manager(global)?;

    if !manager.is_authenticated().await {
        bail!("No active session. Run 'passage login' first.");
    }

    output::progress("Refreshing session...");

    manager
        .refresh()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to refresh session: {}", e.display_message()))?;

    output::success("Session refreshed successfully");

    Ok(())
}
