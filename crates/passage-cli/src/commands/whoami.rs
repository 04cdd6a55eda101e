//! Whoami command implementation.

use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the session as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct WhoamiOutput<'a> {
    email: &'a str,
    role: &'a str,
    entry_point: String,
}

pub async fn run(args: WhoamiArgs, global: &GlobalArgs) -> Result<()> {
    let manager = session::manager(global)?;

    let Some(record) = manager.current().await else {
        bail!("No active session. Run 'passage login' first.");
    };

    if args.json {
        return output::json(
            &WhoamiOutput {
                email: &record.email,
                role: &record.role,
                entry_point: manager.entry_point().await.to_string(),
            },
            false,
        );
    }

    output::session(&record);

    Ok(())
}
