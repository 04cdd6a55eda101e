//! Register command implementation.

use anyhow::Result;
use clap::Args;

use passage_core::Registration;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password (at least 6 characters)
    #[arg(long, env = "PASSAGE_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long)]
    pub phone_number: Option<String>,

    #[arg(long)]
    pub avatar_url: Option<String>,
}

pub async fn run(args: RegisterArgs, global: &GlobalArgs) -> Result<()> {
    let manager = session::manager(global)?;

    let mut registration =
        Registration::new(args.first_name, args.last_name, args.email, args.password);
    if let Some(phone_number) = args.phone_number {
        registration = registration.with_phone_number(phone_number);
    }
    if let Some(avatar_url) = args.avatar_url {
        registration = registration.with_avatar_url(avatar_url);
    }

    output::progress("Creating account...");

    let record = manager
        .register(registration)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to register: {}", e.display_message()))?;

    output::success("Account created");
    println!();
    output::session(&record);

    Ok(())
}
