//! Session manager construction for CLI commands.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use passage_core::{ApiUrl, EntryPoint};
use passage_file::FileTokenStore;
use passage_http::{ClientConfig, SessionManager};

use crate::cli::GlobalArgs;
use crate::output;

/// Resolve the session file path, creating the default data directory if needed.
pub fn session_path(args: &GlobalArgs) -> Result<PathBuf> {
    if let Some(path) = &args.session_file {
        return Ok(path.clone());
    }

    let dirs =
        ProjectDirs::from("", "", "passage").context("Could not determine data directory")?;

    let data_dir = dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("session.json"))
}

/// Build a session manager over the file store.
///
/// A forced logout during a command is reported on stderr.
pub fn manager(args: &GlobalArgs) -> Result<SessionManager> {
    let api_url = ApiUrl::new(&args.api_url).context("Invalid API URL")?;
    let path = session_path(args)?;
    tracing::debug!(path = %path.display(), "Using session file");

    let mut config = ClientConfig::new(api_url)
        .with_user_agent(concat!("passage/", env!("PASSAGE_VERSION")));
    if let Some(secs) = args.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let store = Arc::new(FileTokenStore::new(path));
    let observer = Arc::new(|entry: EntryPoint| {
        output::warning(&format!(
            "Session expired. Run 'passage {}' or 'passage login' to continue.",
            entry
        ));
    });

    Ok(SessionManager::with_observer(config, store, observer))
}
