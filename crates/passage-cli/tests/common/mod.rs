use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI against `api_url` with an isolated session file.
pub fn run_cli_with_env(args: &[&str], session_file: &Path, api_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_passage"));
    cmd.args(args);
    cmd.env("PASSAGE_SESSION_FILE", session_file);
    cmd.env("PASSAGE_API_URL", api_url);
    cmd.env_remove("PASSAGE_PASSWORD");
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI with an isolated session file and expect success.
pub fn run_cli_with_env_success(args: &[&str], session_file: &Path, api_url: &str) -> String {
    let output = run_cli_with_env(args, session_file, api_url);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}
