//! Terminal output for command results.
//!
//! Results go to stdout. Progress lines and notices go to stderr so that the
//! output of `passage request` can be piped.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use passage_core::SessionRecord;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a progress line on stderr.
pub fn progress(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow().bold(), msg);
}

/// Print the parts of a session that are safe to show. Tokens never are.
pub fn session(record: &SessionRecord) {
    label("Email", &record.email);
    label("Role", &record.role);
}

fn label(name: &str, value: &str) {
    println!("{:<7}{}", format!("{}:", name).as_str().dimmed(), value);
}

/// Write `value` to stdout as JSON.
pub fn json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
