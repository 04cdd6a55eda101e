//! Authenticated request command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use passage_http::{ApiRequest, Method};

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path relative to the API URL, e.g. /users/me
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", value_name = "KEY=VALUE")]
    pub query: Vec<String>,

    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,

    /// Print the whole response envelope instead of its data
    #[arg(long)]
    pub envelope: bool,
}

pub async fn run(args: RequestArgs, global: &GlobalArgs) -> Result<()> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;

    let mut request = ApiRequest::new(method, args.path);
    for pair in &args.query {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid query parameter '{}', expected KEY=VALUE", pair);
        };
        request = request.query(key, value);
    }
    if let Some(data) = &args.data {
        let body: serde_json::Value = serde_json::from_str(data).context("Invalid JSON body")?;
        request = request.json(body);
    }

    let manager = session::manager(global)?;
    let envelope = manager
        .client()
        .send(&request)
        .await
        .map_err(|e| anyhow::anyhow!("Request failed: {}", e.display_message()))?;

    if args.envelope {
        output::json(&envelope, true)
    } else {
        output::json(&envelope.data, true)
    }
}
