//! Command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use dispatch::{ApiResult, Dispatcher, RequestConfig};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "courier", version, about = "Issue requests against the backend API with retries and a uniform result")]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./courier.toml when present).
    #[arg(long, short, global = true, env = "COURIER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// GET a path.
    Get(CallArgs),
    /// POST a JSON body to a path.
    Post(BodyArgs),
    /// PUT a JSON body to a path.
    Put(BodyArgs),
    /// DELETE a path.
    Delete(CallArgs),
    /// Dispatch by method name (GET, POST, PUT, DELETE).
    Request {
        method: String,
        #[command(flatten)]
        args: BodyArgs,
    },
    /// GET /health.
    Health,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Path relative to the configured base URL, e.g. `/employees/search`.
    pub path: String,

    /// Query parameter as `name=value`; repeatable.
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_pair)]
    pub params: Vec<(String, String)>,

    /// Request header as `name=value`; repeatable.
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_pair)]
    pub headers: Vec<(String, String)>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Attempts after the first.
    #[arg(long)]
    pub retries: Option<u32>,

    /// Back-off step in milliseconds.
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct BodyArgs {
    #[command(flatten)]
    pub call: CallArgs,

    /// JSON request body.
    #[arg(long, value_parser = parse_json)]
    pub body: Option<Value>,
}

impl CallArgs {
    pub fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::new();
        for (name, value) in &self.headers {
            config = config.header(name, value);
        }
        for (name, value) in &self.params {
            config = config.param(name, value);
        }
        config.timeout = self.timeout_ms.map(Duration::from_millis);
        config.retries = self.retries;
        config.retry_delay = self.retry_delay_ms.map(Duration::from_millis);
        config
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))
}

/// Runs one command and returns its normalized result.
pub async fn execute(dispatcher: &Dispatcher, command: Command) -> ApiResult<Value> {
    match command {
        Command::Get(args) => dispatcher.get(&args.path, Some(&args.request_config())).await,
        Command::Delete(args) => {
            dispatcher
                .delete(&args.path, Some(&args.request_config()))
                .await
        }
        Command::Post(args) => {
            dispatcher
                .post(&args.call.path, args.body.as_ref(), Some(&args.call.request_config()))
                .await
        }
        Command::Put(args) => {
            dispatcher
                .put(&args.call.path, args.body.as_ref(), Some(&args.call.request_config()))
                .await
        }
        Command::Request { method, args } => {
            let config = args.call.request_config();
            dispatcher
                .request(&method, &args.call.path, args.body, Some(&config))
                .await
        }
        Command::Health => dispatcher.health().await,
    }
}
