use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction to the pending buffer
    Submit {
        /// Sender
        #[arg(long)]
        sender: String,
        /// Recipient
        #[arg(long)]
        recipient: String,
        /// Amount (may be negative)
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
        /// Opaque signature string
        #[arg(long)]
        signature: Option<String>,
        /// Metadata as a JSON object, e.g. '{"memo":"rent"}'
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Mine the pending transactions into a new block
    Mine {
        /// Validator credited with the block
        #[arg(long)]
        validator: String,
    },
    /// Show node and chain status
    Status,
    /// Show the net balance of an address
    Balance { address: String },
    /// Validate the whole chain
    Validate,
    /// Show the latest block
    Latest,
}

#[derive(Serialize)]
struct TxOut {
    sender: String,
    recipient: String,
    amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

impl Command {
    /// Method, path and optional JSON body for the node request.
    fn request(&self) -> Result<(Method, String, Option<Value>)> {
        let req = match self {
            Command::Submit {
                sender,
                recipient,
                amount,
                signature,
                metadata,
            } => {
                let metadata = metadata
                    .as_deref()
                    .map(serde_json::from_str::<Value>)
                    .transpose()
                    .context("--metadata must be valid JSON")?;
                if metadata.as_ref().is_some_and(|m| !m.is_object()) {
                    anyhow::bail!("--metadata must be a JSON object");
                }
                let tx = TxOut {
                    sender: sender.clone(),
                    recipient: recipient.clone(),
                    amount: *amount,
                    signature: signature.clone(),
                    metadata,
                };
                (
                    Method::POST,
                    "/transactions".to_string(),
                    Some(serde_json::to_value(tx)?),
                )
            }
            Command::Mine { validator } => (
                Method::POST,
                "/mine".to_string(),
                Some(serde_json::json!({ "validator": validator })),
            ),
            Command::Status => (Method::GET, "/status".to_string(), None),
            Command::Balance { address } => (Method::GET, format!("/balance/{address}"), None),
            Command::Validate => (Method::GET, "/chain/validate".to_string(), None),
            Command::Latest => (Method::GET, "/blocks/latest".to_string(), None),
        };
        Ok(req)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let (method, path, body) = cli.cmd.request()?;
    let url = format!("{}{path}", cli.node.trim_end_matches('/'));
    debug!(%method, %url, "sending request");

    let client = reqwest::Client::new();
    let mut req = client.request(method, &url);
    if let Some(body) = &body {
        req = req.json(body);
    }
    let res = req.send().await.with_context(|| format!("request to {url} failed"))?;
    let status = res.status();
    let text = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}
