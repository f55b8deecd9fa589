use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coinfile-cli")]
#[command(about = "Operator CLI for a coinfile server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Server and RPC health
    Health,
    /// Newest public files
    Explorer,
    /// Files, usage and tier for a wallet
    Files {
        #[arg(short, long)]
        wallet: String,
    },
    /// Look up a file by short id or id
    File { id: String },
    /// Upload a file
    Upload {
        path: PathBuf,
        #[arg(short, long)]
        wallet: Option<String>,
        /// Store on chain; requires a confirmed payment signature
        #[arg(long, requires = "tx_signature")]
        onchain: bool,
        #[arg(long)]
        tx_signature: Option<String>,
    },
    /// Ask the server to look for a payment
    CheckPayment {
        /// Expected amount in SOL
        #[arg(short, long)]
        amount: f64,
        #[arg(short, long)]
        wallet: Option<String>,
        #[arg(short, long)]
        payment_id: Option<String>,
    },
    /// Newest payment ledger entries and what they were spent on
    Payments {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete a file you own
    Delete {
        id: String,
        #[arg(short, long)]
        wallet: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');
    let api = format!("{base}/api");

    let res = match cli.command {
        Commands::Health => client.get(format!("{base}/health")).send().await?,
        Commands::Explorer => client.get(format!("{api}/explorer")).send().await?,
        Commands::Files { wallet } => {
            client
                .get(format!("{api}/files"))
                .query(&[("wallet", wallet)])
                .send()
                .await?
        }
        Commands::File { id } => client.get(format!("{api}/f/{id}")).send().await?,
        Commands::Upload {
            path,
            wallet,
            onchain,
            tx_signature,
        } => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            let bytes = tokio::fs::read(&path).await?;
            let mut form = Form::new()
                .part("file", Part::bytes(bytes).file_name(file_name))
                .text("storageType", if onchain { "onchain" } else { "cloud" });
            if let Some(wallet) = wallet {
                form = form.text("wallet", wallet);
            }
            if let Some(sig) = tx_signature {
                form = form.text("txSignature", sig);
            }
            client.post(format!("{api}/upload")).multipart(form).send().await?
        }
        Commands::CheckPayment {
            amount,
            wallet,
            payment_id,
        } => {
            client
                .post(format!("{api}/check-payment"))
                .json(&json!({
                    "expectedAmount": amount,
                    "wallet": wallet,
                    "paymentId": payment_id,
                }))
                .send()
                .await?
        }
        Commands::Payments { limit } => {
            client
                .get(format!("{api}/payments/recent"))
                .query(&[("limit", limit)])
                .send()
                .await?
        }
        Commands::Delete { id, wallet } => {
            client
                .delete(format!("{api}/file/{id}"))
                .query(&[("wallet", wallet)])
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
