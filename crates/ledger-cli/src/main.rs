use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node")]
struct Cli {
    /// Node base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:2345")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transfer and wait for its block
    Submit {
        /// Sender
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Print the full chain
    Blocks,
    /// Print the chain tip
    Head,
    /// Print known peers
    Peers,
    /// Print every balance
    Balances,
    /// Create a new address
    Account {
        #[arg(long)]
        password: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tx {
    from_address: String,
    to_address: String,
    amount: u64,
}

#[derive(Serialize)]
struct NewAccount {
    password: String,
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();
    let res = match cli.cmd {
        Command::Submit { from, to, amount } => {
            let tx = Tx {
                from_address: from,
                to_address: to,
                amount,
            };
            client
                .post(format!("{node}/transactions"))
                .json(&tx)
                .send()
                .await?
        }
        Command::Blocks => client.get(format!("{node}/blocks")).send().await?,
        Command::Head => client.get(format!("{node}/chain/head")).send().await?,
        Command::Peers => client.get(format!("{node}/peers")).send().await?,
        Command::Balances => client.get(format!("{node}/account")).send().await?,
        Command::Account { password } => {
            client
                .post(format!("{node}/account"))
                .json(&NewAccount { password })
                .send()
                .await?
        }
    };
    debug!(url = %res.url(), "response received");
    print_response(res).await
}
