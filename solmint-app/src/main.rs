//! Solmint CLI
//!
//! Command-line front end for the devnet token client: attach a wallet,
//! check balances, create and mint a token, send it, and page through
//! recent transaction signatures.

mod state;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solmint::chain::{ChainConfig, SignatureRecord};
use solmint::orchestrator::OperationStatus;
use solmint::provider::{KeypairProvider, WalletProvider};
use solmint::token::{MINT_AMOUNT, SEND_AMOUNT};
use solmint_solana::RpcChainClient;

use crate::state::{spawn_event_listener, AppState};

const WALLET_PROMPT: &str = "No wallet attached. Pass --keypair <path> pointing at a Solana JSON \
keypair file (create one with `solana-keygen new`).";

#[derive(Parser)]
#[command(name = "solmint")]
#[command(about = "Devnet SPL token client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the wallet keypair file (JSON byte array)
    #[arg(short, long)]
    keypair: Option<PathBuf>,

    /// RPC endpoint override
    #[arg(long)]
    rpc_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (the default)
    Session,
    /// Connect and show the account's native balance
    Balance,
    /// List the most recent transaction signatures
    History,
    /// Request a 1 SOL devnet airdrop
    Airdrop,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| if cli.verbose { "debug" } else { "warn" }.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // No wallet extension equivalent installed: prompt and stop before any
    // gateway is even constructed
    let Some(keypair_path) = cli.keypair else {
        println!("{}", WALLET_PROMPT);
        return Ok(());
    };

    let provider: Arc<dyn WalletProvider> = Arc::new(KeypairProvider::from_file(&keypair_path)?);
    let config = match cli.rpc_url {
        Some(url) => ChainConfig { url, timeout: Some(30) },
        None => ChainConfig::from_env(),
    };
    println!("Using RPC endpoint {}", config.url);

    let client = Arc::new(RpcChainClient::new(config));
    let state = Arc::new(AppState::new(provider, client));
    let _events = spawn_event_listener(Arc::clone(&state));

    match cli.command.unwrap_or(Commands::Session) {
        Commands::Session => run_session(state).await,
        Commands::Balance => {
            let info = state.connect().await?;
            println!("{}", info);
            Ok(())
        }
        Commands::History => {
            state.connect().await?;
            let records = state.history().await?;
            print_history(&records);
            Ok(())
        }
        Commands::Airdrop => {
            let info = state.connect().await?;
            let signature = state.airdrop().await?;
            println!("Airdrop requested for {}: {}", info.account, signature);
            Ok(())
        }
    }
}

/// The interactive "page": one command per button, a status banner, and
/// token actions gated on a created token
async fn run_session(state: Arc<AppState>) -> anyhow::Result<()> {
    println!("solmint interactive session. Type `help` for commands, `quit` to exit.");
    let _banner = spawn_banner(Arc::clone(&state));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"solmint> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");

        let outcome = match command {
            "" => Ok(()),
            "help" => {
                print_help();
                Ok(())
            }
            "connect" => state.connect().await.map(|info| println!("{}", info)),
            "disconnect" => state.disconnect().await.map(|message| println!("{}", message)),
            "status" => {
                print_status(&state);
                Ok(())
            }
            "airdrop" => state.airdrop().await.map(|signature| {
                println!("Airdrop requested: {}", signature);
            }),
            "create" => state.create_token().await.map(|handle| {
                println!("Created {} (holding account {})", handle, handle.holding_account);
            }),
            "mint" => state.mint().await.map(|signature| {
                println!("Minted {} tokens: {}", MINT_AMOUNT, signature);
            }),
            "balance" => state.token_balance().await.map(|balance| {
                println!("Token balance: {}", balance);
            }),
            "supply" => state.token_supply().await.map(|supply| {
                println!("Token supply: {}", supply);
            }),
            "send" => match parts.next() {
                Some(destination) => state.send(destination).await.map(|signature| {
                    println!("Sent {} tokens: {}", SEND_AMOUNT, signature);
                }),
                None => {
                    println!("usage: send <recipient-address>");
                    Ok(())
                }
            },
            "history" => state.history().await.map(|records| print_history(&records)),
            "quit" | "exit" => break,
            other => {
                println!("unknown command: {} (try `help`)", other);
                Ok(())
            }
        };

        // Modal-scoped error line; the banner shows the same failure
        if let Err(e) = outcome {
            println!("error: {}", e);
        }
    }

    Ok(())
}

/// Render orchestrator status transitions as a transient banner
fn spawn_banner(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let mut status = state.orchestrator.subscribe();

    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            match current {
                OperationStatus::Idle => {}
                OperationStatus::Running => println!("[..] working"),
                OperationStatus::Succeeded(message) => println!("[ok] {}", message),
                OperationStatus::Failed(message) => println!("[!!] {}", message),
            }
        }
    })
}

fn print_help() {
    println!("commands:");
    println!("  connect               attach the wallet and show the SOL balance");
    println!("  disconnect            detach the wallet");
    println!("  status                show session state");
    println!("  airdrop               request a 1 SOL devnet airdrop");
    println!("  create                create a new token and holding account");
    println!("  mint                  mint {} tokens (requires a created token)", MINT_AMOUNT);
    println!("  balance               show the token balance");
    println!("  supply                show the token's total supply");
    println!("  send <address>        send {} tokens to an address", SEND_AMOUNT);
    println!("  history               show the 5 most recent transactions");
    println!("  quit                  exit");
}

fn print_status(state: &AppState) {
    let session = state.session();
    if !session.connected {
        println!("wallet: disconnected");
        return;
    }

    match session.account {
        Some(account) => println!("wallet: connected as {}", account),
        None => println!("wallet: connected"),
    }
    println!("native balance: {:.4} SOL", session.balance_sol());

    match state.token() {
        Some(handle) => println!("token: {}", handle.mint),
        None => println!("token: none created this session"),
    }
}

fn print_history(records: &[SignatureRecord]) {
    if records.is_empty() {
        println!("no transactions found");
        return;
    }

    for record in records {
        let timestamp = record
            .block_time
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown time".to_string());

        let status = match &record.err {
            Some(_) => "failed",
            None => "ok",
        };

        println!(
            "  {}  {}  slot {}  [{}]",
            truncate_signature(&record.signature),
            timestamp,
            record.slot,
            status
        );
    }
}

/// Shorten a signature for display, keeping both ends
fn truncate_signature(signature: &str) -> String {
    if signature.len() <= 20 {
        return signature.to_string();
    }
    format!("{}..{}", &signature[..8], &signature[signature.len() - 8..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_signature() {
        let long = "5VERYLONGSIGNATURExxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";
        let truncated = truncate_signature(long);
        assert_eq!(truncated.len(), 18);
        assert!(truncated.starts_with("5VERYLON"));
        assert!(truncated.ends_with("xxxxxxxx"));

        assert_eq!(truncate_signature("short"), "short");
    }
}
