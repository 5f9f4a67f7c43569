//! Phase 3 (online): broadcast a signed descriptor and record the receipt.

use clap::Parser;
use cryptoheir_signer::broadcast::{BroadcastConfig, BroadcastOutcome, Broadcaster};
use cryptoheir_signer::config::BroadcastEnv;
use cryptoheir_signer::descriptor::{self, ReceiptStatus};
use cryptoheir_signer::prelude::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Broadcast a signed CryptoHeir transaction. Idempotent: a transaction the
/// chain already knows is reported, never re-submitted.
#[derive(Debug, Parser)]
#[command(name = "broadcast_transaction", version)]
struct Args {
    /// Signed descriptor produced by sign_transaction
    input: PathBuf,

    /// Receipt output file (default: <input stem>-receipt.json)
    #[arg(long)]
    receipt: Option<PathBuf>,

    /// Explicit RPC endpoint; only honored when the descriptor embeds no
    /// resolvable network name
    #[arg(long)]
    rpc_url: Option<String>,

    /// How long to wait for confirmation before reporting the transaction
    /// as pending
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

fn default_receipt_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("signed-tx");
    input.with_file_name(format!("{stem}-receipt.json"))
}

fn print_receipt(receipt: &cryptoheir_signer::Receipt) {
    println!("  Block:    {}", receipt.block_number);
    println!("  Gas used: {}", receipt.gas_used);
    match receipt.status {
        ReceiptStatus::Success => println!("  Status:   success"),
        ReceiptStatus::Failed => {
            println!("  Status:   FAILED — the transaction reverted; check a block explorer")
        }
    }
    if let Some(address) = receipt.contract_address {
        println!("  Contract deployed at: {address:?}");
    }
}

async fn run(args: Args) -> Result<()> {
    let signed = descriptor::load_signed(&args.input)?;
    let env = BroadcastEnv::load();

    let config = BroadcastConfig {
        rpc_url_override: args.rpc_url.clone().or(env.rpc_url),
        api_key: env.api_key,
        confirmation_timeout: Duration::from_secs(args.timeout_secs),
        poll_interval: Duration::from_secs(5),
    };

    println!("Broadcasting {:?}", signed.tx_hash);
    let broadcaster = Broadcaster::connect(config, &signed)?;

    let receipt_path = args
        .receipt
        .clone()
        .unwrap_or_else(|| default_receipt_path(&args.input));

    match broadcaster.broadcast(&signed).await? {
        BroadcastOutcome::Confirmed(receipt) => {
            println!("\n✓ Transaction confirmed");
            print_receipt(&receipt);
            if let (Some(predicted), Some(actual)) =
                (signed.predicted_contract_address, receipt.contract_address)
            {
                if predicted != actual {
                    println!("  ⚠ deployed address differs from predicted {predicted:?}");
                }
            }
            descriptor::save_pretty(&receipt_path, &receipt)?;
            println!("\nReceipt saved to {}", receipt_path.display());
        }
        BroadcastOutcome::AlreadyBroadcast { pending, receipt } => {
            println!("\n⚠ Transaction already broadcast; nothing was submitted");
            if pending {
                println!("  Status:   pending confirmation");
            } else if let Some(receipt) = &receipt {
                match receipt.status {
                    ReceiptStatus::Success => println!("  Already confirmed, status success"),
                    ReceiptStatus::Failed => println!("  Already confirmed, status failed"),
                }
                print_receipt(receipt);
                descriptor::save_pretty(&receipt_path, receipt)?;
                println!("\nReceipt saved to {}", receipt_path.display());
            }
        }
        BroadcastOutcome::Pending { tx_hash } => {
            println!(
                "\n⚠ Transaction {tx_hash:?} was submitted but not confirmed within {}s",
                args.timeout_secs
            );
            println!("  It may still be mined; re-run this command to check its status.");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
