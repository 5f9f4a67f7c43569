//! Phase 2 (offline): review and sign a prepared descriptor.
//!
//! This binary performs no network I/O. Run it on the air-gapped machine
//! that holds `PRIVATE_KEY`.

use clap::Parser;
use cryptoheir_signer::config::SignEnv;
use cryptoheir_signer::descriptor;
use cryptoheir_signer::prelude::Result;
use cryptoheir_signer::signing::{self, Confirm, StdinConfirm};
use log::warn;
use std::path::PathBuf;

/// Sign a prepared CryptoHeir transaction with the local private key.
#[derive(Debug, Parser)]
#[command(name = "sign_transaction", version)]
struct Args {
    /// Unsigned descriptor produced by prepare_transaction
    input: PathBuf,

    /// Signed descriptor output
    #[arg(default_value = "signed-tx.json")]
    output: PathBuf,

    /// Approve every prompt without asking. Use with caution.
    #[arg(long)]
    skip_review: bool,
}

/// Auto-approves every gate; prints the review text so the operator still
/// sees what was signed.
struct SkipReview;

impl Confirm for SkipReview {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        println!("{prompt} [auto-approved]");
        Ok(true)
    }
}

fn run(args: Args) -> Result<()> {
    let unsigned = descriptor::load_unsigned(&args.input)?;
    let private_key = SignEnv::load().require_private_key()?;

    let mut stdin_confirm = StdinConfirm;
    let mut skip_confirm = SkipReview;
    let confirm: &mut dyn Confirm = if args.skip_review {
        warn!("⚠ skipping interactive review (--skip-review)");
        &mut skip_confirm
    } else {
        &mut stdin_confirm
    };

    match signing::sign_descriptor(&unsigned, &private_key, confirm)? {
        None => {
            println!("\n✗ Signing cancelled; no file written");
            Ok(())
        }
        Some(signed) => {
            descriptor::save_pretty(&args.output, &signed)?;
            println!("\n✓ Transaction signed");
            println!("  Output:   {}", args.output.display());
            println!("  TX hash:  {:?}", signed.tx_hash);
            if let Some(address) = signed.predicted_contract_address {
                println!("  Predicted contract address: {address:?}");
            }
            println!("\nNext: move {} to the online machine and run:", args.output.display());
            println!("  broadcast_transaction {}", args.output.display());
            Ok(())
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
