//! Key provisioning for the offline machine: generate or derive BIP-39
//! mnemonics. Run this on the air-gapped machine only.

use clap::{Parser, Subcommand};
use cryptoheir_signer::keys;
use cryptoheir_signer::prelude::{Error, Result};
use ethers::signers::Signer;
use std::io::{BufRead, Write};

#[derive(Debug, Parser)]
#[command(name = "mnemonic_tool", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a fresh BIP-39 mnemonic phrase
    Generate {
        /// Word count (12 or 24)
        #[arg(long, default_value_t = 24)]
        words: usize,

        /// Also print the first derived private key and address
        #[arg(long)]
        show_key: bool,
    },
    /// Derive the Ethereum account at m/44'/60'/0'/0/{index} from a phrase
    /// read on stdin
    Derive {
        /// Derivation index
        #[arg(long, default_value_t = 0)]
        index: u32,
    },
}

fn banner(title: &str) {
    println!("{}", "=".repeat(70));
    println!("  {title}");
    println!("{}", "=".repeat(70));
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Generate { words, show_key } => {
            let (phrase, wallet) = keys::generate_mnemonic(words)?;

            println!();
            banner(&format!("{words}-word mnemonic phrase (BIP-39)"));
            println!("\n{phrase}\n");
            println!("{}", "=".repeat(70));
            println!("\nWrite this phrase down and store it securely.");
            println!("Anyone holding it controls the derived accounts.");

            if show_key {
                println!("\nDerived account (m/44'/60'/0'/0/0):");
                println!("  Address:     {:?}", wallet.address());
                println!("  Private key: 0x{}", keys::private_key_hex(&wallet));
            }
            Ok(())
        }
        Command::Derive { index } => {
            println!("Enter your 12 or 24-word mnemonic phrase:");
            print!("> ");
            std::io::stdout()
                .flush()
                .map_err(|e| Error::FileIo(e.to_string()))?;

            let mut phrase = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut phrase)
                .map_err(|e| Error::FileIo(e.to_string()))?;

            let wallet = keys::derive_wallet(&phrase, index)?;

            println!();
            banner("Derived Ethereum account");
            println!("\nDerivation path: m/44'/60'/0'/0/{index}");
            println!("Address:         {:?}", wallet.address());
            println!("Private key:     0x{}", keys::private_key_hex(&wallet));
            println!("\nTo use it with the signer:");
            println!("  export PRIVATE_KEY=0x{}", keys::private_key_hex(&wallet));
            println!("  export SIGNER_ADDRESS={:?}", wallet.address());
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
