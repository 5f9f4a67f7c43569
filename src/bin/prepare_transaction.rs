//! Phase 1 (online): prepare an unsigned transaction descriptor.

use clap::Parser;
use cryptoheir_signer::config::PrepareEnv;
use cryptoheir_signer::contract::{CallParams, ContractArtifact, DEFAULT_ARTIFACT_PATH};
use cryptoheir_signer::descriptor;
use cryptoheir_signer::network;
use cryptoheir_signer::prelude::{Error, Result};
use cryptoheir_signer::prepare::{GasOverrides, TransactionBuilder};
use ethers::types::{Address, U256};
use ethers::utils::parse_units;
use std::path::PathBuf;

/// Prepare an unsigned CryptoHeir transaction by querying live chain state.
/// The output file is carried to the offline machine for signing.
#[derive(Debug, Parser)]
#[command(name = "prepare_transaction", version)]
struct Args {
    /// Prepare a contract deployment from the compiled artifact
    #[arg(long, conflicts_with = "call")]
    deploy: bool,

    /// Prepare a call to the named contract function
    #[arg(long, value_name = "FUNCTION")]
    call: Option<String>,

    /// Network name (default sepolia unless an RPC override is given)
    #[arg(long)]
    network: Option<String>,

    /// Explicit RPC endpoint, used verbatim (overrides --network)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Output descriptor file
    #[arg(short, long, default_value = "tx-params.json")]
    output: PathBuf,

    /// Compiled contract artifact (Foundry JSON)
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Gas limit override (skips estimation)
    #[arg(long, value_name = "GAS")]
    gas_limit: Option<String>,

    /// Legacy gas price override, in gwei
    #[arg(long, value_name = "GWEI")]
    gas_price: Option<String>,

    /// Max fee per gas override, in gwei
    #[arg(long, value_name = "GWEI")]
    max_fee: Option<String>,

    /// Max priority fee override, in gwei
    #[arg(long, value_name = "GWEI")]
    priority_fee: Option<String>,

    /// Deployed contract address (or set CONTRACT_ADDRESS)
    #[arg(long)]
    contract: Option<String>,

    /// Beneficiary address (deposit)
    #[arg(long)]
    beneficiary: Option<String>,

    /// Unix-timestamp deadline (deposit, extendDeadline)
    #[arg(long)]
    deadline: Option<u64>,

    /// Native amount in ETH (native deposit)
    #[arg(long)]
    value: Option<String>,

    /// Inheritance id (claim, reclaim, extendDeadline)
    #[arg(long)]
    inheritance_id: Option<String>,

    /// ERC-20 token address; omit or zero for native ETH (deposit)
    #[arg(long)]
    token: Option<String>,

    /// Token amount (ERC-20 deposit)
    #[arg(long)]
    amount: Option<String>,

    /// New fee collector address (transferFeeCollector)
    #[arg(long)]
    new_fee_collector: Option<String>,
}

fn parse_address(raw: &str, flag: &str) -> Result<Address> {
    raw.parse()
        .map_err(|e| Error::InvalidParameters(format!("--{flag} {raw}: {e}")))
}

fn parse_gwei(raw: &str, flag: &str) -> Result<U256> {
    let parsed = parse_units(raw, "gwei")
        .map_err(|e| Error::InvalidParameters(format!("--{flag} {raw}: {e}")))?;
    Ok(U256::from(parsed))
}

fn gas_overrides(args: &Args) -> Result<GasOverrides> {
    Ok(GasOverrides {
        gas_limit: args
            .gas_limit
            .as_deref()
            .map(|v| {
                U256::from_dec_str(v)
                    .map_err(|e| Error::InvalidParameters(format!("--gas-limit {v}: {e}")))
            })
            .transpose()?,
        gas_price: args
            .gas_price
            .as_deref()
            .map(|v| parse_gwei(v, "gas-price"))
            .transpose()?,
        max_fee_per_gas: args
            .max_fee
            .as_deref()
            .map(|v| parse_gwei(v, "max-fee"))
            .transpose()?,
        max_priority_fee_per_gas: args
            .priority_fee
            .as_deref()
            .map(|v| parse_gwei(v, "priority-fee"))
            .transpose()?,
    })
}

fn call_params(args: &Args) -> Result<CallParams> {
    Ok(CallParams {
        beneficiary: args
            .beneficiary
            .as_deref()
            .map(|v| parse_address(v, "beneficiary"))
            .transpose()?,
        deadline: args.deadline,
        value: args.value.clone(),
        inheritance_id: args
            .inheritance_id
            .as_deref()
            .map(|v| {
                U256::from_dec_str(v)
                    .map_err(|e| Error::InvalidParameters(format!("--inheritance-id {v}: {e}")))
            })
            .transpose()?,
        token: args
            .token
            .as_deref()
            .map(|v| parse_address(v, "token"))
            .transpose()?,
        amount: args.amount.clone(),
        new_fee_collector: args
            .new_fee_collector
            .as_deref()
            .map(|v| parse_address(v, "new-fee-collector"))
            .transpose()?,
    })
}

async fn run(args: Args) -> Result<()> {
    if !args.deploy && args.call.is_none() {
        return Err(Error::InvalidParameters(
            "choose a mode: --deploy or --call <function>".to_string(),
        ));
    }

    let env = PrepareEnv::load()?;
    let signer_address = env.require_signer_address()?;

    let rpc_override = args.rpc_url.clone().or_else(|| env.rpc_url.clone());
    let rpc_url = match &rpc_override {
        Some(url) => url.clone(),
        None => network::rpc_url(
            Some(args.network.as_deref().unwrap_or("sepolia")),
            None,
            env.api_key.as_deref(),
        )?,
    };
    let network_label = args.network.clone().unwrap_or_else(|| {
        if rpc_override.is_some() {
            "custom".to_string()
        } else {
            "sepolia".to_string()
        }
    });

    let artifact_path = args
        .artifact
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_PATH));
    let artifact = ContractArtifact::load(&artifact_path)?;

    let builder =
        TransactionBuilder::new(None, &rpc_url, Some(network_label), signer_address).await?;
    let overrides = gas_overrides(&args)?;

    let unsigned = if args.deploy {
        builder.prepare_deployment(&artifact, &overrides).await?
    } else {
        let function = args.call.clone().expect("mode checked above");
        let contract_address = match &args.contract {
            Some(raw) => parse_address(raw, "contract")?,
            None => env.contract_address.ok_or_else(|| {
                Error::MissingConfiguration(
                    "contract address required: pass --contract or set CONTRACT_ADDRESS"
                        .to_string(),
                )
            })?,
        };
        let params = call_params(&args)?;
        builder
            .prepare_call(contract_address, &function, &params, &artifact, &overrides)
            .await?
    };

    descriptor::save_pretty(&args.output, &unsigned)?;

    println!("\n✓ Transaction prepared");
    println!("  Output:    {}", args.output.display());
    println!(
        "  Network:   {} (chain ID {})",
        unsigned.metadata.network.name, unsigned.metadata.network.chain_id
    );
    println!("  Nonce:     {}", unsigned.transaction.nonce);
    println!("  Max cost:  {}", unsigned.metadata.estimated_cost);
    println!("\nNext: move {} to the offline machine and run:", args.output.display());
    println!("  sign_transaction {}", args.output.display());

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
