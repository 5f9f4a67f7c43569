//! Online phase 3: submit a signed descriptor and persist a receipt.
//!
//! The endpoint is re-derived from the network metadata embedded in the
//! descriptor, never from operator flags, so a broadcast is reproducible from
//! the file alone. Submission is idempotent: a hash the chain already knows
//! is reported, not re-sent.

use crate::descriptor::{NetworkMeta, Receipt, ReceiptStatus, SignedDescriptor, TxMode};
use crate::network::chains;
use crate::network::client::{ChainClient, TxStatus};
use crate::prelude::{Error, Result};
use ethers::providers::{Http, JsonRpcClient};
use ethers::types::{Address, H256, U256};
use log::{info, warn};
use std::time::Duration;

/// Broadcast-phase settings. Deliberately no field that could hold key
/// material: this phase can prove it never touches the signing key.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Used only when the descriptor embeds no network name.
    pub rpc_url_override: Option<String>,
    pub api_key: Option<String>,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            rpc_url_override: None,
            api_key: None,
            confirmation_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Terminal outcome of one broadcast invocation. None of these are errors:
/// even `Pending` means the submission stands and the operator just has to
/// check back later.
#[derive(Debug, Clone)]
pub enum BroadcastOutcome {
    /// Submitted (by us) and mined within the confirmation window.
    Confirmed(Receipt),
    /// The chain already knew this hash; nothing was submitted.
    AlreadyBroadcast {
        pending: bool,
        receipt: Option<Receipt>,
    },
    /// Submitted but still unmined when the confirmation window closed.
    Pending { tx_hash: H256 },
}

/// Pick the endpoint for a signed descriptor. The embedded network name is
/// authoritative; the override applies only when no name is embedded, and a
/// resolution failure for a named network is reported rather than papered
/// over.
pub fn resolve_endpoint(config: &BroadcastConfig, network: &NetworkMeta) -> Result<String> {
    if network.name.is_empty() || network.name == "custom" {
        return config.rpc_url_override.clone().ok_or_else(|| {
            Error::NoRpcConfiguration(
                "descriptor embeds no resolvable network name; pass an explicit RPC URL"
                    .to_string(),
            )
        });
    }
    chains::rpc_url(Some(&network.name), None, config.api_key.as_deref())
}

/// Map a node rejection message onto the named submission failures. Nothing
/// here is retried; the classification only sharpens the operator message.
pub fn classify_send_error(message: &str) -> Error {
    let lower = message.to_ascii_lowercase();
    if lower.contains("nonce too low") || lower.contains("nonce has already been used") {
        Error::NonceExpired(message.to_string())
    } else if lower.contains("replacement transaction underpriced") {
        Error::ReplacementUnderpriced(message.to_string())
    } else if lower.contains("insufficient funds") {
        Error::InsufficientFunds(message.to_string())
    } else {
        Error::RpcRequest(message.to_string())
    }
}

/// Build the terminal receipt record from chain results.
pub fn assemble_receipt(
    signed: &SignedDescriptor,
    block_number: u64,
    gas_used: U256,
    success: bool,
    deployed_at: Option<Address>,
) -> Receipt {
    Receipt {
        mode: signed.mode,
        function_name: signed.function_name.clone(),
        transaction_hash: signed.tx_hash,
        from: signed.from,
        to: signed.to,
        contract_address: if success && matches!(signed.mode, TxMode::Deploy) {
            deployed_at
        } else {
            None
        },
        block_number,
        gas_used,
        status: if success {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Failed
        },
        timestamp: crate::descriptor::now_rfc3339(),
        network: signed.metadata.network.clone(),
    }
}

pub struct Broadcaster<P = Http> {
    client: ChainClient<P>,
    config: BroadcastConfig,
}

impl Broadcaster<Http> {
    pub fn connect(config: BroadcastConfig, signed: &SignedDescriptor) -> Result<Self> {
        let endpoint = resolve_endpoint(&config, &signed.metadata.network)?;
        info!(
            "broadcasting via network {} (chain ID {})",
            signed.metadata.network.name, signed.metadata.network.chain_id
        );
        Ok(Self {
            client: ChainClient::new(&endpoint, None)?,
            config,
        })
    }
}

impl<P: JsonRpcClient> Broadcaster<P> {
    /// Build a broadcaster over an existing client (mocked in tests).
    pub fn with_client(client: ChainClient<P>, config: BroadcastConfig) -> Self {
        Self { client, config }
    }

    pub async fn broadcast(&self, signed: &SignedDescriptor) -> Result<BroadcastOutcome> {
        if !signed.metadata.signed {
            return Err(Error::MalformedDescriptor(
                "metadata.signed is not true; this file did not come out of the sign phase"
                    .to_string(),
            ));
        }

        let live_chain_id = self.client.chain_id().await?;
        if live_chain_id != signed.chain_id {
            return Err(Error::ChainIdMismatch(format!(
                "descriptor is for chain {} but the endpoint reports chain {live_chain_id}",
                signed.chain_id
            )));
        }
        info!("chain ID verified: {live_chain_id}");

        match self.client.transaction_status(signed.tx_hash).await? {
            TxStatus::Pending => {
                warn!("transaction {:?} is already in flight", signed.tx_hash);
                return Ok(BroadcastOutcome::AlreadyBroadcast {
                    pending: true,
                    receipt: None,
                });
            }
            TxStatus::Mined => {
                warn!("transaction {:?} was already mined", signed.tx_hash);
                let receipt = self
                    .client
                    .receipt(signed.tx_hash)
                    .await?
                    .map(|r| self.receipt_from_chain(signed, &r));
                return Ok(BroadcastOutcome::AlreadyBroadcast {
                    pending: false,
                    receipt,
                });
            }
            TxStatus::Unknown => {}
        }

        info!("submitting raw transaction {:?}", signed.tx_hash);
        let returned_hash = match self.client.send_raw(signed.signed_transaction.clone()).await {
            Ok(hash) => hash,
            Err(Error::RpcRequest(message)) => return Err(classify_send_error(&message)),
            Err(other) => return Err(other),
        };
        if returned_hash != signed.tx_hash {
            warn!(
                "node returned hash {returned_hash:?}, descriptor precomputed {:?}",
                signed.tx_hash
            );
        }

        match self
            .client
            .wait_for_receipt(
                signed.tx_hash,
                self.config.confirmation_timeout,
                self.config.poll_interval,
            )
            .await?
        {
            Some(chain_receipt) => Ok(BroadcastOutcome::Confirmed(
                self.receipt_from_chain(signed, &chain_receipt),
            )),
            None => Ok(BroadcastOutcome::Pending {
                tx_hash: signed.tx_hash,
            }),
        }
    }

    fn receipt_from_chain(
        &self,
        signed: &SignedDescriptor,
        chain_receipt: &ethers::types::TransactionReceipt,
    ) -> Receipt {
        let success = chain_receipt.status == Some(1u64.into());
        assemble_receipt(
            signed,
            chain_receipt.block_number.map(|b| b.as_u64()).unwrap_or_default(),
            chain_receipt.gas_used.unwrap_or_default(),
            success,
            chain_receipt.contract_address,
        )
    }
}
