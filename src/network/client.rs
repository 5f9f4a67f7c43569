//! Thin chain client over an ethers HTTP provider.
//!
//! All RPC access in the toolkit funnels through this type; the sign phase
//! never constructs one.

use crate::prelude::{Error, Result};
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::types::{
    Address, BlockNumber, Bytes, TransactionReceipt, TransactionRequest, H256, U256,
};
use log::{debug, info};
use std::time::Duration;

/// Request timeout for every RPC round-trip.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Priority fee used when the endpoint supports fee-market pricing: 1.5 gwei.
const DEFAULT_PRIORITY_FEE_WEI: u64 = 1_500_000_000;

/// Fee data discovered from the endpoint. Either the fee-market pair or the
/// legacy gas price is populated, never both.
#[derive(Debug, Clone, Default)]
pub struct FeeQuote {
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub gas_price: Option<U256>,
}

impl FeeQuote {
    pub fn is_fee_market(&self) -> bool {
        self.max_fee_per_gas.is_some()
    }
}

/// On-chain presence of a transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// The node has never seen the hash.
    Unknown,
    /// Known but not yet mined.
    Pending,
    /// Included in a block.
    Mined,
}

#[derive(Debug, Clone)]
pub struct ChainClient<P = Http> {
    provider: Provider<P>,
}

impl ChainClient<Http> {
    /// Connect to an RPC endpoint. A custom reqwest client can be injected;
    /// the default gets a request timeout so a dead endpoint fails instead of
    /// hanging the invocation.
    pub fn new(rpc_url: &str, client: Option<reqwest::Client>) -> Result<Self> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| Error::NoRpcConfiguration(format!("invalid RPC URL {rpc_url}: {e}")))?;
        let client = match client {
            Some(c) => c,
            None => reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .map_err(|e| Error::RpcRequest(e.to_string()))?,
        };
        Ok(Self::from_provider(Provider::new(Http::new_with_client(
            url, client,
        ))))
    }
}

impl<P: JsonRpcClient> ChainClient<P> {
    /// Wrap an existing provider (used with mocked transports in tests).
    pub fn from_provider(provider: Provider<P>) -> Self {
        Self { provider }
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| Error::RpcRequest(format!("failed to fetch chain ID: {e}")))?;
        Ok(id.as_u64())
    }

    /// Pending nonce, so back-to-back preparations from the same signer do
    /// not collide.
    pub async fn pending_nonce(&self, address: Address) -> Result<u64> {
        let nonce = self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| Error::RpcRequest(format!("failed to fetch nonce: {e}")))?;
        Ok(nonce.as_u64())
    }

    pub async fn balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| Error::RpcRequest(format!("failed to fetch balance: {e}")))
    }

    /// Fee discovery: fee-market pricing when the endpoint exposes a base
    /// fee, legacy gas price otherwise. Max fee is 2x base fee plus the tip
    /// to absorb base-fee swings between preparation and broadcast.
    pub async fn fee_quote(&self) -> Result<FeeQuote> {
        if let Ok(history) = self.provider.fee_history(1u64, BlockNumber::Latest, &[]).await {
            if let Some(base_fee) = history.base_fee_per_gas.last().copied() {
                if !base_fee.is_zero() {
                    let tip = U256::from(DEFAULT_PRIORITY_FEE_WEI);
                    let max_fee = base_fee * U256::from(2) + tip;
                    debug!("fee market: base {base_fee}, max {max_fee}, tip {tip}");
                    return Ok(FeeQuote {
                        max_fee_per_gas: Some(max_fee),
                        max_priority_fee_per_gas: Some(tip),
                        gas_price: None,
                    });
                }
            }
        }

        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| Error::RpcRequest(format!("failed to fetch gas price: {e}")))?;
        debug!("legacy gas price: {gas_price}");
        Ok(FeeQuote {
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            gas_price: Some(gas_price),
        })
    }

    /// Node-side gas estimate with a 20% safety buffer on top.
    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Option<Address>,
        data: &Bytes,
        value: Option<U256>,
    ) -> Result<U256> {
        let mut request = TransactionRequest::new().from(from).data(data.clone());
        if let Some(to) = to {
            request = request.to(to);
        }
        if let Some(value) = value {
            request = request.value(value);
        }

        let estimate = self
            .provider
            .estimate_gas(&request.into(), None)
            .await
            .map_err(|e| Error::GasEstimation(e.to_string()))?;
        let buffered = estimate + estimate / 5;
        info!("gas estimate {estimate}, with buffer {buffered}");
        Ok(buffered)
    }

    /// True when the address holds deployed bytecode. Used to catch address
    /// typos before any gas is spent.
    pub async fn has_code(&self, address: Address) -> Result<bool> {
        let code = self
            .provider
            .get_code(address, None)
            .await
            .map_err(|e| Error::RpcRequest(format!("failed to fetch code: {e}")))?;
        Ok(!code.is_empty())
    }

    pub async fn transaction_status(&self, hash: H256) -> Result<TxStatus> {
        let found = self
            .provider
            .get_transaction(hash)
            .await
            .map_err(|e| Error::RpcRequest(format!("failed to look up transaction: {e}")))?;
        Ok(match found {
            None => TxStatus::Unknown,
            Some(tx) if tx.block_number.is_none() => TxStatus::Pending,
            Some(_) => TxStatus::Mined,
        })
    }

    pub async fn receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| Error::RpcRequest(format!("failed to fetch receipt: {e}")))
    }

    /// Submit a raw signed payload. Provider errors surface as
    /// [`Error::RpcRequest`] carrying the node's message; the broadcaster
    /// classifies them further.
    pub async fn send_raw(&self, raw: Bytes) -> Result<H256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| Error::RpcRequest(e.to_string()))?;
        Ok(*pending)
    }

    /// Poll for the receipt until `timeout` elapses. `Ok(None)` means the
    /// transaction was still unmined when the window closed.
    pub async fn wait_for_receipt(
        &self,
        hash: H256,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Option<TransactionReceipt>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                return Ok(Some(receipt));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Render a wei amount as ETH with six decimals for operator-facing output.
pub fn format_eth(wei: U256) -> String {
    let eth = ethers::utils::format_ether(wei);
    match eth.split_once('.') {
        Some((whole, frac)) => {
            let frac = &frac[..frac.len().min(6)];
            format!("{whole}.{frac:0<6} ETH")
        }
        None => format!("{eth}.000000 ETH"),
    }
}
