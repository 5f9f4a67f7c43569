//! Online phase 1: build unsigned transaction descriptors from live chain
//! state. Read-only against the chain; nothing is submitted here.

use crate::contract::{self, CallParams, ContractArtifact};
use crate::descriptor::{Metadata, NetworkMeta, TxMode, TxPayload, UnsignedDescriptor};
use crate::network::client::{format_eth, ChainClient, FeeQuote};
use crate::prelude::{Error, Result};
use ethers::types::{Address, Bytes, U256};
use log::{info, warn};

/// Operator-supplied gas settings. Anything set here wins over discovery.
#[derive(Debug, Clone, Default)]
pub struct GasOverrides {
    pub gas_limit: Option<U256>,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

/// Resolved pricing: (type, gasPrice, maxFeePerGas, maxPriorityFeePerGas).
type ResolvedFees = (u8, Option<U256>, Option<U256>, Option<U256>);

/// Merge discovered fee data with operator overrides. A `--gas-price`
/// override pins the legacy type; fee-market overrides pin type 2; with no
/// overrides the endpoint's capabilities decide.
fn resolve_fees(quote: &FeeQuote, overrides: &GasOverrides) -> Result<ResolvedFees> {
    if let Some(gas_price) = overrides.gas_price {
        if overrides.max_fee_per_gas.is_some() || overrides.max_priority_fee_per_gas.is_some() {
            return Err(Error::InvalidParameters(
                "--gas-price conflicts with --max-fee/--priority-fee".to_string(),
            ));
        }
        return Ok((0, Some(gas_price), None, None));
    }

    if overrides.max_fee_per_gas.is_some() || overrides.max_priority_fee_per_gas.is_some() {
        let max_fee = overrides
            .max_fee_per_gas
            .or(quote.max_fee_per_gas)
            .ok_or_else(|| {
                Error::InvalidParameters(
                    "--priority-fee given but no --max-fee and the endpoint reports no base fee"
                        .to_string(),
                )
            })?;
        let priority = overrides
            .max_priority_fee_per_gas
            .or(quote.max_priority_fee_per_gas)
            .unwrap_or_else(|| U256::from(1_500_000_000u64));
        return Ok((2, None, Some(max_fee), Some(priority)));
    }

    if quote.is_fee_market() {
        Ok((2, None, quote.max_fee_per_gas, quote.max_priority_fee_per_gas))
    } else {
        Ok((0, quote.gas_price, None, None))
    }
}

/// Builds unsigned descriptors for one signer on one network.
#[derive(Debug)]
pub struct TransactionBuilder {
    client: ChainClient,
    network: NetworkMeta,
    signer_address: Address,
}

impl TransactionBuilder {
    /// Connect and learn the chain id. The network name is only a label
    /// carried into descriptor metadata; the chain id always comes from the
    /// endpoint itself.
    pub async fn new(
        http_client: Option<reqwest::Client>,
        rpc_url: &str,
        network_name: Option<String>,
        signer_address: Address,
    ) -> Result<Self> {
        let client = ChainClient::new(rpc_url, http_client)?;
        let chain_id = client.chain_id().await?;
        let name = network_name.unwrap_or_else(|| "custom".to_string());
        info!("connected to {name} (chain ID {chain_id})");
        Ok(Self {
            client,
            network: NetworkMeta { name, chain_id },
            signer_address,
        })
    }

    pub fn network(&self) -> &NetworkMeta {
        &self.network
    }

    /// Prepare a contract deployment from the compiled artifact.
    pub async fn prepare_deployment(
        &self,
        artifact: &ContractArtifact,
        overrides: &GasOverrides,
    ) -> Result<UnsignedDescriptor> {
        info!(
            "preparing deployment ({} bytes of init code)",
            artifact.bytecode.len()
        );
        self.assemble(
            TxMode::Deploy,
            None,
            None,
            None,
            artifact.bytecode.clone(),
            None,
            overrides,
        )
        .await
    }

    /// Prepare a call to a deployed contract. The target (and, for ERC-20
    /// deposits, the token) must hold bytecode; a typoed address dies here
    /// rather than as a reverted transaction.
    pub async fn prepare_call(
        &self,
        contract_address: Address,
        function: &str,
        params: &CallParams,
        artifact: &ContractArtifact,
        overrides: &GasOverrides,
    ) -> Result<UnsignedDescriptor> {
        let encoded = contract::encode_call(&artifact.abi, function, params)?;

        if !self.client.has_code(contract_address).await? {
            return Err(Error::NoContractAtAddress(format!(
                "{contract_address:?} on {}",
                self.network.name
            )));
        }
        if let Some(token) = encoded.token {
            if !self.client.has_code(token).await? {
                return Err(Error::NoContractAtAddress(format!(
                    "token {token:?} on {}",
                    self.network.name
                )));
            }
        }

        info!("preparing {function} call to {contract_address:?}");
        self.assemble(
            TxMode::Call,
            Some(function.to_string()),
            Some(encoded.params),
            Some(contract_address),
            encoded.data,
            encoded.value,
            overrides,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn assemble(
        &self,
        mode: TxMode,
        function_name: Option<String>,
        params: Option<serde_json::Value>,
        to: Option<Address>,
        data: Bytes,
        value: Option<U256>,
        overrides: &GasOverrides,
    ) -> Result<UnsignedDescriptor> {
        let nonce = self.client.pending_nonce(self.signer_address).await?;
        let balance = self.client.balance(self.signer_address).await?;
        info!("nonce {nonce}, balance {}", format_eth(balance));

        let quote = self.client.fee_quote().await?;
        let (tx_type, gas_price, max_fee_per_gas, max_priority_fee_per_gas) =
            resolve_fees(&quote, overrides)?;

        let gas_limit = match overrides.gas_limit {
            Some(limit) => limit,
            None => {
                self.client
                    .estimate_gas(self.signer_address, to, &data, value)
                    .await?
            }
        };

        let transaction = TxPayload {
            tx_type,
            from: self.signer_address,
            to,
            data,
            nonce,
            chain_id: self.network.chain_id,
            gas_limit,
            gas_price,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            value,
        };

        let max_cost = transaction.max_total_cost();
        if balance < max_cost {
            // The chain is the final arbiter; this is a heads-up, not a gate.
            warn!(
                "signer balance {} is below the worst-case cost {}",
                format_eth(balance),
                format_eth(max_cost)
            );
        }

        Ok(UnsignedDescriptor {
            mode,
            function_name,
            params,
            transaction,
            metadata: Metadata {
                network: self.network.clone(),
                estimated_cost: format_eth(max_cost),
                timestamp: crate::descriptor::now_rfc3339(),
                prepared: true,
                signed: false,
                signed_at: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market_quote() -> FeeQuote {
        FeeQuote {
            max_fee_per_gas: Some(U256::from(40_000_000_000u64)),
            max_priority_fee_per_gas: Some(U256::from(1_500_000_000u64)),
            gas_price: None,
        }
    }

    fn legacy_quote() -> FeeQuote {
        FeeQuote {
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            gas_price: Some(U256::from(30_000_000_000u64)),
        }
    }

    #[test]
    fn discovered_fee_market_yields_type_2() {
        let (tx_type, gas_price, max_fee, priority) =
            resolve_fees(&market_quote(), &GasOverrides::default()).unwrap();
        assert_eq!(tx_type, 2);
        assert!(gas_price.is_none());
        assert_eq!(max_fee, Some(U256::from(40_000_000_000u64)));
        assert_eq!(priority, Some(U256::from(1_500_000_000u64)));
    }

    #[test]
    fn discovered_legacy_yields_type_0() {
        let (tx_type, gas_price, max_fee, _) =
            resolve_fees(&legacy_quote(), &GasOverrides::default()).unwrap();
        assert_eq!(tx_type, 0);
        assert_eq!(gas_price, Some(U256::from(30_000_000_000u64)));
        assert!(max_fee.is_none());
    }

    #[test]
    fn gas_price_override_pins_legacy_even_on_fee_market_chains() {
        let overrides = GasOverrides {
            gas_price: Some(U256::from(9u64)),
            ..Default::default()
        };
        let (tx_type, gas_price, max_fee, _) =
            resolve_fees(&market_quote(), &overrides).unwrap();
        assert_eq!(tx_type, 0);
        assert_eq!(gas_price, Some(U256::from(9u64)));
        assert!(max_fee.is_none());
    }

    #[test]
    fn max_fee_override_wins_over_discovery() {
        let overrides = GasOverrides {
            max_fee_per_gas: Some(U256::from(77u64)),
            ..Default::default()
        };
        let (tx_type, _, max_fee, priority) =
            resolve_fees(&market_quote(), &overrides).unwrap();
        assert_eq!(tx_type, 2);
        assert_eq!(max_fee, Some(U256::from(77u64)));
        // Discovered tip carries through when not overridden
        assert_eq!(priority, Some(U256::from(1_500_000_000u64)));
    }

    #[test]
    fn priority_fee_alone_on_legacy_endpoint_is_rejected() {
        let overrides = GasOverrides {
            max_priority_fee_per_gas: Some(U256::from(1u64)),
            ..Default::default()
        };
        assert!(matches!(
            resolve_fees(&legacy_quote(), &overrides),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn conflicting_override_styles_are_rejected() {
        let overrides = GasOverrides {
            gas_price: Some(U256::from(1u64)),
            max_fee_per_gas: Some(U256::from(2u64)),
            ..Default::default()
        };
        assert!(matches!(
            resolve_fees(&market_quote(), &overrides),
            Err(Error::InvalidParameters(_))
        ));
    }
}
