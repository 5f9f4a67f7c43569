//! Network registry: name -> chain id + RPC endpoint template.
//!
//! Consulted by the prepare phase (from operator flags) and by the broadcast
//! phase (from the network name embedded in the signed descriptor, so a
//! broadcast is reproducible from the file alone).

use crate::prelude::{Error, Result};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Endpoint for local development chains (anvil, hardhat).
pub const LOCAL_RPC: &str = "http://127.0.0.1:8545";

/// A supported network. `endpoint_template` contains `{key}` where the
/// provider API key goes; local networks need no key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: &'static str,
    pub chain_id: u64,
    pub endpoint_template: &'static str,
}

lazy_static! {
    static ref NETWORKS: HashMap<&'static str, NetworkProfile> = {
        let mut m = HashMap::new();
        let mut add = |name: &'static str, chain_id: u64, endpoint_template: &'static str| {
            m.insert(name, NetworkProfile { name, chain_id, endpoint_template });
        };

        // Ethereum
        add("mainnet", 1, "https://mainnet.infura.io/v3/{key}");
        add("sepolia", 11155111, "https://sepolia.infura.io/v3/{key}");
        add("holesky", 17000, "https://holesky.infura.io/v3/{key}");

        // Polygon
        add("polygon-mainnet", 137, "https://polygon-mainnet.infura.io/v3/{key}");
        add("polygon-amoy", 80002, "https://polygon-amoy.infura.io/v3/{key}");

        // Arbitrum
        add("arbitrum-mainnet", 42161, "https://arbitrum-mainnet.infura.io/v3/{key}");
        add("arbitrum-sepolia", 421614, "https://arbitrum-sepolia.infura.io/v3/{key}");

        // Optimism
        add("optimism-mainnet", 10, "https://optimism-mainnet.infura.io/v3/{key}");
        add("optimism-sepolia", 11155420, "https://optimism-sepolia.infura.io/v3/{key}");

        // Base
        add("base-mainnet", 8453, "https://base-mainnet.infura.io/v3/{key}");
        add("base-sepolia", 84532, "https://base-sepolia.infura.io/v3/{key}");

        // Linea
        add("linea-mainnet", 59144, "https://linea-mainnet.infura.io/v3/{key}");
        add("linea-sepolia", 59141, "https://linea-sepolia.infura.io/v3/{key}");

        // Local development
        add("localhost", 31337, LOCAL_RPC);
        add("anvil", 31337, LOCAL_RPC);
        add("hardhat", 31337, LOCAL_RPC);

        m
    };
}

/// Look up a network by name.
pub fn resolve(name: &str) -> Result<&'static NetworkProfile> {
    NETWORKS
        .get(name)
        .ok_or_else(|| Error::UnsupportedNetwork(name.to_string()))
}

/// Pick the RPC endpoint for an invocation.
///
/// An explicit override is used verbatim and makes the network name optional.
/// Otherwise the named profile's template is filled with the provider API
/// key; templated endpoints without a key are unusable.
pub fn rpc_url(
    network: Option<&str>,
    rpc_override: Option<&str>,
    api_key: Option<&str>,
) -> Result<String> {
    if let Some(url) = rpc_override {
        return Ok(url.to_string());
    }

    let name = network.ok_or_else(|| {
        Error::NoRpcConfiguration("no --rpc-url override and no network name given".to_string())
    })?;
    let profile = resolve(name)?;

    if !profile.endpoint_template.contains("{key}") {
        return Ok(profile.endpoint_template.to_string());
    }
    match api_key {
        Some(key) => Ok(profile.endpoint_template.replace("{key}", key)),
        None => Err(Error::NoRpcConfiguration(format!(
            "network {name} needs INFURA_API_KEY (or pass an explicit RPC URL)"
        ))),
    }
}
