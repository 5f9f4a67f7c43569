//! Per-phase configuration.
//!
//! Each phase gets its own struct so the offline-key guarantee is visible in
//! the types: only [`SignEnv`] carries the private key, and the broadcast
//! phase cannot even represent one.

use crate::prelude::{Error, Result};
use ethers::types::Address;
use std::env;

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_address(name: &str) -> Result<Option<Address>> {
    match env_var(name) {
        Some(raw) => raw
            .parse::<Address>()
            .map(Some)
            .map_err(|e| Error::MissingConfiguration(format!("{name} is not a valid address: {e}"))),
        None => Ok(None),
    }
}

/// Configuration for the online prepare phase. No key material.
#[derive(Debug, Clone)]
pub struct PrepareEnv {
    pub signer_address: Option<Address>,
    pub rpc_url: Option<String>,
    pub api_key: Option<String>,
    pub contract_address: Option<Address>,
}

impl PrepareEnv {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Ok(Self {
            signer_address: env_address("SIGNER_ADDRESS")?,
            rpc_url: env_var("RPC_URL"),
            api_key: env_var("INFURA_API_KEY"),
            contract_address: env_address("CONTRACT_ADDRESS")?,
        })
    }

    /// The signer address is mandatory for preparation: the nonce, balance
    /// and gas estimate are all keyed on it.
    pub fn require_signer_address(&self) -> Result<Address> {
        self.signer_address.ok_or_else(|| {
            Error::MissingConfiguration(
                "SIGNER_ADDRESS not set; export the address whose key will sign offline".to_string(),
            )
        })
    }
}

/// Configuration for the offline sign phase. This is the only struct that
/// ever reads `PRIVATE_KEY`.
#[derive(Clone)]
pub struct SignEnv {
    pub private_key: Option<String>,
}

impl SignEnv {
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self {
            private_key: env_var("PRIVATE_KEY"),
        }
    }

    pub fn require_private_key(&self) -> Result<String> {
        self.private_key.clone().ok_or_else(|| {
            Error::MissingConfiguration(
                "PRIVATE_KEY not set; export it on the offline machine only".to_string(),
            )
        })
    }
}

// Deliberately no Debug derive for SignEnv: a debug-print must not be able to
// leak the key into logs.
impl std::fmt::Debug for SignEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignEnv")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration for the online broadcast phase. There is no field a private
/// key could live in.
#[derive(Debug, Clone)]
pub struct BroadcastEnv {
    pub rpc_url: Option<String>,
    pub api_key: Option<String>,
}

impl BroadcastEnv {
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self {
            rpc_url: env_var("RPC_URL"),
            api_key: env_var("INFURA_API_KEY"),
        }
    }
}
