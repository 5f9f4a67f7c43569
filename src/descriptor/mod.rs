//! Descriptor files passed between the three phases.
//!
//! These shapes are a wire contract: the field names below are exactly what
//! the next phase expects to read back, and 256-bit quantities travel as
//! decimal strings so the files stay diffable and hand-auditable. Each phase
//! writes a new file; nothing mutates a descriptor in place.

use crate::prelude::{Error, Result};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

/// What the transaction does: deploy the contract or call into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxMode {
    Deploy,
    Call,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMeta {
    pub name: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub network: NetworkMeta,
    pub estimated_cost: String,
    pub timestamp: String,
    pub prepared: bool,
    pub signed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
}

/// The raw transaction parameters. `type` 0 is legacy pricing (`gasPrice`),
/// `type` 2 is fee-market pricing (`maxFeePerGas` + `maxPriorityFeePerGas`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPayload {
    #[serde(rename = "type")]
    pub tx_type: u8,
    pub from: Address,
    /// `null` for deployments.
    pub to: Option<Address>,
    pub data: Bytes,
    pub nonce: u64,
    pub chain_id: u64,
    #[serde(with = "u256_dec")]
    pub gas_limit: U256,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub value: Option<U256>,
}

impl TxPayload {
    /// The fee fields must match the declared type before signing.
    pub fn validate_fee_fields(&self) -> Result<()> {
        match self.tx_type {
            2 => {
                if self.max_fee_per_gas.is_none() || self.max_priority_fee_per_gas.is_none() {
                    return Err(Error::MalformedDescriptor(
                        "type 2 requires maxFeePerGas and maxPriorityFeePerGas".to_string(),
                    ));
                }
            }
            0 => {
                if self.gas_price.is_none() {
                    return Err(Error::MalformedDescriptor(
                        "type 0 requires gasPrice".to_string(),
                    ));
                }
            }
            other => {
                return Err(Error::MalformedDescriptor(format!(
                    "unsupported transaction type {other}"
                )));
            }
        }
        if self.gas_limit.is_zero() {
            return Err(Error::MalformedDescriptor("gasLimit is zero".to_string()));
        }
        Ok(())
    }

    /// Per-gas price ceiling the operator is agreeing to.
    pub fn price_ceiling(&self) -> U256 {
        self.max_fee_per_gas
            .or(self.gas_price)
            .unwrap_or_default()
    }

    /// Worst-case spend: gas at the ceiling plus any attached value.
    pub fn max_total_cost(&self) -> U256 {
        self.gas_limit * self.price_ceiling() + self.value.unwrap_or_default()
    }
}

/// Output of the prepare phase, input to the sign phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedDescriptor {
    pub mode: TxMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub transaction: TxPayload,
    pub metadata: Metadata,
}

/// Output of the sign phase, input to the broadcast phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDescriptor {
    pub signed_transaction: Bytes,
    pub tx_hash: H256,
    pub mode: TxMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub from: Address,
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub value: Option<U256>,
    pub nonce: u64,
    pub chain_id: u64,
    #[serde(with = "u256_dec")]
    pub gas_limit: U256,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "u256_dec_opt")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// `null` except for deployments.
    pub predicted_contract_address: Option<Address>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Failed,
}

/// Terminal record written by the broadcast phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub mode: TxMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub transaction_hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    /// Populated only on a successful deployment.
    pub contract_address: Option<Address>,
    pub block_number: u64,
    #[serde(with = "u256_dec")]
    pub gas_used: U256,
    pub status: ReceiptStatus,
    pub timestamp: String,
    pub network: NetworkMeta,
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::FileIo(format!("{}: {e}", path.display())))
}

fn parse_descriptor<T: DeserializeOwned>(path: &Path, json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| Error::MalformedDescriptor(format!("{}: {e}", path.display())))
}

pub fn load_unsigned(path: &Path) -> Result<UnsignedDescriptor> {
    parse_descriptor(path, &read_file(path)?)
}

pub fn load_signed(path: &Path) -> Result<SignedDescriptor> {
    parse_descriptor(path, &read_file(path)?)
}

/// Pretty-print a descriptor or receipt to disk. The files are meant to be
/// read by humans moving them between machines.
pub fn save_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::JsonParse(e.to_string()))?;
    std::fs::write(path, json + "\n")
        .map_err(|e| Error::FileIo(format!("{}: {e}", path.display())))
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

// U256 <-> decimal string on the wire.
mod u256_dec {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}

mod u256_dec_opt {
    use ethers::types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| U256::from_dec_str(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_unsigned() -> UnsignedDescriptor {
        UnsignedDescriptor {
            mode: TxMode::Deploy,
            function_name: None,
            params: None,
            transaction: TxPayload {
                tx_type: 2,
                from: "0x2df1c51e09aecf9cacb7bc98cb1742757f163df7".parse().unwrap(),
                to: None,
                data: "0x6080604052".parse().unwrap(),
                nonce: 5,
                chain_id: 11155111,
                gas_limit: U256::from(1_200_000u64),
                gas_price: None,
                max_fee_per_gas: Some(U256::from(40_000_000_000u64)),
                max_priority_fee_per_gas: Some(U256::from(1_500_000_000u64)),
                value: None,
            },
            metadata: Metadata {
                network: NetworkMeta {
                    name: "sepolia".to_string(),
                    chain_id: 11155111,
                },
                estimated_cost: "0.048000 ETH".to_string(),
                timestamp: "2025-05-02T10:00:00+00:00".to_string(),
                prepared: true,
                signed: false,
                signed_at: None,
            },
        }
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let json = serde_json::to_value(sample_unsigned()).unwrap();
        let tx = &json["transaction"];
        assert_eq!(tx["type"], 2);
        assert_eq!(tx["chainId"], 11155111);
        assert!(tx.get("gasLimit").is_some());
        assert!(tx.get("maxFeePerGas").is_some());
        assert!(tx.get("maxPriorityFeePerGas").is_some());
        // Legacy-only field absent on a fee-market transaction
        assert!(tx.get("gasPrice").is_none());
        // Deployments serialize an explicit null target
        assert!(tx["to"].is_null());
        assert_eq!(json["metadata"]["estimatedCost"], "0.048000 ETH");
        assert_eq!(json["metadata"]["prepared"], true);
        assert_eq!(json["metadata"]["signed"], false);
    }

    #[test]
    fn quantities_travel_as_decimal_strings() {
        let json = serde_json::to_value(sample_unsigned()).unwrap();
        assert_eq!(json["transaction"]["gasLimit"], "1200000");
        assert_eq!(json["transaction"]["maxFeePerGas"], "40000000000");
    }

    #[test]
    fn unsigned_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx-params.json");
        let original = sample_unsigned();
        save_pretty(&path, &original).unwrap();

        let loaded = load_unsigned(&path).unwrap();
        assert_eq!(loaded.mode, TxMode::Deploy);
        assert_eq!(loaded.transaction.nonce, 5);
        assert_eq!(loaded.transaction.gas_limit, U256::from(1_200_000u64));
        assert_eq!(loaded.transaction.to, None);
        assert!(loaded.metadata.prepared);
        assert!(!loaded.metadata.signed);
    }

    #[test]
    fn loading_garbage_is_a_malformed_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx-params.json");
        std::fs::write(&path, "{\"mode\": \"deploy\"}").unwrap();
        assert!(matches!(load_unsigned(&path), Err(Error::MalformedDescriptor(_))));
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = load_unsigned(Path::new("/nonexistent/tx-params.json")).unwrap_err();
        assert!(matches!(err, Error::FileIo(_)));
    }

    #[test]
    fn fee_field_validation_tracks_type() {
        let mut tx = sample_unsigned().transaction;
        tx.validate_fee_fields().unwrap();

        tx.max_fee_per_gas = None;
        assert!(matches!(tx.validate_fee_fields(), Err(Error::MalformedDescriptor(_))));

        let mut legacy = sample_unsigned().transaction;
        legacy.tx_type = 0;
        legacy.max_fee_per_gas = None;
        legacy.max_priority_fee_per_gas = None;
        assert!(matches!(legacy.validate_fee_fields(), Err(Error::MalformedDescriptor(_))));
        legacy.gas_price = Some(U256::from(30_000_000_000u64));
        legacy.validate_fee_fields().unwrap();

        let mut odd = sample_unsigned().transaction;
        odd.tx_type = 1;
        assert!(matches!(odd.validate_fee_fields(), Err(Error::MalformedDescriptor(_))));
    }

    #[test]
    fn max_total_cost_includes_value() {
        let mut tx = sample_unsigned().transaction;
        tx.gas_limit = U256::from(100u64);
        tx.max_fee_per_gas = Some(U256::from(10u64));
        tx.value = Some(U256::from(7u64));
        assert_eq!(tx.max_total_cost(), U256::from(1007u64));
    }

    #[test]
    fn receipt_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ReceiptStatus::Success).unwrap(), "success");
        assert_eq!(serde_json::to_value(ReceiptStatus::Failed).unwrap(), "failed");
    }
}
