//! Cross-phase lifecycle: the descriptor files written by one phase must be
//! exactly what the next phase reads back. Everything here runs offline.

use cryptoheir_signer::descriptor::{
    self, Metadata, NetworkMeta, TxMode, TxPayload, UnsignedDescriptor,
};
use cryptoheir_signer::prelude::Result;
use cryptoheir_signer::signing::{self, Confirm};
use ethers::signers::Signer;
use ethers::types::{H256, U256};
use ethers::utils::{get_contract_address, keccak256};

// Throwaway key, never funded.
const TEST_KEY: &str = "e908f86dbb4d55ac876378565aafeabc187f6690f046459397b17d9b9a19688e";

struct Approve;
impl Confirm for Approve {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

struct Decline;
impl Confirm for Decline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Test data builders
mod test_data {
    use super::*;

    pub fn unsigned(mode: TxMode) -> UnsignedDescriptor {
        let from = signing::parse_wallet(TEST_KEY).unwrap().address();
        UnsignedDescriptor {
            mode,
            function_name: matches!(mode, TxMode::Call).then(|| "claim".to_string()),
            params: matches!(mode, TxMode::Call)
                .then(|| serde_json::json!({ "inheritanceId": "3" })),
            transaction: TxPayload {
                tx_type: 2,
                from,
                to: matches!(mode, TxMode::Call)
                    .then(|| "0x2df1c51e09aecf9cacb7bc98cb1742757f163df7".parse().unwrap()),
                data: "0x379607f50000000000000000000000000000000000000000000000000000000000000003"
                    .parse()
                    .unwrap(),
                nonce: 5,
                chain_id: 11155111,
                gas_limit: U256::from(120_000u64),
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
                estimated_cost: "0.004800 ETH".to_string(),
                timestamp: "2025-05-02T10:00:00+00:00".to_string(),
                prepared: true,
                signed: false,
                signed_at: None,
            },
        }
    }
}

#[test]
fn unsigned_file_signs_into_a_broadcastable_file() {
    let dir = tempfile::tempdir().unwrap();
    let unsigned_path = dir.path().join("tx-params.json");
    let signed_path = dir.path().join("signed-tx.json");

    // Phase 1 output hits disk...
    descriptor::save_pretty(&unsigned_path, &test_data::unsigned(TxMode::Call)).unwrap();

    // ...phase 2 reads it back, signs, and writes its own file...
    let loaded = descriptor::load_unsigned(&unsigned_path).unwrap();
    let signed = signing::sign_descriptor(&loaded, TEST_KEY, &mut Approve)
        .unwrap()
        .expect("approved");
    descriptor::save_pretty(&signed_path, &signed).unwrap();

    // ...and phase 3 sees exactly what phase 2 produced.
    let reloaded = descriptor::load_signed(&signed_path).unwrap();
    assert_eq!(reloaded.tx_hash, signed.tx_hash);
    assert_eq!(reloaded.tx_hash, H256::from(keccak256(&reloaded.signed_transaction)));
    assert_eq!(reloaded.from, loaded.transaction.from);
    assert_eq!(reloaded.nonce, 5);
    assert_eq!(reloaded.chain_id, 11155111);
    assert_eq!(reloaded.gas_limit, U256::from(120_000u64));
    assert_eq!(reloaded.function_name.as_deref(), Some("claim"));
    assert!(reloaded.metadata.signed);
    assert!(reloaded.metadata.signed_at.is_some());
    assert_eq!(reloaded.metadata.network.name, "sepolia");
    assert_eq!(reloaded.predicted_contract_address, None);
}

#[test]
fn deployment_prediction_survives_the_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let signed_path = dir.path().join("signed-tx.json");

    let unsigned = test_data::unsigned(TxMode::Deploy);
    let signed = signing::sign_descriptor(&unsigned, TEST_KEY, &mut Approve)
        .unwrap()
        .unwrap();
    descriptor::save_pretty(&signed_path, &signed).unwrap();

    let reloaded = descriptor::load_signed(&signed_path).unwrap();
    let expected = get_contract_address(unsigned.transaction.from, 5u64);
    assert_eq!(reloaded.predicted_contract_address, Some(expected));
    assert_eq!(reloaded.to, None);
}

#[test]
fn declining_the_review_leaves_no_signed_artifact() {
    let unsigned = test_data::unsigned(TxMode::Call);
    let outcome = signing::sign_descriptor(&unsigned, TEST_KEY, &mut Decline).unwrap();
    assert!(outcome.is_none());
}

#[test]
fn signed_wire_format_keeps_its_field_names() {
    let unsigned = test_data::unsigned(TxMode::Deploy);
    let signed = signing::sign_descriptor(&unsigned, TEST_KEY, &mut Approve)
        .unwrap()
        .unwrap();
    let json = serde_json::to_value(&signed).unwrap();

    assert!(json.get("signedTransaction").is_some());
    assert!(json.get("txHash").is_some());
    assert_eq!(json["mode"], "deploy");
    assert_eq!(json["chainId"], 11155111);
    assert_eq!(json["gasLimit"], "120000");
    assert!(json.get("predictedContractAddress").is_some());
    assert_eq!(json["metadata"]["signed"], true);
    // Deployments carry a null target, not an absent one
    assert!(json["to"].is_null());
}

#[test]
fn tampered_unsigned_file_is_rejected_before_any_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tx-params.json");

    let mut unsigned = test_data::unsigned(TxMode::Call);
    unsigned.metadata.prepared = false;
    descriptor::save_pretty(&path, &unsigned).unwrap();

    let loaded = descriptor::load_unsigned(&path).unwrap();
    let err = signing::sign_descriptor(&loaded, TEST_KEY, &mut Approve).unwrap_err();
    assert!(matches!(
        err,
        cryptoheir_signer::Error::MalformedDescriptor(_)
    ));
}
