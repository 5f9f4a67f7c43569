//! Offline phase 2: review and sign a prepared descriptor.
//!
//! Nothing in this module performs network I/O. That is the entire point of
//! the three-phase split: the private key is only ever loaded here, on a
//! machine that never needs connectivity.

pub mod confirm;

pub use confirm::{Confirm, StdinConfirm};

use crate::descriptor::{SignedDescriptor, TxMode, TxPayload, UnsignedDescriptor};
use crate::network::client::format_eth;
use crate::prelude::{Error, Result};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Eip1559TransactionRequest, NameOrAddress, TransactionRequest, H256, U256};
use ethers::utils::{format_units, get_contract_address, keccak256};
use log::{info, warn};

/// Parse the operator's private key into a wallet.
pub fn parse_wallet(private_key: &str) -> Result<LocalWallet> {
    let trimmed = private_key.trim();
    let key = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    key.parse::<LocalWallet>()
        .map_err(|e| Error::PrivateKeyParse(e.to_string()))
}

/// Rebuild the ethers transaction from descriptor fields, checking that the
/// fee fields are consistent with the declared type.
fn build_typed_transaction(tx: &TxPayload) -> Result<TypedTransaction> {
    tx.validate_fee_fields()?;
    let typed = match tx.tx_type {
        2 => TypedTransaction::Eip1559(Eip1559TransactionRequest {
            from: Some(tx.from),
            to: tx.to.map(NameOrAddress::Address),
            gas: Some(tx.gas_limit),
            value: tx.value,
            data: Some(tx.data.clone()),
            nonce: Some(U256::from(tx.nonce)),
            access_list: Default::default(),
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
            max_fee_per_gas: tx.max_fee_per_gas,
            chain_id: Some(tx.chain_id.into()),
        }),
        _ => TypedTransaction::Legacy(TransactionRequest {
            from: Some(tx.from),
            to: tx.to.map(NameOrAddress::Address),
            gas: Some(tx.gas_limit),
            gas_price: tx.gas_price,
            value: tx.value,
            data: Some(tx.data.clone()),
            nonce: Some(U256::from(tx.nonce)),
            chain_id: Some(tx.chain_id.into()),
        }),
    };
    Ok(typed)
}

fn gwei(value: U256) -> String {
    format_units(value, "gwei")
        .map(|v| format!("{v} gwei"))
        .unwrap_or_else(|_| format!("{value} wei"))
}

/// Human-readable review text: everything the operator is committing to by
/// signing.
pub fn render_summary(descriptor: &UnsignedDescriptor) -> String {
    let tx = &descriptor.transaction;
    let mut lines = vec![
        "===== Transaction review =====".to_string(),
        format!(
            "Network:     {} (chain ID {})",
            descriptor.metadata.network.name, descriptor.metadata.network.chain_id
        ),
        match descriptor.mode {
            TxMode::Deploy => "Action:      deploy CryptoHeir contract".to_string(),
            TxMode::Call => format!(
                "Action:      call {}",
                descriptor.function_name.as_deref().unwrap_or("<unknown>")
            ),
        },
    ];
    if let Some(params) = &descriptor.params {
        lines.push(format!(
            "Parameters:  {}",
            serde_json::to_string(params).unwrap_or_else(|_| "<unprintable>".to_string())
        ));
    }
    lines.push(format!("From:        {:?}", tx.from));
    match tx.to {
        Some(to) => lines.push(format!("To:          {to:?}")),
        None => lines.push("To:          (new contract)".to_string()),
    }
    lines.push(format!("Nonce:       {}", tx.nonce));
    lines.push(format!("Gas limit:   {}", tx.gas_limit));
    match (tx.max_fee_per_gas, tx.max_priority_fee_per_gas, tx.gas_price) {
        (Some(max_fee), Some(priority), _) => {
            lines.push(format!("Max fee:     {}", gwei(max_fee)));
            lines.push(format!("Priority:    {}", gwei(priority)));
        }
        (_, _, Some(gas_price)) => lines.push(format!("Gas price:   {}", gwei(gas_price))),
        _ => {}
    }
    if let Some(value) = tx.value {
        lines.push(format!("Value:       {}", format_eth(value)));
    }
    lines.push(format!("Max cost:    {}", format_eth(tx.max_total_cost())));
    lines.push("==============================".to_string());
    lines.join("\n")
}

/// Sign an unsigned descriptor after the full gate sequence.
///
/// Returns `Ok(None)` when the operator declines at any confirmation point;
/// the caller writes no file in that case. All validation failures are hard
/// errors that equally produce no output.
pub fn sign_descriptor(
    descriptor: &UnsignedDescriptor,
    private_key: &str,
    confirm: &mut dyn Confirm,
) -> Result<Option<SignedDescriptor>> {
    if !descriptor.metadata.prepared {
        return Err(Error::MalformedDescriptor(
            "metadata.prepared is not true; this file did not come out of the prepare phase"
                .to_string(),
        ));
    }

    if descriptor.metadata.signed {
        warn!("descriptor is already marked as signed");
        let resign = confirm.confirm(
            "This descriptor is already marked as signed. A previous signature may have been \
             broadcast. Re-sign it anyway?",
        )?;
        if !resign {
            info!("re-sign declined");
            return Ok(None);
        }
    }

    let wallet = parse_wallet(private_key)?;
    if wallet.address() != descriptor.transaction.from {
        return Err(Error::SenderMismatch(format!(
            "signing key controls {:?} but the transaction is from {:?}",
            wallet.address(),
            descriptor.transaction.from
        )));
    }

    let typed = build_typed_transaction(&descriptor.transaction)?;

    let prompt = format!("{}\nSign this transaction?", render_summary(descriptor));
    if !confirm.confirm(&prompt)? {
        info!("signing declined");
        return Ok(None);
    }

    let wallet = wallet.with_chain_id(descriptor.transaction.chain_id);
    let signature = wallet
        .sign_transaction_sync(&typed)
        .map_err(|e| Error::SignatureFailure(e.to_string()))?;
    let raw = typed.rlp_signed(&signature);
    let tx_hash = H256::from(keccak256(&raw));

    let predicted_contract_address = matches!(descriptor.mode, TxMode::Deploy).then(|| {
        get_contract_address(descriptor.transaction.from, descriptor.transaction.nonce)
    });

    let mut metadata = descriptor.metadata.clone();
    metadata.signed = true;
    metadata.signed_at = Some(crate::descriptor::now_rfc3339());

    let tx = &descriptor.transaction;
    Ok(Some(SignedDescriptor {
        signed_transaction: raw,
        tx_hash,
        mode: descriptor.mode,
        function_name: descriptor.function_name.clone(),
        from: tx.from,
        to: tx.to,
        value: tx.value,
        nonce: tx.nonce,
        chain_id: tx.chain_id,
        gas_limit: tx.gas_limit,
        gas_price: tx.gas_price,
        max_fee_per_gas: tx.max_fee_per_gas,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        predicted_contract_address,
        metadata,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Metadata, NetworkMeta};
    use ethers::utils::rlp::Rlp;

    // Throwaway key, never funded.
    const TEST_KEY: &str = "e908f86dbb4d55ac876378565aafeabc187f6690f046459397b17d9b9a19688e";

    struct Scripted {
        answers: Vec<bool>,
        prompts: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: answers.to_vec(),
                prompts: Vec::new(),
            }
        }
    }

    impl Confirm for Scripted {
        fn confirm(&mut self, prompt: &str) -> Result<bool> {
            self.prompts.push(prompt.to_string());
            Ok(self.answers.remove(0))
        }
    }

    fn test_descriptor(mode: TxMode) -> UnsignedDescriptor {
        let wallet = parse_wallet(TEST_KEY).unwrap();
        UnsignedDescriptor {
            mode,
            function_name: matches!(mode, TxMode::Call).then(|| "claim".to_string()),
            params: matches!(mode, TxMode::Call)
                .then(|| serde_json::json!({ "inheritanceId": "3" })),
            transaction: TxPayload {
                tx_type: 2,
                from: wallet.address(),
                to: matches!(mode, TxMode::Call)
                    .then(|| "0x2df1c51e09aecf9cacb7bc98cb1742757f163df7".parse().unwrap()),
                data: "0x60806040".parse().unwrap(),
                nonce: 5,
                chain_id: 11155111,
                gas_limit: U256::from(100_000u64),
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
                estimated_cost: "0.004000 ETH".to_string(),
                timestamp: "2025-05-02T10:00:00+00:00".to_string(),
                prepared: true,
                signed: false,
                signed_at: None,
            },
        }
    }

    #[test]
    fn signs_and_the_signature_recovers_the_sender() {
        let descriptor = test_descriptor(TxMode::Call);
        let mut confirm = Scripted::new(&[true]);
        let signed = sign_descriptor(&descriptor, TEST_KEY, &mut confirm)
            .unwrap()
            .expect("operator approved");

        assert_eq!(signed.tx_hash, H256::from(keccak256(&signed.signed_transaction)));
        assert!(signed.metadata.signed);
        assert!(signed.metadata.signed_at.is_some());
        assert_eq!(signed.predicted_contract_address, None);
        assert_eq!(signed.nonce, 5);

        let rlp = Rlp::new(signed.signed_transaction.as_ref());
        let (decoded, signature) = TypedTransaction::decode_signed(&rlp).unwrap();
        let recovered = signature.recover(decoded.sighash()).unwrap();
        assert_eq!(recovered, parse_wallet(TEST_KEY).unwrap().address());
    }

    #[test]
    fn deployment_carries_the_predicted_create_address() {
        let descriptor = test_descriptor(TxMode::Deploy);
        let mut confirm = Scripted::new(&[true]);
        let signed = sign_descriptor(&descriptor, TEST_KEY, &mut confirm)
            .unwrap()
            .unwrap();
        let expected = get_contract_address(descriptor.transaction.from, 5u64);
        assert_eq!(signed.predicted_contract_address, Some(expected));
    }

    #[test]
    fn sender_mismatch_refuses_to_sign() {
        let mut descriptor = test_descriptor(TxMode::Call);
        descriptor.transaction.from =
            "0x0d1d9635d0640821d15e323ac8adadfa9c111414".parse().unwrap();
        let mut confirm = Scripted::new(&[true, true]);
        let err = sign_descriptor(&descriptor, TEST_KEY, &mut confirm).unwrap_err();
        assert!(matches!(err, Error::SenderMismatch(_)));
        // Refused before the review prompt was ever shown
        assert!(confirm.prompts.is_empty());
    }

    #[test]
    fn unprepared_descriptor_is_malformed() {
        let mut descriptor = test_descriptor(TxMode::Call);
        descriptor.metadata.prepared = false;
        let mut confirm = Scripted::new(&[true]);
        assert!(matches!(
            sign_descriptor(&descriptor, TEST_KEY, &mut confirm),
            Err(Error::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn declining_the_review_aborts_without_output() {
        let descriptor = test_descriptor(TxMode::Call);
        let mut confirm = Scripted::new(&[false]);
        let signed = sign_descriptor(&descriptor, TEST_KEY, &mut confirm).unwrap();
        assert!(signed.is_none());
    }

    #[test]
    fn already_signed_needs_an_extra_confirmation() {
        let mut descriptor = test_descriptor(TxMode::Call);
        descriptor.metadata.signed = true;

        // Decline the re-sign prompt: nothing happens.
        let mut confirm = Scripted::new(&[false]);
        assert!(sign_descriptor(&descriptor, TEST_KEY, &mut confirm)
            .unwrap()
            .is_none());
        assert_eq!(confirm.prompts.len(), 1);
        assert!(confirm.prompts[0].contains("already marked as signed"));

        // Accept both prompts: a fresh signature is produced.
        let mut confirm = Scripted::new(&[true, true]);
        assert!(sign_descriptor(&descriptor, TEST_KEY, &mut confirm)
            .unwrap()
            .is_some());
        assert_eq!(confirm.prompts.len(), 2);
    }

    #[test]
    fn legacy_transactions_sign_too() {
        let mut descriptor = test_descriptor(TxMode::Call);
        descriptor.transaction.tx_type = 0;
        descriptor.transaction.max_fee_per_gas = None;
        descriptor.transaction.max_priority_fee_per_gas = None;
        descriptor.transaction.gas_price = Some(U256::from(30_000_000_000u64));

        let mut confirm = Scripted::new(&[true]);
        let signed = sign_descriptor(&descriptor, TEST_KEY, &mut confirm)
            .unwrap()
            .unwrap();

        let rlp = Rlp::new(signed.signed_transaction.as_ref());
        let (decoded, signature) = TypedTransaction::decode_signed(&rlp).unwrap();
        let recovered = signature.recover(decoded.sighash()).unwrap();
        assert_eq!(recovered, parse_wallet(TEST_KEY).unwrap().address());
    }

    #[test]
    fn inconsistent_fee_fields_are_malformed() {
        let mut descriptor = test_descriptor(TxMode::Call);
        descriptor.transaction.max_fee_per_gas = None;
        let mut confirm = Scripted::new(&[true]);
        assert!(matches!(
            sign_descriptor(&descriptor, TEST_KEY, &mut confirm),
            Err(Error::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn summary_names_the_material_facts() {
        let descriptor = test_descriptor(TxMode::Call);
        let summary = render_summary(&descriptor);
        assert!(summary.contains("sepolia"));
        assert!(summary.contains("11155111"));
        assert!(summary.contains("call claim"));
        assert!(summary.contains("Nonce:       5"));
        assert!(summary.contains("Max cost:"));
    }

    #[test]
    fn wallet_parse_accepts_0x_prefix() {
        let a = parse_wallet(TEST_KEY).unwrap();
        let b = parse_wallet(&format!("0x{TEST_KEY}")).unwrap();
        assert_eq!(a.address(), b.address());
        assert!(parse_wallet("not-a-key").is_err());
    }
}
