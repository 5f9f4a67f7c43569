//! CryptoHeir contract surface: Foundry artifact loading, the callable
//! function allow-list, per-function parameter validation and ABI encoding.

use crate::prelude::{Error, Result};
use ethers::abi::{Abi, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::parse_ether;
use serde_json::json;
use std::path::Path;

/// Default location of the compiled Foundry artifact.
pub const DEFAULT_ARTIFACT_PATH: &str = "artifacts/CryptoHeir.json";

/// Functions the prepare phase will encode. Anything else is rejected before
/// a single RPC call is made.
pub const SUPPORTED_FUNCTIONS: &[&str] = &[
    "deposit",
    "claim",
    "reclaim",
    "extendDeadline",
    "transferFeeCollector",
    "acceptFeeCollector",
];

/// Parsed Foundry build artifact.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub abi: Abi,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Load `{"abi": [...], "bytecode": {"object": "0x..."}}` from disk. The
    /// contract must have been compiled beforehand; this tool never builds it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::MissingArtifact(format!(
                "{}: {e}; compile the contract (forge build) and point --artifact at the output",
                path.display()
            ))
        })?;
        let artifact: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| Error::JsonParse(format!("{}: {e}", path.display())))?;

        let abi: Abi = serde_json::from_value(artifact["abi"].clone())
            .map_err(|e| Error::JsonParse(format!("artifact ABI: {e}")))?;

        let bytecode_hex = artifact["bytecode"]["object"]
            .as_str()
            .ok_or_else(|| Error::JsonParse("artifact has no bytecode.object".to_string()))?;
        let bytecode: Bytes = bytecode_hex
            .parse()
            .map_err(|e| Error::JsonParse(format!("artifact bytecode: {e}")))?;
        if bytecode.is_empty() {
            return Err(Error::MissingArtifact(format!(
                "{}: bytecode is empty",
                path.display()
            )));
        }

        Ok(Self { abi, bytecode })
    }
}

/// Raw call parameters collected from CLI flags; which of them are required
/// depends on the function.
#[derive(Debug, Clone, Default)]
pub struct CallParams {
    pub beneficiary: Option<Address>,
    pub deadline: Option<u64>,
    /// Native amount (in ETH) attached to a deposit.
    pub value: Option<String>,
    pub inheritance_id: Option<U256>,
    pub token: Option<Address>,
    /// ERC-20 amount (token units) for a token deposit.
    pub amount: Option<String>,
    pub new_fee_collector: Option<Address>,
}

/// A validated, ABI-encoded call ready for gas estimation.
#[derive(Debug, Clone)]
pub struct EncodedCall {
    pub data: Bytes,
    /// Native value to attach, for payable calls.
    pub value: Option<U256>,
    /// ERC-20 token whose bytecode the builder must verify.
    pub token: Option<Address>,
    /// Human-readable argument record for the descriptor.
    pub params: serde_json::Value,
}

fn require<T: Copy>(field: Option<T>, name: &str, function: &str) -> Result<T> {
    field.ok_or_else(|| Error::InvalidParameters(format!("{function} requires --{name}")))
}

fn parse_amount(raw: &str, name: &str) -> Result<U256> {
    parse_ether(raw).map_err(|e| Error::InvalidParameters(format!("--{name} {raw}: {e}")))
}

fn encode(abi: &Abi, function: &str, args: &[Token]) -> Result<Bytes> {
    let data = abi
        .function(function)
        .map_err(|e| Error::InvalidParameters(format!("{function} not in contract ABI: {e}")))?
        .encode_input(args)
        .map_err(|e| Error::InvalidParameters(format!("{function}: {e}")))?;
    Ok(data.into())
}

/// Validate the parameters for `function` and encode the calldata.
///
/// Deposits come in two shapes keyed on the token address: a native deposit
/// (no token, or the zero address) carries its amount as transaction value,
/// an ERC-20 deposit carries it as the `_amount` argument. Supplying both
/// `--value` and `--amount`, or the wrong one for the shape, is rejected.
pub fn encode_call(abi: &Abi, function: &str, params: &CallParams) -> Result<EncodedCall> {
    if !SUPPORTED_FUNCTIONS.contains(&function) {
        return Err(Error::InvalidParameters(format!(
            "unknown function {function}; supported: {}",
            SUPPORTED_FUNCTIONS.join(", ")
        )));
    }

    match function {
        "deposit" => {
            let beneficiary = require(params.beneficiary, "beneficiary", function)?;
            let deadline = require(params.deadline, "deadline", function)?;
            let token = params.token.filter(|t| !t.is_zero());

            let (amount, tx_value) = match token {
                None => {
                    if params.amount.is_some() {
                        return Err(Error::InvalidParameters(
                            "native deposit takes --value, not --amount".to_string(),
                        ));
                    }
                    let value = params.value.as_deref().ok_or_else(|| {
                        Error::InvalidParameters("native deposit requires --value".to_string())
                    })?;
                    let wei = parse_amount(value, "value")?;
                    (wei, Some(wei))
                }
                Some(_) => {
                    if params.value.is_some() {
                        return Err(Error::InvalidParameters(
                            "token deposit takes --amount, not --value".to_string(),
                        ));
                    }
                    let amount = params.amount.as_deref().ok_or_else(|| {
                        Error::InvalidParameters("token deposit requires --amount".to_string())
                    })?;
                    (parse_amount(amount, "amount")?, None)
                }
            };

            let token_arg = token.unwrap_or_else(Address::zero);
            let data = encode(
                abi,
                function,
                &[
                    Token::Address(token_arg),
                    Token::Address(beneficiary),
                    Token::Uint(amount),
                    Token::Uint(U256::from(deadline)),
                ],
            )?;
            Ok(EncodedCall {
                data,
                value: tx_value,
                token,
                params: json!({
                    "token": token_arg,
                    "beneficiary": beneficiary,
                    "amount": amount.to_string(),
                    "deadline": deadline,
                }),
            })
        }
        "claim" | "reclaim" => {
            let id = require(params.inheritance_id, "inheritance-id", function)?;
            let data = encode(abi, function, &[Token::Uint(id)])?;
            Ok(EncodedCall {
                data,
                value: None,
                token: None,
                params: json!({ "inheritanceId": id.to_string() }),
            })
        }
        "extendDeadline" => {
            let id = require(params.inheritance_id, "inheritance-id", function)?;
            let new_deadline = require(params.deadline, "deadline", function)?;
            let data = encode(
                abi,
                function,
                &[Token::Uint(id), Token::Uint(U256::from(new_deadline))],
            )?;
            Ok(EncodedCall {
                data,
                value: None,
                token: None,
                params: json!({
                    "inheritanceId": id.to_string(),
                    "newDeadline": new_deadline,
                }),
            })
        }
        "transferFeeCollector" => {
            let collector = require(params.new_fee_collector, "new-fee-collector", function)?;
            let data = encode(abi, function, &[Token::Address(collector)])?;
            Ok(EncodedCall {
                data,
                value: None,
                token: None,
                params: json!({ "newFeeCollector": collector }),
            })
        }
        "acceptFeeCollector" => {
            let data = encode(abi, function, &[])?;
            Ok(EncodedCall {
                data,
                value: None,
                token: None,
                params: json!({}),
            })
        }
        _ => unreachable!("allow-list checked above"),
    }
}
