//! BIP-39 key tooling for provisioning the offline signer: generate a fresh
//! mnemonic, or derive the Ethereum account at `m/44'/60'/0'/0/{index}` from
//! an existing phrase.

use crate::prelude::{Error, Result};
use ethers::signers::coins_bip39::{English, Mnemonic};
use ethers::signers::{LocalWallet, MnemonicBuilder};

/// Generate a fresh mnemonic and the wallet at derivation index 0.
pub fn generate_mnemonic(word_count: usize) -> Result<(String, LocalWallet)> {
    if word_count != 12 && word_count != 24 {
        return Err(Error::InvalidParameters(format!(
            "mnemonic word count must be 12 or 24, got {word_count}"
        )));
    }
    let mnemonic = Mnemonic::<English>::new_with_count(&mut rand::thread_rng(), word_count)
        .map_err(|e| Error::PrivateKeyParse(format!("mnemonic generation failed: {e}")))?;
    let phrase = mnemonic.to_phrase();
    let wallet = derive_wallet(&phrase, 0)?;
    Ok((phrase, wallet))
}

/// Derive the wallet at `m/44'/60'/0'/0/{index}` from a phrase.
pub fn derive_wallet(phrase: &str, index: u32) -> Result<LocalWallet> {
    let phrase = phrase.trim();
    let words = phrase.split_whitespace().count();
    if words != 12 && words != 24 {
        return Err(Error::InvalidParameters(format!(
            "mnemonic must be 12 or 24 words, got {words}"
        )));
    }
    MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .index(index)
        .map_err(|e| Error::PrivateKeyParse(e.to_string()))?
        .build()
        .map_err(|e| Error::PrivateKeyParse(e.to_string()))
}

/// Hex private key (no 0x prefix) for export lines.
pub fn private_key_hex(wallet: &LocalWallet) -> String {
    hex::encode(wallet.signer().to_bytes())
}
