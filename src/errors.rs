use thiserror::Error;

/// Errors across all three phases. Every variant is terminal to its
/// invocation: nothing here is retried, the operator fixes the cause and
/// re-runs the phase.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("No RPC endpoint configured: {0}")]
    NoRpcConfiguration(String),
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
    #[error("Contract artifact not found: {0}")]
    MissingArtifact(String),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("No contract code at address: {0}")]
    NoContractAtAddress(String),
    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),
    #[error("Sender mismatch: {0}")]
    SenderMismatch(String),
    #[error("Chain ID mismatch: {0}")]
    ChainIdMismatch(String),
    #[error("Nonce expired: {0}")]
    NonceExpired(String),
    #[error("Replacement transaction underpriced: {0}")]
    ReplacementUnderpriced(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),
    #[error("RPC request failed: {0}")]
    RpcRequest(String),
    #[error("JSON parse error: {0}")]
    JsonParse(String),
    #[error("File error: {0}")]
    FileIo(String),
    #[error("Private key parse error: {0}")]
    PrivateKeyParse(String),
    #[error("Signature failure: {0}")]
    SignatureFailure(String),
}
