//! Offline transaction lifecycle for the CryptoHeir contract.
//!
//! The lifecycle is split into three independent phases connected only by
//! descriptor files, so the signing key never has to exist on a
//! network-capable machine:
//!
//! 1. `prepare` (online) builds an unsigned transaction descriptor from live
//!    chain state.
//! 2. `sign` (offline) reviews, confirms and signs the descriptor.
//! 3. `broadcast` (online) submits the signed payload idempotently and
//!    records a receipt.

pub mod broadcast;
pub mod config;
pub mod contract;
pub mod descriptor;
pub mod errors;
pub mod keys;
pub mod network;
pub mod prelude;
pub mod prepare;
pub mod signing;

pub use broadcast::{BroadcastConfig, BroadcastOutcome, Broadcaster};
pub use contract::{CallParams, ContractArtifact};
pub use descriptor::{Receipt, SignedDescriptor, TxMode, UnsignedDescriptor};
pub use errors::Error;
pub use network::{ChainClient, NetworkProfile};
pub use prepare::{GasOverrides, TransactionBuilder};
pub use signing::{sign_descriptor, Confirm};
