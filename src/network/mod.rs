pub mod chains;
pub mod client;

pub use chains::{resolve, rpc_url, NetworkProfile};
pub use client::{ChainClient, FeeQuote, TxStatus};
