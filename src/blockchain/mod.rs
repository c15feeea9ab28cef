//! Ledger contract interface: bindings, client and wire types.

pub mod client;
pub mod contracts;
pub mod types;

pub use client::LedgerClient;
pub use types::{TradeArg, TxResult, TxStatus};
