//! Ledger wire types.

use ethers::types::{Address, Bytes, H256, TransactionReceipt, U256};
use serde::{Deserialize, Serialize};

/// One fill inside a batched `trade` call.
///
/// Maker and taker reference positions in the call's sorted account list, not
/// account identifiers; the data blob is opaque to the ledger core and
/// interpreted by the trader contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeArg {
    pub maker_index: U256,
    pub taker_index: U256,
    pub trader: Address,
    pub data: Bytes,
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Result of a settlement transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxResult {
    pub tx_hash: H256,
    pub status: TxStatus,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub error: Option<String>,
}

impl TxResult {
    /// Maps an optional receipt into a result; a missing receipt means the
    /// transaction is still pending.
    pub(crate) fn from_receipt(receipt: Option<TransactionReceipt>) -> Self {
        match receipt {
            Some(r) => TxResult {
                tx_hash: r.transaction_hash,
                status: if r.status == Some(1.into()) {
                    TxStatus::Confirmed
                } else {
                    TxStatus::Failed
                },
                block_number: r.block_number.map(|b| b.as_u64()),
                gas_used: r.gas_used,
                error: None,
            },
            None => TxResult {
                tx_hash: H256::zero(),
                status: TxStatus::Pending,
                block_number: None,
                gas_used: None,
                error: Some("No receipt".to_string()),
            },
        }
    }
}
