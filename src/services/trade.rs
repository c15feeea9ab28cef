//! Trade-batch builder: accumulates fills and commits them as one atomic
//! settlement call.
//!
//! The builder is a two-state machine, `Open -> Committed`. A failed
//! submission transitions back to `Open` with the fill list intact, so the
//! caller decides whether to retry; nothing here retries internally. One
//! builder serves one logical workflow at a time.

use std::collections::BTreeMap;

use ethers::types::{Address, Bytes, U256};

use crate::blockchain::client::LedgerClient;
use crate::blockchain::types::{TradeArg, TxResult};
use crate::error::EngineError;
use crate::models::order::SignedOrder;
use crate::models::value::{Fee, Price};
use crate::services::orders::OrderService;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingFill {
    maker: Address,
    taker: Address,
    trader: Address,
    data: Bytes,
}

/// Accumulates fills against one ledger and submits them atomically.
pub struct TradeOperation {
    client: LedgerClient,
    fills: Vec<PendingFill>,
    committed: bool,
}

impl TradeOperation {
    pub fn new(client: LedgerClient) -> Self {
        TradeOperation {
            client,
            fills: Vec::new(),
            committed: false,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn fill_count(&self) -> usize {
        self.fills.len()
    }

    /// Appends a fill of a signed order at the given amount, price and fee.
    /// The trader contract is the orders contract the service hashes against.
    pub fn fill_signed_order(
        &mut self,
        orders: &OrderService,
        signed: &SignedOrder,
        amount: U256,
        price: &Price,
        fee: &Fee,
    ) -> Result<&mut Self, EngineError> {
        let data = orders.fill_to_trade_data(signed, amount, price, fee);
        self.add_trade_arg(signed.order.maker, signed.order.taker, orders.address(), data)
    }

    /// Appends a raw fill entry.
    pub fn add_trade_arg(
        &mut self,
        maker: Address,
        taker: Address,
        trader: Address,
        data: Bytes,
    ) -> Result<&mut Self, EngineError> {
        if self.committed {
            return Err(EngineError::state("operation already committed"));
        }
        self.fills.push(PendingFill {
            maker,
            taker,
            trader,
            data,
        });
        Ok(self)
    }

    /// The canonical call arguments for the current fill set: the
    /// deduplicated, byte-sorted account list, and each fill rewritten to
    /// reference accounts by index.
    ///
    /// The encoding is independent of fill insertion order, which keeps the
    /// settlement payload compact and canonical. Indices are derived here and
    /// only here; caller-supplied indices never enter a commit.
    pub fn call_args(&self) -> (Vec<Address>, Vec<TradeArg>) {
        let mut index_by_account: BTreeMap<Address, usize> = BTreeMap::new();
        for fill in &self.fills {
            index_by_account.insert(fill.maker, 0);
            index_by_account.insert(fill.taker, 0);
        }
        let accounts: Vec<Address> = index_by_account.keys().copied().collect();
        for (index, account) in accounts.iter().enumerate() {
            index_by_account.insert(*account, index);
        }

        let trade_args = self
            .fills
            .iter()
            .map(|fill| TradeArg {
                maker_index: U256::from(index_by_account[&fill.maker]),
                taker_index: U256::from(index_by_account[&fill.taker]),
                trader: fill.trader,
                data: fill.data.clone(),
            })
            .collect();
        (accounts, trade_args)
    }

    /// Submits the accumulated fills as one settlement transaction.
    ///
    /// On success the operation transitions to `Committed` and refuses
    /// further mutation; it stays inspectable for auditing. On failure it
    /// rolls back to `Open` with the fill list unchanged.
    pub async fn commit(&mut self) -> Result<TxResult, EngineError> {
        if self.committed {
            return Err(EngineError::state("operation already committed"));
        }
        if self.fills.is_empty() {
            return Err(EngineError::argument("no fills have been added"));
        }

        let (accounts, trade_args) = self.call_args();
        self.committed = true;
        tracing::info!(
            fills = trade_args.len(),
            accounts = accounts.len(),
            "committing trade batch"
        );

        match self.client.trade(accounts, trade_args).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.committed = false;
                tracing::error!("trade batch submission failed, rolled back to open: {e}");
                Err(e)
            }
        }
    }

    #[cfg(test)]
    fn force_committed(&mut self) {
        self.committed = true;
    }
}

/// Entry points for settlement calls.
pub struct Trade {
    client: LedgerClient,
}

impl Trade {
    pub fn new(client: LedgerClient) -> Self {
        Trade { client }
    }

    /// Starts an empty batch operation.
    pub fn initiate(&self) -> TradeOperation {
        TradeOperation::new(self.client.clone())
    }

    /// One-shot settlement with caller-built arguments. The account list and
    /// every index are validated locally before any network cost is incurred.
    pub async fn trade(
        &self,
        accounts: Vec<Address>,
        trade_args: Vec<TradeArg>,
    ) -> Result<TxResult, EngineError> {
        for pair in accounts.windows(2) {
            if pair[0] >= pair[1] {
                return Err(EngineError::argument(format!(
                    "accounts passed to trade() should be unique and sorted; got {accounts:?}"
                )));
            }
        }
        let len = U256::from(accounts.len());
        for arg in &trade_args {
            if arg.maker_index >= len {
                return Err(EngineError::argument(format!(
                    "trade arg maker index out of bounds: {}",
                    arg.maker_index
                )));
            }
            if arg.taker_index >= len {
                return Err(EngineError::argument(format!(
                    "trade arg taker index out of bounds: {}",
                    arg.taker_index
                )));
            }
        }
        self.client.trade(accounts, trade_args).await
    }
}
