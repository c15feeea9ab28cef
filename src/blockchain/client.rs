//! Client for the ledger contract and its orders trader contract.
//!
//! Every method is a single request/response against the deployed contracts;
//! there is no retry, polling or background work here. Independent reads are
//! issued concurrently where the original call pattern allows it.

use std::sync::Arc;

use ethers::contract::ContractError;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256, U256};

use crate::blockchain::contracts::{OrdersTrader, PerpetualLedger};
use crate::blockchain::types::{TradeArg, TxResult};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::balance::{Balance, Collateralization, Index, PosAndNegValues};
use crate::models::order::{OrderState, OrderStatus};
use crate::models::value::{BaseValue, Price};

type LedgerMiddleware = ethers::middleware::SignerMiddleware<Provider<Http>, LocalWallet>;

/// Maps a contract failure to [`EngineError::Remote`], passing the ledger's
/// revert reason through unmodified when one can be decoded.
fn contract_error<M: Middleware>(e: ContractError<M>) -> EngineError {
    match e.decode_revert::<String>() {
        Some(reason) => EngineError::remote(reason),
        None => EngineError::remote(e.to_string()),
    }
}

/// Read/write client for one deployed ledger.
#[derive(Clone)]
pub struct LedgerClient {
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<LedgerMiddleware>>,
    perpetual: Address,
    orders: Address,
    chain_id: u64,
}

impl LedgerClient {
    /// Creates a read-only client.
    pub fn new(
        rpc_url: &str,
        perpetual: Address,
        orders: Address,
        chain_id: u64,
    ) -> Result<Self, EngineError> {
        let provider =
            Provider::<Http>::try_from(rpc_url).map_err(|e| EngineError::argument(e.to_string()))?;
        Ok(LedgerClient {
            provider: Arc::new(provider),
            signer: None,
            perpetual,
            orders,
            chain_id,
        })
    }

    /// Creates a client that can also submit trades.
    pub fn new_with_signer(
        rpc_url: &str,
        private_key: &str,
        perpetual: Address,
        orders: Address,
        chain_id: u64,
    ) -> Result<Self, EngineError> {
        let provider =
            Provider::<Http>::try_from(rpc_url).map_err(|e| EngineError::argument(e.to_string()))?;
        let wallet: LocalWallet = private_key
            .parse::<LocalWallet>()
            .map_err(|e| EngineError::Signer(e.to_string()))?
            .with_chain_id(chain_id);
        let signer = ethers::middleware::SignerMiddleware::new(provider.clone(), wallet);
        Ok(LedgerClient {
            provider: Arc::new(provider),
            signer: Some(Arc::new(signer)),
            perpetual,
            orders,
            chain_id,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let perpetual = config.perpetual()?;
        let orders = config.orders()?;
        match &config.signer_private_key {
            Some(key) => {
                Self::new_with_signer(&config.rpc_url, key, perpetual, orders, config.chain_id)
            }
            None => Self::new(&config.rpc_url, perpetual, orders, config.chain_id),
        }
    }

    pub fn perpetual_address(&self) -> Address {
        self.perpetual
    }

    pub fn orders_address(&self) -> Address {
        self.orders
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.signer().address())
    }

    fn ledger(&self) -> PerpetualLedger<Provider<Http>> {
        PerpetualLedger::new(self.perpetual, self.provider.clone())
    }

    fn orders_trader(&self) -> OrdersTrader<Provider<Http>> {
        OrdersTrader::new(self.orders, self.provider.clone())
    }

    fn require_signer(&self) -> Result<Arc<LedgerMiddleware>, EngineError> {
        self.signer
            .clone()
            .ok_or_else(|| EngineError::argument("no signer configured"))
    }

    // ============ Account Getters ============

    pub async fn get_account_balance(&self, account: Address) -> Result<Balance, EngineError> {
        let (margin_is_positive, position_is_positive, margin, position) = self
            .ledger()
            .get_account_balance(account)
            .call()
            .await
            .map_err(contract_error)?;
        Ok(Balance::from_solidity(
            margin_is_positive,
            position_is_positive,
            margin,
            position,
        ))
    }

    pub async fn get_account_index(&self, account: Address) -> Result<Index, EngineError> {
        let (timestamp, is_positive, value) = self
            .ledger()
            .get_account_index(account)
            .call()
            .await
            .map_err(contract_error)?;
        Ok(Index::from_solidity(timestamp, is_positive, value)?)
    }

    pub async fn get_is_local_operator(
        &self,
        account: Address,
        operator: Address,
    ) -> Result<bool, EngineError> {
        self.ledger()
            .get_is_local_operator(account, operator)
            .call()
            .await
            .map_err(contract_error)
    }

    pub async fn has_account_permissions(
        &self,
        account: Address,
        operator: Address,
    ) -> Result<bool, EngineError> {
        self.ledger()
            .has_account_permissions(account, operator)
            .call()
            .await
            .map_err(contract_error)
    }

    // ============ Global Getters ============

    pub async fn get_global_index(&self) -> Result<Index, EngineError> {
        let (timestamp, is_positive, value) = self
            .ledger()
            .get_global_index()
            .call()
            .await
            .map_err(contract_error)?;
        Ok(Index::from_solidity(timestamp, is_positive, value)?)
    }

    pub async fn get_oracle_price(&self) -> Result<Price, EngineError> {
        let price = self
            .ledger()
            .get_oracle_price()
            .call()
            .await
            .map_err(contract_error)?;
        Ok(Price::from_solidity(price)?)
    }

    pub async fn get_min_collateral(&self) -> Result<BaseValue, EngineError> {
        let value = self
            .ledger()
            .get_min_collateral()
            .call()
            .await
            .map_err(contract_error)?;
        Ok(BaseValue::from_solidity(value, true)?)
    }

    pub async fn get_admin(&self) -> Result<Address, EngineError> {
        self.ledger().get_admin().call().await.map_err(contract_error)
    }

    pub async fn get_is_global_operator(&self, operator: Address) -> Result<bool, EngineError> {
        self.ledger()
            .get_is_global_operator(operator)
            .call()
            .await
            .map_err(contract_error)
    }

    pub async fn get_token_contract(&self) -> Result<Address, EngineError> {
        self.ledger()
            .get_token_contract()
            .call()
            .await
            .map_err(contract_error)
    }

    pub async fn get_oracle_contract(&self) -> Result<Address, EngineError> {
        self.ledger()
            .get_oracle_contract()
            .call()
            .await
            .map_err(contract_error)
    }

    pub async fn get_funder_contract(&self) -> Result<Address, EngineError> {
        self.ledger()
            .get_funder_contract()
            .call()
            .await
            .map_err(contract_error)
    }

    pub async fn get_final_settlement_enabled(&self) -> Result<bool, EngineError> {
        self.ledger()
            .get_final_settlement_enabled()
            .call()
            .await
            .map_err(contract_error)
    }

    // ============ Order Status ============

    /// Status and filled amount for each order hash, one round trip. Result
    /// order matches input order.
    pub async fn get_orders_status(
        &self,
        order_hashes: Vec<H256>,
    ) -> Result<Vec<OrderState>, EngineError> {
        let hashes: Vec<[u8; 32]> = order_hashes.into_iter().map(|h| h.0).collect();
        let states = self
            .orders_trader()
            .get_orders_status(hashes)
            .call()
            .await
            .map_err(contract_error)?;
        states
            .into_iter()
            .map(|(status, filled_amount)| {
                Ok(OrderState {
                    status: OrderStatus::try_from(status)?,
                    filled_amount,
                })
            })
            .collect()
    }

    // ============ Net-Balance Helpers ============

    /// Margin and position with unsettled interest applied.
    pub async fn get_net_account_balance(&self, account: Address) -> Result<Balance, EngineError> {
        let (balance, global_index, local_index) = tokio::try_join!(
            self.get_account_balance(account),
            self.get_global_index(),
            self.get_account_index(account),
        )?;
        Ok(balance.with_settled_interest(&global_index, &local_index))
    }

    pub async fn get_net_account_values(
        &self,
        account: Address,
    ) -> Result<PosAndNegValues, EngineError> {
        let (balance, price) =
            tokio::try_join!(self.get_net_account_balance(account), self.get_oracle_price())?;
        Ok(balance.get_positive_and_negative_values(&price))
    }

    pub async fn get_net_account_collateralization(
        &self,
        account: Address,
    ) -> Result<Collateralization, EngineError> {
        let (balance, price) =
            tokio::try_join!(self.get_net_account_balance(account), self.get_oracle_price())?;
        Ok(balance.get_collateralization(&price))
    }

    pub async fn get_net_account_is_liquidatable(
        &self,
        account: Address,
    ) -> Result<bool, EngineError> {
        let (collateralization, min_collateral) = tokio::try_join!(
            self.get_net_account_collateralization(account),
            self.get_min_collateral(),
        )?;
        Ok(collateralization.is_below(&min_collateral))
    }

    // ============ Trade Submission ============

    /// Submits one atomic settlement call. The whole fill set is accepted or
    /// rejected together; there are no partial-batch semantics.
    pub async fn trade(
        &self,
        accounts: Vec<Address>,
        trade_args: Vec<TradeArg>,
    ) -> Result<TxResult, EngineError> {
        let signer = self.require_signer()?;
        let contract = PerpetualLedger::new(self.perpetual, signer);

        let trades: Vec<(U256, U256, Address, ethers::types::Bytes)> = trade_args
            .into_iter()
            .map(|arg| (arg.maker_index, arg.taker_index, arg.trader, arg.data))
            .collect();

        tracing::debug!(
            accounts = accounts.len(),
            fills = trades.len(),
            "submitting trade to ledger"
        );

        let call = contract.trade(accounts, trades);
        let pending = call.send().await.map_err(contract_error)?;
        let receipt = pending
            .await
            .map_err(|e| EngineError::remote(e.to_string()))?;
        Ok(TxResult::from_receipt(receipt))
    }
}
