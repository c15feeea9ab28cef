//! Engine configuration, loaded from the environment at startup.

use ethers::types::{Address, U256};
use serde::Deserialize;

use crate::error::{EngineError, FormatError};
use crate::models::value::Fee;

/// Process-wide read-only configuration.
///
/// The fee-tier values are exchange tuning, not protocol invariants, which is
/// why they live here instead of in `constants`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub rpc_url: String,

    pub chain_id: u64,

    /// Deployed ledger proxy address.
    pub perpetual_address: String,

    /// Deployed orders trader contract address. This is the EIP-712
    /// verifying contract: hashes are not portable across deployments.
    pub orders_address: String,

    #[serde(default)]
    pub signer_private_key: Option<String>,

    // Fee tiers, in basis points
    #[serde(default = "default_maker_rebate_bips")]
    pub maker_rebate_bips: String,

    #[serde(default = "default_small_order_fee_bips")]
    pub small_order_fee_bips: String,

    #[serde(default = "default_large_order_fee_bips")]
    pub large_order_fee_bips: String,

    /// Order size (integer base units) below which the small-order taker fee
    /// applies.
    #[serde(default = "default_small_order_threshold")]
    pub small_order_threshold: String,
}

fn default_maker_rebate_bips() -> String {
    "-2.5".to_string()
}

fn default_small_order_fee_bips() -> String {
    "50.0".to_string()
}

fn default_large_order_fee_bips() -> String {
    "15".to_string()
}

fn default_small_order_threshold() -> String {
    // 0.5 of a base asset carrying 8 decimals.
    "50000000".to_string()
}

impl EngineConfig {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, EngineError> {
        let config = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| EngineError::argument(e.to_string()))?;
        config
            .try_deserialize()
            .map_err(|e| EngineError::argument(e.to_string()))
    }

    pub fn perpetual(&self) -> Result<Address, EngineError> {
        parse_address(&self.perpetual_address)
    }

    pub fn orders(&self) -> Result<Address, EngineError> {
        parse_address(&self.orders_address)
    }

    /// Parses the configured fee tiers.
    pub fn fee_tiers(&self) -> Result<FeeTiers, EngineError> {
        Ok(FeeTiers {
            maker_rebate: Fee::from_bips(&self.maker_rebate_bips)?,
            small_order_fee: Fee::from_bips(&self.small_order_fee_bips)?,
            large_order_fee: Fee::from_bips(&self.large_order_fee_bips)?,
            small_order_threshold: U256::from_dec_str(&self.small_order_threshold)
                .map_err(|_| FormatError::InvalidDecimal(self.small_order_threshold.clone()))?,
        })
    }
}

fn parse_address(s: &str) -> Result<Address, EngineError> {
    s.parse()
        .map_err(|_| FormatError::InvalidAddress(s.to_string()).into())
}

/// Parsed fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeTiers {
    pub maker_rebate: Fee,
    pub small_order_fee: Fee,
    pub large_order_fee: Fee,
    pub small_order_threshold: U256,
}

impl Default for FeeTiers {
    fn default() -> Self {
        FeeTiers {
            maker_rebate: Fee::from_bips(&default_maker_rebate_bips())
                .expect("default rebate is a valid bips literal"),
            small_order_fee: Fee::from_bips(&default_small_order_fee_bips())
                .expect("default small-order fee is a valid bips literal"),
            large_order_fee: Fee::from_bips(&default_large_order_fee_bips())
                .expect("default large-order fee is a valid bips literal"),
            small_order_threshold: U256::from(50_000_000u64),
        }
    }
}
