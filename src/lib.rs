//! Off-chain order engine for a perpetual futures exchange.
//!
//! Builds, hashes, signs and simulates trade orders that are settled by an
//! external ledger contract. The crate computes values; the ledger enforces
//! them. Nothing here persists state or retries failed submissions.
//!
//! The usual flow: construct an [`Order`], hash and sign it through an
//! [`OrderService`], optionally forecast the fill's effect with the
//! collateralization simulator, then batch signed fills into a
//! [`TradeOperation`] and commit them as one atomic settlement call through a
//! [`LedgerClient`].

pub mod blockchain;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod signing;

pub use blockchain::client::LedgerClient;
pub use blockchain::types::{TradeArg, TxResult, TxStatus};
pub use config::{EngineConfig, FeeTiers};
pub use error::{EngineError, FormatError};
pub use models::balance::{Balance, BalanceUpdate, Collateralization, Index, PosAndNegValues};
pub use models::order::{Order, OrderState, OrderStatus, SignedOrder};
pub use models::value::{BaseValue, Fee, FundingRate, Price, Rounding, BASE_DECIMALS};
pub use services::orders::OrderService;
pub use services::trade::{Trade, TradeOperation};
pub use signing::eip712::Eip712Domain;
pub use signing::signature::{SignatureType, SigningMethod, TypedSignature};
