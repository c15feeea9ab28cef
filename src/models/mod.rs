//! Core domain types: fixed-point values, orders, balances.

pub mod balance;
pub mod order;
pub mod value;

pub use balance::{Balance, BalanceUpdate, Collateralization, Index, PosAndNegValues};
pub use order::{Order, OrderState, OrderStatus, SignedOrder};
pub use value::{BaseValue, Fee, FundingRate, Price, Rounding, BASE_DECIMALS};
