//! Account balance, funding index and collateralization math.

use ethers::types::{I256, U256, U512};
use serde::{Deserialize, Serialize};

use crate::models::value::{BaseValue, Price, Rounding};

/// Margin (collateral, quote units) and position (base units) of an account.
///
/// The authoritative instance lives in the ledger; this copy is only ever
/// read from it or evolved hypothetically by the fill simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub margin: I256,
    pub position: I256,
}

impl Balance {
    pub fn new(margin: I256, position: I256) -> Self {
        Balance { margin, position }
    }

    pub fn zero() -> Self {
        Balance {
            margin: I256::zero(),
            position: I256::zero(),
        }
    }

    /// Decodes the ledger's signed-magnitude balance struct.
    pub fn from_solidity(
        margin_is_positive: bool,
        position_is_positive: bool,
        margin: u128,
        position: u128,
    ) -> Self {
        let sign = |positive: bool, magnitude: u128| {
            let value = I256::from(magnitude);
            if positive {
                value
            } else {
                -value
            }
        };
        Balance {
            margin: sign(margin_is_positive, margin),
            position: sign(position_is_positive, position),
        }
    }

    pub fn apply(&self, update: &BalanceUpdate) -> Balance {
        Balance {
            margin: self.margin + update.margin_delta,
            position: self.position + update.position_delta,
        }
    }

    /// Margin adjusted by unsettled interest between the global funding index
    /// and this account's local snapshot. Interest rounds toward negative
    /// infinity: debits round up, credits round down.
    pub fn with_settled_interest(&self, global_index: &Index, local_index: &Index) -> Balance {
        let index_diff = global_index.base_value - local_index.base_value;
        let interest = BaseValue::from_scaled(index_diff.scaled() * -self.position);
        Balance {
            margin: self.margin + interest.round_to_units(Rounding::Floor),
            position: self.position,
        }
    }

    /// Splits the account's value at the given oracle price into positive and
    /// negative exposure magnitudes (10^18-scaled quote units).
    pub fn get_positive_and_negative_values(&self, price: &Price) -> PosAndNegValues {
        let margin_value = BaseValue::from_units(self.margin);
        let position_value = BaseValue::from_scaled(self.position * price.value().scaled());

        let mut values = PosAndNegValues {
            positive_value: U256::zero(),
            negative_value: U256::zero(),
        };
        for value in [margin_value, position_value] {
            let (magnitude, is_positive) = value.to_solidity();
            if is_positive {
                values.positive_value += magnitude;
            } else {
                values.negative_value += magnitude;
            }
        }
        values
    }

    /// Collateralization ratio at the given oracle price: positive exposure
    /// divided by negative exposure, truncated to 18 decimals.
    /// [`Collateralization::Infinite`] when there is no negative exposure.
    pub fn get_collateralization(&self, price: &Price) -> Collateralization {
        let values = self.get_positive_and_negative_values(price);
        if values.negative_value.is_zero() {
            return Collateralization::Infinite;
        }
        let scaled =
            values.positive_value.full_mul(U256::exp10(18)) / U512::from(values.negative_value);
        match U256::try_from(scaled)
            .ok()
            .and_then(|ratio| BaseValue::from_solidity(ratio, true).ok())
        {
            Some(ratio) => Collateralization::Finite(ratio),
            // Beyond the representable range the distinction carries no
            // information; report as unbounded.
            None => Collateralization::Infinite,
        }
    }
}

/// Effect of one hypothetical fill on a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub margin_delta: I256,
    pub position_delta: I256,
}

/// Positive/negative exposure decomposition, 10^18-scaled magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosAndNegValues {
    pub positive_value: U256,
    pub negative_value: U256,
}

/// Collateralization ratio, with a sentinel for accounts that carry no
/// negative exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collateralization {
    Finite(BaseValue),
    Infinite,
}

impl Collateralization {
    pub fn is_infinite(&self) -> bool {
        matches!(self, Collateralization::Infinite)
    }

    /// Whether the ratio is below the given minimum. Infinite is never below.
    pub fn is_below(&self, minimum: &BaseValue) -> bool {
        match self {
            Collateralization::Finite(ratio) => ratio < minimum,
            Collateralization::Infinite => false,
        }
    }
}

/// A funding accumulator snapshot: the global instance advances with time,
/// each account stores the value at its last settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub timestamp: u32,
    pub base_value: BaseValue,
}

impl Index {
    /// Decodes the ledger's (timestamp, isPositive, value) index tuple.
    pub fn from_solidity(
        timestamp: u32,
        is_positive: bool,
        value: u128,
    ) -> Result<Self, crate::error::FormatError> {
        Ok(Index {
            timestamp,
            base_value: BaseValue::from_solidity(U256::from(value), is_positive)?,
        })
    }
}
