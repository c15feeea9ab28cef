//! Protocol-level constants enforced by the ledger contracts.

use crate::models::value::{FundingRate, Rounding};

pub const ONE_MINUTE_IN_SECONDS: u64 = 60;
pub const ONE_HOUR_IN_SECONDS: u64 = 60 * ONE_MINUTE_IN_SECONDS;
pub const ONE_DAY_IN_SECONDS: u64 = 24 * ONE_HOUR_IN_SECONDS;
pub const ONE_YEAR_IN_SECONDS: u64 = 365 * ONE_DAY_IN_SECONDS;

// Trader-contract capability flags.
pub const TRADER_FLAG_ORDERS: u64 = 1;
pub const TRADER_FLAG_LIQUIDATION: u64 = 2;
pub const TRADER_FLAG_DELEVERAGING: u64 = 4;

// Funding-rate limiting uses a 45 minute period: the one hour update
// interval with fifteen minutes as a buffer.
const FUNDING_LIMIT_PERIOD_SECONDS: i64 = 45 * ONE_MINUTE_IN_SECONDS as i64;

/// Largest absolute funding rate the ledger accepts, as a per-second rate.
pub fn funding_rate_max_abs_value() -> FundingRate {
    FundingRate::from_eight_hour_rate("0.0075").expect("valid rate literal")
}

/// Largest absolute per-second change of the funding rate over the limit
/// period.
pub fn funding_rate_max_abs_diff_per_second() -> FundingRate {
    let max = funding_rate_max_abs_value().value();
    FundingRate::new(
        max.mul_int(2)
            .checked_div_int(FUNDING_LIMIT_PERIOD_SECONDS, Rounding::Down)
            .expect("limit period is nonzero"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::I256;

    #[test]
    fn funding_limits_are_rounded_down() {
        // 0.0075 / 28800 seconds, truncated to the 18-decimal grid.
        assert_eq!(
            funding_rate_max_abs_value().value().scaled(),
            I256::from(260_416_666_666i64)
        );
        assert_eq!(
            funding_rate_max_abs_diff_per_second().value().scaled(),
            I256::from(192_901_234i64)
        );
    }
}
