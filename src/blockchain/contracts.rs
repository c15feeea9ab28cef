//! Contract bindings for the ledger and its orders trader contract.
//!
//! The interfaces are small and fixed, so the bindings are generated from
//! inline ABI JSON. (Inline tuple types in parameters/returns are not
//! supported by abigen's human-readable parser, so JSON is used instead.)

use ethers::prelude::abigen;

// The perpetual ledger proxy: balance/index/price getters plus the atomic
// `trade` settlement entry point. Trade args are
// (makerIndex, takerIndex, traderContract, data).
abigen!(
    PerpetualLedger,
    r#"[
        {"type":"function","name":"getAccountBalance","stateMutability":"view","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"bool"},{"name":"","type":"bool"},{"name":"","type":"uint120"},{"name":"","type":"uint120"}]},
        {"type":"function","name":"getAccountIndex","stateMutability":"view","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"uint32"},{"name":"","type":"bool"},{"name":"","type":"uint128"}]},
        {"type":"function","name":"getGlobalIndex","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint32"},{"name":"","type":"bool"},{"name":"","type":"uint128"}]},
        {"type":"function","name":"getOraclePrice","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"getMinCollateral","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"getAdmin","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"address"}]},
        {"type":"function","name":"getTokenContract","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"address"}]},
        {"type":"function","name":"getOracleContract","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"address"}]},
        {"type":"function","name":"getFunderContract","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"address"}]},
        {"type":"function","name":"getFinalSettlementEnabled","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"getIsGlobalOperator","stateMutability":"view","inputs":[{"name":"operator","type":"address"}],"outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"getIsLocalOperator","stateMutability":"view","inputs":[{"name":"account","type":"address"},{"name":"operator","type":"address"}],"outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"hasAccountPermissions","stateMutability":"view","inputs":[{"name":"account","type":"address"},{"name":"operator","type":"address"}],"outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"trade","stateMutability":"nonpayable","inputs":[{"name":"accounts","type":"address[]"},{"name":"trades","type":"tuple[]","components":[{"name":"","type":"uint256"},{"name":"","type":"uint256"},{"name":"","type":"address"},{"name":"","type":"bytes"}]}],"outputs":[{"name":"","type":"bool"}]}
    ]"#
);

// The orders trader contract: order approval/cancellation state.
abigen!(
    OrdersTrader,
    r#"[
        {"type":"function","name":"getOrdersStatus","stateMutability":"view","inputs":[{"name":"orderHashes","type":"bytes32[]"}],"outputs":[{"name":"","type":"tuple[]","components":[{"name":"","type":"uint8"},{"name":"","type":"uint256"}]}]}
    ]"#
);
