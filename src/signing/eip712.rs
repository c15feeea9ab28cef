//! EIP-712 structured hashing for orders and cancel-order messages.
//!
//! These hashes must match the ones the ledger's orders contract recomputes
//! on submission byte-for-byte; any deviation produces a signature the ledger
//! rejects.

use ethers::abi::Token;
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

use crate::models::order::Order;

pub const EIP712_DOMAIN_NAME: &str = "DexOrders";
pub const EIP712_DOMAIN_VERSION: &str = "1.0";

pub const EIP712_DOMAIN_STRING: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

pub const EIP712_ORDER_STRUCT_STRING: &str = "Order(\
    bytes32 flags,\
    uint256 amount,\
    uint256 limitPrice,\
    uint256 triggerPrice,\
    uint256 limitFee,\
    address maker,\
    address taker,\
    uint256 expiration\
    )";

pub const EIP712_CANCEL_ORDER_STRUCT_STRING: &str =
    "CancelLimitOrder(string action,bytes32[] orderHashes)";

/// Literal action string bound into every cancel-order message.
pub const CANCEL_ORDER_ACTION: &str = "Cancel Orders";

/// EIP-712 domain of one deployed orders contract.
///
/// The separator binds hashes to a chain id and contract address, so it must
/// be derived per deployment and never reused across them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Eip712Domain {
            name: EIP712_DOMAIN_NAME.to_string(),
            version: EIP712_DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract,
        }
    }

    /// The domain separator hash.
    pub fn separator(&self) -> H256 {
        let encoded = ethers::abi::encode(&[
            Token::FixedBytes(keccak256(EIP712_DOMAIN_STRING).to_vec()),
            Token::FixedBytes(keccak256(self.name.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(self.version.as_bytes()).to_vec()),
            Token::Uint(U256::from(self.chain_id)),
            Token::Address(self.verifying_contract),
        ]);
        H256::from(keccak256(encoded))
    }
}

pub fn hash_string(s: &str) -> H256 {
    H256::from(keccak256(s.as_bytes()))
}

/// Final signable hash: `keccak256(0x1901 || domainSeparator || structHash)`.
pub fn eip712_hash(domain_separator: H256, struct_hash: H256) -> H256 {
    let mut data = Vec::with_capacity(66);
    data.extend_from_slice(&[0x19, 0x01]);
    data.extend_from_slice(domain_separator.as_bytes());
    data.extend_from_slice(struct_hash.as_bytes());
    H256::from(keccak256(data))
}

/// Struct hash of an order. Fee sign travels in the packed flags; only the
/// fee magnitude is hashed.
pub fn order_struct_hash(order: &Order) -> H256 {
    let encoded = ethers::abi::encode(&[
        Token::FixedBytes(keccak256(EIP712_ORDER_STRUCT_STRING).to_vec()),
        Token::FixedBytes(order.pack_flags().as_bytes().to_vec()),
        Token::Uint(order.amount),
        Token::Uint(order.limit_price.to_solidity()),
        Token::Uint(order.trigger_price.to_solidity()),
        Token::Uint(order.limit_fee.abs_solidity()),
        Token::Address(order.maker),
        Token::Address(order.taker),
        Token::Uint(order.expiration),
    ]);
    H256::from(keccak256(encoded))
}

/// Final signable hash for approving an order.
pub fn order_hash(order: &Order, domain_separator: H256) -> H256 {
    eip712_hash(domain_separator, order_struct_hash(order))
}

/// Struct hash of a cancel-order message for one order hash.
///
/// The order hash enters as the packed hash of a one-element `bytes32[]`,
/// i.e. it is hashed a second time before being bound into the struct.
pub fn cancel_order_struct_hash(order_hash: H256) -> H256 {
    let encoded = ethers::abi::encode(&[
        Token::FixedBytes(keccak256(EIP712_CANCEL_ORDER_STRUCT_STRING).to_vec()),
        Token::FixedBytes(hash_string(CANCEL_ORDER_ACTION).as_bytes().to_vec()),
        Token::FixedBytes(keccak256(order_hash.as_bytes()).to_vec()),
    ]);
    H256::from(keccak256(encoded))
}

/// Final signable hash for canceling an order.
pub fn cancel_order_hash(order_hash: H256, domain_separator: H256) -> H256 {
    eip712_hash(domain_separator, cancel_order_struct_hash(order_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;
    use ethers::types::U256;
    use std::collections::HashSet;

    fn domain() -> Eip712Domain {
        Eip712Domain::new(
            1,
            "0x7a94831b66a7ae1948b1a94a9555a7efa99cb426".parse().unwrap(),
        )
    }

    #[test]
    fn domain_separator_depends_on_deployment() {
        let base = domain().separator();
        assert_ne!(base, H256::zero());

        let other_chain = Eip712Domain::new(42, domain().verifying_contract).separator();
        assert_ne!(base, other_chain);

        let other_contract = Eip712Domain::new(1, Address::zero()).separator();
        assert_ne!(base, other_contract);
    }

    #[test]
    fn order_hash_is_deterministic() {
        let order = sample_order();
        let separator = domain().separator();
        assert_eq!(order_hash(&order, separator), order_hash(&order, separator));
    }

    #[test]
    fn every_field_feeds_the_hash() {
        let separator = domain().separator();
        let base = sample_order();

        let mut variants = vec![base.clone()];
        {
            let mut o = base.clone();
            o.amount = o.amount + U256::one();
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.limit_price = "987.65433".parse().unwrap();
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.trigger_price = "1".parse().unwrap();
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.limit_fee = o.limit_fee.negated();
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.maker = "0x0000000000000000000000000000000000000001".parse().unwrap();
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.taker = "0x0000000000000000000000000000000000000002".parse().unwrap();
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.expiration = U256::from(1_700_000_000u64);
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.is_decrease_only = true;
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.is_buy = false;
            variants.push(o);
        }
        {
            let mut o = base.clone();
            o.salt = U256::from(9999u64);
            variants.push(o);
        }

        let hashes: HashSet<H256> = variants.iter().map(|o| order_hash(o, separator)).collect();
        assert_eq!(hashes.len(), variants.len(), "hash collision across field variants");
    }

    #[test]
    fn cancel_hash_differs_from_order_hash() {
        let separator = domain().separator();
        let order = order_hash(&sample_order(), separator);
        let cancel = cancel_order_hash(order, separator);
        assert_ne!(order, cancel);
        // Double hashing: binding the raw hash directly would give another value.
        assert_ne!(cancel_order_struct_hash(order), order);
    }
}
