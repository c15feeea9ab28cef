//! Order model, flag packing and on-ledger order status.

use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::models::value::{Fee, Price};
use crate::signing::signature::TypedSignature;

/// Bit 0 of the packed flag byte.
pub const FLAG_IS_BUY: u8 = 1;
/// Bit 1 of the packed flag byte.
pub const FLAG_IS_DECREASE_ONLY: u8 = 2;
/// Bit 2 of the packed flag byte.
pub const FLAG_IS_NEGATIVE_LIMIT_FEE: u8 = 4;

/// A limit order, immutable once constructed.
///
/// A zero `taker` means "any taker", a zero `trigger_price` means "no
/// trigger", and a zero `expiration` means "never expires". Changing any field
/// after signing requires a new salt and a new signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub is_buy: bool,
    /// Only valid if the fill reduces the maker's position without flipping
    /// its sign.
    pub is_decrease_only: bool,
    /// Position size in integer base units.
    pub amount: U256,
    pub limit_price: Price,
    pub trigger_price: Price,
    /// Negative limit fee = maker rebate.
    pub limit_fee: Fee,
    pub maker: Address,
    pub taker: Address,
    /// Unix timestamp in seconds.
    pub expiration: U256,
    /// Arbitrary entropy making the order hash unique.
    pub salt: U256,
}

impl Order {
    pub fn fee_is_negative(&self) -> bool {
        self.limit_fee.is_negative()
    }

    /// Packs the order's booleans and salt into the 32-byte `flags` hash
    /// field.
    ///
    /// Byte layout (big-endian): bytes 0..31 hold the salt's low 31 bytes
    /// right-aligned, byte 31 holds the flag bits, i.e.
    /// `flags = (salt << 8) | flagByte`. The salt doubles as hash entropy
    /// while the flag bits stay inspectable from the low byte.
    pub fn pack_flags(&self) -> H256 {
        let mut flag_byte = 0u8;
        if self.is_buy {
            flag_byte |= FLAG_IS_BUY;
        }
        if self.is_decrease_only {
            flag_byte |= FLAG_IS_DECREASE_ONLY;
        }
        if self.fee_is_negative() {
            flag_byte |= FLAG_IS_NEGATIVE_LIMIT_FEE;
        }

        let mut salt_bytes = [0u8; 32];
        self.salt.to_big_endian(&mut salt_bytes);
        let mut packed = [0u8; 32];
        packed[..31].copy_from_slice(&salt_bytes[1..]);
        packed[31] = flag_byte;
        H256::from(packed)
    }
}

/// Inverse of [`Order::pack_flags`]: (salt low 31 bytes, isBuy,
/// isDecreaseOnly, isNegativeLimitFee).
pub fn unpack_flags(flags: H256) -> (U256, bool, bool, bool) {
    let bytes = flags.as_bytes();
    let flag_byte = bytes[31];
    let mut salt_bytes = [0u8; 32];
    salt_bytes[1..].copy_from_slice(&bytes[..31]);
    (
        U256::from_big_endian(&salt_bytes),
        flag_byte & FLAG_IS_BUY != 0,
        flag_byte & FLAG_IS_DECREASE_ONLY != 0,
        flag_byte & FLAG_IS_NEGATIVE_LIMIT_FEE != 0,
    )
}

/// An order plus the signature that authorizes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedOrder {
    pub order: Order,
    pub typed_signature: TypedSignature,
}

/// On-ledger status of an order hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    Untracked = 0,
    Approved = 1,
    Canceled = 2,
}

impl TryFrom<u8> for OrderStatus {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, FormatError> {
        match value {
            0 => Ok(OrderStatus::Untracked),
            1 => Ok(OrderStatus::Approved),
            2 => Ok(OrderStatus::Canceled),
            other => Err(FormatError::UnknownOrderStatus(other)),
        }
    }
}

/// Status and cumulative filled amount for one order hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    pub status: OrderStatus,
    pub filled_amount: U256,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_order() -> Order {
        Order {
            is_buy: true,
            is_decrease_only: false,
            amount: U256::exp10(18),
            limit_price: "987.65432".parse().unwrap(),
            trigger_price: Price::zero(),
            limit_fee: "0.002".parse().unwrap(),
            maker: "0x06012c8cf97bead5deae237070f9587f8e7a266d".parse().unwrap(),
            taker: Address::zero(),
            expiration: U256::zero(),
            salt: U256::from_dec_str("425").unwrap(),
        }
    }

    #[test]
    fn flag_bits_round_trip() {
        let mut order = sample_order();
        order.salt = U256::from(0x1234_5678u64);

        let (salt, is_buy, is_decrease_only, fee_negative) = unpack_flags(order.pack_flags());
        assert_eq!(salt, order.salt);
        assert!(is_buy);
        assert!(!is_decrease_only);
        assert!(!fee_negative);
    }

    #[test]
    fn negative_limit_fee_sets_flag_bit() {
        let mut order = sample_order();
        order.limit_fee = Fee::from_bips("-2.5").unwrap();

        let flags = order.pack_flags();
        assert_eq!(flags.as_bytes()[31] & FLAG_IS_NEGATIVE_LIMIT_FEE, FLAG_IS_NEGATIVE_LIMIT_FEE);
        let (_, _, _, fee_negative) = unpack_flags(flags);
        assert!(fee_negative);
    }

    #[test]
    fn salt_occupies_high_bytes() {
        let mut order = sample_order();
        order.is_buy = false;
        order.salt = U256::MAX;

        let flags = order.pack_flags();
        // Only the salt's low 31 bytes survive packing.
        let (salt, is_buy, _, _) = unpack_flags(flags);
        assert_eq!(salt, U256::MAX >> 8);
        assert!(!is_buy);
        assert_eq!(flags.as_bytes()[31], 0);
    }

    #[test]
    fn unknown_status_code_is_rejected() {
        assert!(OrderStatus::try_from(2).is_ok());
        assert!(OrderStatus::try_from(3).is_err());
    }
}
