//! Order lifecycle service: hashing, signing, verification, fee tiers,
//! ledger encodings and the collateralization simulator.

use ethers::abi::Token;
use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, H256, U256};
use serde_json::json;

use crate::config::{EngineConfig, FeeTiers};
use crate::error::EngineError;
use crate::models::balance::{Balance, BalanceUpdate, Collateralization};
use crate::models::order::{Order, SignedOrder};
use crate::models::value::{BaseValue, Fee, Price, Rounding};
use crate::signing::eip712::{self, Eip712Domain};
use crate::signing::signature::{self, SigningMethod, TypedSignature};

/// Width the hex-encoded signature is padded to inside trade data.
const SIGNATURE_PADDED_LEN: usize = 96;

/// Order operations against one deployed orders contract.
///
/// The EIP-712 domain separator is derived once per instance; a different
/// deployment (chain id or contract address) needs a different service.
#[derive(Debug, Clone)]
pub struct OrderService {
    domain: Eip712Domain,
    domain_separator: H256,
    fees: FeeTiers,
}

impl OrderService {
    pub fn new(chain_id: u64, orders_contract: Address, fees: FeeTiers) -> Self {
        let domain = Eip712Domain::new(chain_id, orders_contract);
        let domain_separator = domain.separator();
        OrderService {
            domain,
            domain_separator,
            fees,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self::new(config.chain_id, config.orders()?, config.fee_tiers()?))
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn domain_separator(&self) -> H256 {
        self.domain_separator
    }

    /// Address of the orders trader contract this service hashes against.
    pub fn address(&self) -> Address {
        self.domain.verifying_contract
    }

    // ============ Hashing ============

    /// Final signable EIP-712 hash for approving an order.
    pub fn order_hash(&self, order: &Order) -> H256 {
        eip712::order_hash(order, self.domain_separator)
    }

    /// Final signable EIP-712 hash for canceling the order with the given
    /// hash.
    pub fn cancel_order_hash(&self, order_hash: H256) -> H256 {
        eip712::cancel_order_hash(order_hash, self.domain_separator)
    }

    // ============ Signing ============

    pub fn sign_order(
        &self,
        wallet: &LocalWallet,
        order: &Order,
        method: SigningMethod,
    ) -> Result<TypedSignature, EngineError> {
        signature::sign_hash(wallet, self.order_hash(order), method)
    }

    pub fn signed_order(
        &self,
        wallet: &LocalWallet,
        order: Order,
        method: SigningMethod,
    ) -> Result<SignedOrder, EngineError> {
        let typed_signature = self.sign_order(wallet, &order, method)?;
        Ok(SignedOrder {
            order,
            typed_signature,
        })
    }

    pub fn sign_cancel_order(
        &self,
        wallet: &LocalWallet,
        order: &Order,
        method: SigningMethod,
    ) -> Result<TypedSignature, EngineError> {
        self.sign_cancel_order_by_hash(wallet, self.order_hash(order), method)
    }

    pub fn sign_cancel_order_by_hash(
        &self,
        wallet: &LocalWallet,
        order_hash: H256,
        method: SigningMethod,
    ) -> Result<TypedSignature, EngineError> {
        signature::sign_hash(wallet, self.cancel_order_hash(order_hash), method)
    }

    // ============ Signature Verification ============

    /// Whether the signed order carries a valid maker signature.
    pub fn order_has_valid_signature(&self, signed: &SignedOrder) -> bool {
        signature::verify(
            self.order_hash(&signed.order),
            &signed.typed_signature,
            signed.order.maker,
        )
    }

    pub fn order_by_hash_has_valid_signature(
        order_hash: H256,
        typed_signature: &TypedSignature,
        expected_signer: Address,
    ) -> bool {
        signature::verify(order_hash, typed_signature, expected_signer)
    }

    pub fn cancel_order_has_valid_signature(
        &self,
        order: &Order,
        typed_signature: &TypedSignature,
    ) -> bool {
        signature::verify(
            self.cancel_order_hash(self.order_hash(order)),
            typed_signature,
            order.maker,
        )
    }

    // ============ Ledger Encodings ============

    /// ABI-encodes the order's struct fields in canonical order.
    pub fn order_to_bytes(&self, order: &Order) -> Bytes {
        Bytes::from(ethers::abi::encode(&[
            Token::FixedBytes(order.pack_flags().as_bytes().to_vec()),
            Token::Uint(order.amount),
            Token::Uint(order.limit_price.to_solidity()),
            Token::Uint(order.trigger_price.to_solidity()),
            Token::Uint(order.limit_fee.abs_solidity()),
            Token::Address(order.maker),
            Token::Address(order.taker),
            Token::Uint(order.expiration),
        ]))
    }

    /// Builds the opaque trade data for filling a signed order: order fields,
    /// then fill terms, then the signature padded to a fixed width.
    pub fn fill_to_trade_data(
        &self,
        signed: &SignedOrder,
        amount: U256,
        price: &Price,
        fee: &Fee,
    ) -> Bytes {
        let order_data = self.order_to_bytes(&signed.order);
        let fill_data = ethers::abi::encode(&[
            Token::Uint(amount),
            Token::Uint(price.to_solidity()),
            Token::Uint(fee.abs_solidity()),
            Token::Bool(fee.is_negative()),
        ]);
        let mut signature_data = signed.typed_signature.to_bytes();
        signature_data.resize(SIGNATURE_PADDED_LEN, 0);

        let mut data = Vec::with_capacity(order_data.len() + fill_data.len() + signature_data.len());
        data.extend_from_slice(&order_data);
        data.extend_from_slice(&fill_data);
        data.extend_from_slice(&signature_data);
        Bytes::from(data)
    }

    // ============ Fees ============

    /// Fee rate for an order of the given size. Makers earn the configured
    /// rebate; takers pay the small-order tier below the size threshold.
    pub fn fee_for_order(&self, amount: U256, is_taker: bool) -> Fee {
        if !is_taker {
            return self.fees.maker_rebate;
        }
        if amount < self.fees.small_order_threshold {
            self.fees.small_order_fee
        } else {
            self.fees.large_order_fee
        }
    }

    // ============ Fill Simulation ============

    /// Effect of one fill on the maker's balance, following the ledger's
    /// settlement arithmetic exactly. Fills settle whole position units; the
    /// per-unit fee truncates to 18 decimals toward zero.
    pub fn balance_updates_after_filling_order(
        fill_amount: BaseValue,
        fill_price: &Price,
        fill_fee: &Fee,
        is_buy: bool,
    ) -> BalanceUpdate {
        let position_amount = fill_amount.round_to_units(Rounding::Down);
        let fee = fill_fee.value().base_mul(fill_price.value(), Rounding::Down);
        let margin_per_position = if is_buy {
            fill_price.value() + fee
        } else {
            fill_price.value() - fee
        };
        let margin_amount = BaseValue::from_scaled(position_amount * margin_per_position.scaled())
            .round_to_units(Rounding::Down);
        BalanceUpdate {
            margin_delta: if is_buy { -margin_amount } else { margin_amount },
            position_delta: if is_buy { position_amount } else { -position_amount },
        }
    }

    /// Estimates the maker's collateralization after a sequence of fills.
    ///
    /// Every order is assumed to share one maker and to fill at its limit
    /// price and limit fee. Fill amounts are denominated in the currency the
    /// maker spends: quote when buying, base when selling. No ledger calls
    /// are made; oracle price and balances must be passed in.
    pub fn account_collateralization_after_making_orders(
        &self,
        initial_balance: &Balance,
        oracle_price: &Price,
        orders: &[Order],
        maker_token_fill_amounts: &[U256],
    ) -> Result<Collateralization, EngineError> {
        if orders.len() != maker_token_fill_amounts.len() {
            return Err(EngineError::argument(format!(
                "got {} orders but {} fill amounts",
                orders.len(),
                maker_token_fill_amounts.len()
            )));
        }

        let mut running_balance = *initial_balance;
        for (order, fill) in orders.iter().zip(maker_token_fill_amounts) {
            let spent = BaseValue::from_u256_units(*fill)?;
            let fill_amount = if order.is_buy {
                spent
                    .checked_base_div(order.limit_price.value(), Rounding::Down)
                    .ok_or_else(|| EngineError::argument("buy order has zero limit price"))?
            } else {
                spent
            };
            let update = Self::balance_updates_after_filling_order(
                fill_amount,
                &order.limit_price,
                &order.limit_fee,
                order.is_buy,
            );
            running_balance = running_balance.apply(&update);
        }

        Ok(running_balance.get_collateralization(oracle_price))
    }

    // ============ Typed-Data Export ============

    /// The complete `eth_signTypedData_v4` object for an order, for signing
    /// backends that take the structured form rather than a digest.
    pub fn order_typed_data(&self, order: &Order) -> serde_json::Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Order": [
                    { "name": "flags", "type": "bytes32" },
                    { "name": "amount", "type": "uint256" },
                    { "name": "limitPrice", "type": "uint256" },
                    { "name": "triggerPrice", "type": "uint256" },
                    { "name": "limitFee", "type": "uint256" },
                    { "name": "maker", "type": "address" },
                    { "name": "taker", "type": "address" },
                    { "name": "expiration", "type": "uint256" }
                ]
            },
            "primaryType": "Order",
            "domain": {
                "name": self.domain.name,
                "version": self.domain.version,
                "chainId": self.domain.chain_id,
                "verifyingContract": format!("{:?}", self.domain.verifying_contract)
            },
            "message": {
                "flags": format!("{:?}", order.pack_flags()),
                "amount": order.amount.to_string(),
                "limitPrice": order.limit_price.to_solidity().to_string(),
                "triggerPrice": order.trigger_price.to_solidity().to_string(),
                "limitFee": order.limit_fee.abs_solidity().to_string(),
                "maker": format!("{:?}", order.maker),
                "taker": format!("{:?}", order.taker),
                "expiration": order.expiration.to_string()
            }
        })
    }

    /// The `eth_signTypedData_v4` object for canceling an order.
    pub fn cancel_order_typed_data(&self, order_hash: H256) -> serde_json::Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "CancelLimitOrder": [
                    { "name": "action", "type": "string" },
                    { "name": "orderHashes", "type": "bytes32[]" }
                ]
            },
            "primaryType": "CancelLimitOrder",
            "domain": {
                "name": self.domain.name,
                "version": self.domain.version,
                "chainId": self.domain.chain_id,
                "verifyingContract": format!("{:?}", self.domain.verifying_contract)
            },
            "message": {
                "action": eip712::CANCEL_ORDER_ACTION,
                "orderHashes": [format!("{:?}", order_hash)]
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;
    use ethers::signers::Signer;
    use rust_decimal_macros::dec;

    fn service() -> OrderService {
        OrderService::new(
            1,
            "0x3ea85ea49dacd5300174df20b9d2b0246aa02707".parse().unwrap(),
            FeeTiers::default(),
        )
    }

    fn wallet() -> LocalWallet {
        "4c0883a69102937d6231471b5dbb6204fe512961708279feb1be6ae5538da033"
            .parse()
            .unwrap()
    }

    fn maker_order() -> Order {
        let mut order = sample_order();
        order.maker = wallet().address();
        order
    }

    #[test]
    fn signed_order_verifies_for_all_methods() {
        let service = service();
        for method in [
            SigningMethod::Hash,
            SigningMethod::UnsafeHash,
            SigningMethod::Compatibility,
            SigningMethod::TypedData,
        ] {
            let signed = service.signed_order(&wallet(), maker_order(), method).unwrap();
            assert!(service.order_has_valid_signature(&signed), "{method:?}");
        }
    }

    #[test]
    fn cancel_signature_does_not_authorize_the_order() {
        let service = service();
        let order = maker_order();
        let cancel_sig = service
            .sign_cancel_order(&wallet(), &order, SigningMethod::Hash)
            .unwrap();
        assert!(service.cancel_order_has_valid_signature(&order, &cancel_sig));

        let signed = SignedOrder {
            order,
            typed_signature: cancel_sig,
        };
        assert!(!service.order_has_valid_signature(&signed));
    }

    #[test]
    fn trade_data_layout() {
        let service = service();
        let signed = service
            .signed_order(&wallet(), maker_order(), SigningMethod::Hash)
            .unwrap();
        let fee = service.fee_for_order(signed.order.amount, true);
        let price = signed.order.limit_price;
        let data = service.fill_to_trade_data(&signed, signed.order.amount, &price, &fee);

        // 8 order words + 4 fill words + padded signature.
        assert_eq!(data.len(), 8 * 32 + 4 * 32 + SIGNATURE_PADDED_LEN);
        let signature_bytes = signed.typed_signature.to_bytes();
        assert_eq!(&data[384..384 + 66], signature_bytes.as_slice());
        assert!(data[384 + 66..].iter().all(|&b| b == 0));
    }

    #[test]
    fn fee_tiers() {
        let service = service();
        assert!(service.fee_for_order(U256::zero(), false).is_negative());
        assert_eq!(
            service.fee_for_order(U256::from(1u64), true).to_string(),
            "0.005"
        );
        assert_eq!(
            service.fee_for_order(U256::from(60_000_000u64), true).to_string(),
            "0.0015"
        );
        assert_eq!(service.fee_for_order(U256::MAX, false).to_string(), "-0.00025");
    }

    #[test]
    fn buy_fill_spends_margin_and_gains_position() {
        let fill_amount: BaseValue = "10".parse().unwrap();
        let price: Price = "100".parse().unwrap();
        let fee: Fee = "0.002".parse().unwrap();

        let update =
            OrderService::balance_updates_after_filling_order(fill_amount, &price, &fee, true);
        // fee/unit = 0.2; margin/unit = 100.2; 10 units cost 1002.
        assert_eq!(update.position_delta, ethers::types::I256::from(10));
        assert_eq!(update.margin_delta, ethers::types::I256::from(-1002));

        let update =
            OrderService::balance_updates_after_filling_order(fill_amount, &price, &fee, false);
        // Selling earns price minus fee: 10 * 99.8 = 998.
        assert_eq!(update.position_delta, ethers::types::I256::from(-10));
        assert_eq!(update.margin_delta, ethers::types::I256::from(998));
    }

    #[test]
    fn collateralization_matches_worked_example() {
        // Balance (0, 0); one buy of amount 1e18 at limit price 987.65432
        // with a 20 bip fee, oracle at 1200. Expected ratio:
        // 1200 / (987.65432 * 1.002).
        let service = service();
        let mut order = maker_order();
        order.is_buy = true;
        order.limit_price = "987.65432".parse().unwrap();
        order.limit_fee = "0.002".parse().unwrap();

        let ratio = service
            .account_collateralization_after_making_orders(
                &Balance::zero(),
                &"1200".parse().unwrap(),
                &[order],
                &[U256::exp10(18)],
            )
            .unwrap();

        let ratio = match ratio {
            Collateralization::Finite(r) => r.to_decimal().unwrap(),
            Collateralization::Infinite => panic!("expected a finite ratio"),
        };
        let expected = dec!(1200) / (dec!(987.65432) * dec!(1.002));
        let error = (ratio - expected).abs();
        assert!(error < dec!(0.000000000000001), "error {error} too large");
    }

    #[test]
    fn fills_leaving_no_negative_exposure_are_infinite() {
        let service = service();
        let mut order = maker_order();
        order.is_buy = false;

        let ratio = service
            .account_collateralization_after_making_orders(
                &Balance::zero(),
                &"1200".parse().unwrap(),
                &[order],
                &[U256::zero()],
            )
            .unwrap();
        assert!(ratio.is_infinite());
    }

    #[test]
    fn mismatched_fill_amounts_are_rejected() {
        let service = service();
        let result = service.account_collateralization_after_making_orders(
            &Balance::zero(),
            &"1200".parse().unwrap(),
            &[maker_order()],
            &[],
        );
        assert!(matches!(result, Err(EngineError::Argument(_))));
    }

    #[test]
    fn zero_limit_price_buy_is_rejected() {
        let service = service();
        let mut order = maker_order();
        order.is_buy = true;
        order.limit_price = Price::zero();
        let result = service.account_collateralization_after_making_orders(
            &Balance::zero(),
            &"1200".parse().unwrap(),
            &[order],
            &[U256::exp10(18)],
        );
        assert!(matches!(result, Err(EngineError::Argument(_))));
    }

    #[test]
    fn typed_data_carries_the_domain() {
        let service = service();
        let data = service.order_typed_data(&maker_order());
        assert_eq!(data["primaryType"], "Order");
        assert_eq!(data["domain"]["name"], "DexOrders");
        assert_eq!(data["domain"]["chainId"], 1);
        let cancel = service.cancel_order_typed_data(H256::zero());
        assert_eq!(cancel["message"]["action"], "Cancel Orders");
    }
}
