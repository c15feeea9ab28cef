//! Structured hashing and multi-scheme signature handling.

pub mod eip712;
pub mod signature;

pub use eip712::Eip712Domain;
pub use signature::{SignatureType, SigningMethod, TypedSignature};
