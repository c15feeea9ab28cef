//! Error types for the order engine

use thiserror::Error;

/// Malformed encoding detected locally. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid decimal string: {0:?}")]
    InvalidDecimal(String),

    #[error("decimal string has more than 18 fractional digits: {0:?}")]
    TooManyDecimals(String),

    #[error("value out of range for 18-decimal fixed point: {0}")]
    ValueOutOfRange(String),

    #[error("negative value where an unsigned value is required: {0}")]
    NegativeValue(String),

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid signature encoding: {0:?}")]
    InvalidSignature(String),

    #[error("unknown signature type tag: {0}")]
    UnknownSignatureType(u8),

    #[error("unknown order status code: {0}")]
    UnknownOrderStatus(u8),
}

/// Crate-level error taxonomy.
///
/// `Format`, `Argument` and `State` are always raised before any ledger call
/// is made. `Remote` carries the ledger's revert reason verbatim when one can
/// be decoded, otherwise the transport error text.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("argument error: {0}")]
    Argument(String),

    #[error("state error: {0}")]
    State(String),

    #[error("ledger call failed: {0}")]
    Remote(String),

    #[error("signer error: {0}")]
    Signer(String),
}

impl EngineError {
    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        EngineError::Argument(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        EngineError::State(msg.into())
    }

    pub(crate) fn remote(msg: impl Into<String>) -> Self {
        EngineError::Remote(msg.into())
    }
}
