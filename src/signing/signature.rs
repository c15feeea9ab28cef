//! Typed signatures: creation, recovery and verification.
//!
//! The wire format is 66 bytes, hex-encoded: the 65-byte `r || s || v`
//! signature followed by a one-byte scheme tag telling the ledger how the
//! signed digest was derived from the order hash.

use std::fmt;
use std::str::FromStr;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature, H256};
use ethers::utils::{hash_message, keccak256};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, FormatError};

/// Personal-message prefix for hashes signed as a raw 32-byte payload.
const PREPEND_HEX: &[u8] = b"\x19Ethereum Signed Message:\n\x20";

/// How the signed digest was derived from the hash being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignatureType {
    /// The hash was signed as-is.
    NoPrepend = 0,
    /// The hash was signed under the `"\x19Ethereum Signed Message:\n32"`
    /// personal-message prefix.
    Decimal = 1,
    /// As `Decimal`, but with the length byte `\x20` instead of the decimal
    /// string `"32"`.
    Hexadecimal = 2,
}

impl TryFrom<u8> for SignatureType {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, FormatError> {
        match value {
            0 => Ok(SignatureType::NoPrepend),
            1 => Ok(SignatureType::Decimal),
            2 => Ok(SignatureType::Hexadecimal),
            other => Err(FormatError::UnknownSignatureType(other)),
        }
    }
}

/// How to produce a signature for a given hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMethod {
    /// Sign the prefixed hash; tagged [`SignatureType::Decimal`].
    Hash,
    /// Sign the raw hash with no prefix; tagged [`SignatureType::NoPrepend`].
    UnsafeHash,
    /// Obtain the backend's personal-message signature once, then try each
    /// tag in order and keep the first that verifies. Exists to interoperate
    /// with signing backends whose prefix behavior is not known in advance.
    Compatibility,
    /// Provider-native structured-data signing: the hash is already the final
    /// EIP-712 digest, signed raw; tagged [`SignatureType::NoPrepend`].
    TypedData,
}

/// A raw ECDSA signature plus its scheme tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedSignature {
    signature: Signature,
    sig_type: SignatureType,
}

impl TypedSignature {
    pub fn new(signature: Signature, sig_type: SignatureType) -> Self {
        TypedSignature {
            signature,
            sig_type,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn sig_type(&self) -> SignatureType {
        self.sig_type
    }

    /// 66-byte wire form: `r || s || v || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.signature.to_vec();
        bytes.push(self.sig_type as u8);
        bytes
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != 66 {
            return Err(FormatError::InvalidSignature(format!(
                "expected 66 bytes, got {}",
                bytes.len()
            )));
        }
        let signature = Signature::try_from(&bytes[..65])
            .map_err(|e| FormatError::InvalidSignature(e.to_string()))?;
        let sig_type = SignatureType::try_from(bytes[65])?;
        Ok(TypedSignature {
            signature,
            sig_type,
        })
    }
}

impl FromStr for TypedSignature {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, FormatError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(stripped).map_err(|e| FormatError::InvalidSignature(e.to_string()))?;
        TypedSignature::from_bytes(&bytes)
    }
}

impl fmt::Display for TypedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for TypedSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TypedSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// The digest a given scheme actually signs for `hash`.
fn digest_for(hash: H256, sig_type: SignatureType) -> H256 {
    match sig_type {
        SignatureType::NoPrepend => hash,
        SignatureType::Decimal => hash_message(hash.as_bytes()),
        SignatureType::Hexadecimal => {
            let mut data = Vec::with_capacity(PREPEND_HEX.len() + 32);
            data.extend_from_slice(PREPEND_HEX);
            data.extend_from_slice(hash.as_bytes());
            H256::from(keccak256(data))
        }
    }
}

/// Signs `hash` with the requested method.
pub fn sign_hash(
    wallet: &LocalWallet,
    hash: H256,
    method: SigningMethod,
) -> Result<TypedSignature, EngineError> {
    let signer_error = |e: ethers::signers::WalletError| EngineError::Signer(e.to_string());
    match method {
        SigningMethod::Hash => {
            let raw = wallet
                .sign_hash(digest_for(hash, SignatureType::Decimal))
                .map_err(signer_error)?;
            Ok(TypedSignature::new(raw, SignatureType::Decimal))
        }
        SigningMethod::UnsafeHash => {
            let raw = wallet.sign_hash(hash).map_err(signer_error)?;
            Ok(TypedSignature::new(raw, SignatureType::NoPrepend))
        }
        SigningMethod::TypedData => {
            let raw = wallet.sign_hash(hash).map_err(signer_error)?;
            Ok(TypedSignature::new(raw, SignatureType::NoPrepend))
        }
        SigningMethod::Compatibility => {
            // One raw signature from the backend, then an ordered list of
            // candidate interpretations. New schemes slot into the list.
            let raw = wallet
                .sign_hash(digest_for(hash, SignatureType::Decimal))
                .map_err(signer_error)?;
            for sig_type in [SignatureType::NoPrepend, SignatureType::Decimal] {
                let candidate = TypedSignature::new(raw, sig_type);
                if verify(hash, &candidate, wallet.address()) {
                    return Ok(candidate);
                }
            }
            Ok(TypedSignature::new(raw, SignatureType::Decimal))
        }
    }
}

/// Recovers the signer for `hash` under the signature's scheme. `None` for
/// unrecoverable signatures.
pub fn recover_signer(hash: H256, typed_signature: &TypedSignature) -> Option<Address> {
    typed_signature
        .signature()
        .recover(digest_for(hash, typed_signature.sig_type()))
        .ok()
}

/// Whether `typed_signature` is a valid signature over `hash` by
/// `expected_signer`.
pub fn verify(hash: H256, typed_signature: &TypedSignature, expected_signer: Address) -> bool {
    recover_signer(hash, typed_signature) == Some(expected_signer)
}

/// Hex-string entry point used on untrusted input. Malformed encodings and
/// unknown tags verify as `false`; this never fails, so batch checks degrade
/// to rejection instead of aborting.
pub fn hash_has_valid_signature(hash: H256, typed_signature: &str, expected_signer: Address) -> bool {
    match typed_signature.parse::<TypedSignature>() {
        Ok(sig) => verify(hash, &sig, expected_signer),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> LocalWallet {
        "4c0883a69102937d6231471b5dbb6204fe512961708279feb1be6ae5538da033"
            .parse()
            .unwrap()
    }

    fn test_hash() -> H256 {
        H256::from(keccak256(b"an order hash"))
    }

    #[test]
    fn hash_method_signs_with_prefix() {
        let sig = sign_hash(&wallet(), test_hash(), SigningMethod::Hash).unwrap();
        assert_eq!(sig.sig_type(), SignatureType::Decimal);
        assert!(verify(test_hash(), &sig, wallet().address()));
        assert_eq!(recover_signer(test_hash(), &sig), Some(wallet().address()));
    }

    #[test]
    fn unsafe_hash_signs_raw() {
        let sig = sign_hash(&wallet(), test_hash(), SigningMethod::UnsafeHash).unwrap();
        assert_eq!(sig.sig_type(), SignatureType::NoPrepend);
        assert!(verify(test_hash(), &sig, wallet().address()));
    }

    #[test]
    fn typed_data_matches_unsafe_hash_digest() {
        let sig = sign_hash(&wallet(), test_hash(), SigningMethod::TypedData).unwrap();
        assert_eq!(sig.sig_type(), SignatureType::NoPrepend);
        assert!(verify(test_hash(), &sig, wallet().address()));
    }

    #[test]
    fn compatibility_always_yields_a_verifying_tag() {
        let sig = sign_hash(&wallet(), test_hash(), SigningMethod::Compatibility).unwrap();
        assert!(verify(test_hash(), &sig, wallet().address()));
        // The raw signature carries the personal-message prefix, so the
        // no-prepend interpretation fails and the decimal tag wins.
        assert_eq!(sig.sig_type(), SignatureType::Decimal);
    }

    #[test]
    fn wrong_signer_does_not_verify() {
        let sig = sign_hash(&wallet(), test_hash(), SigningMethod::Hash).unwrap();
        assert!(!verify(test_hash(), &sig, Address::zero()));
    }

    #[test]
    fn wire_round_trip() {
        let sig = sign_hash(&wallet(), test_hash(), SigningMethod::Hash).unwrap();
        let hex_form = sig.to_hex();
        assert_eq!(hex_form.len(), 2 + 66 * 2);
        assert!(hex_form.ends_with("01"));
        let parsed: TypedSignature = hex_form.parse().unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn malformed_signatures_verify_false() {
        let signer = wallet().address();
        assert!(!hash_has_valid_signature(test_hash(), "0x1234", signer));
        assert!(!hash_has_valid_signature(test_hash(), "not hex at all", signer));
        assert!(!hash_has_valid_signature(test_hash(), "", signer));

        // Unknown tag byte on an otherwise valid signature.
        let sig = sign_hash(&wallet(), test_hash(), SigningMethod::Hash).unwrap();
        let mut bytes = sig.to_bytes();
        bytes[65] = 9;
        let tagged = format!("0x{}", hex::encode(bytes));
        assert!(!hash_has_valid_signature(test_hash(), &tagged, signer));
    }

    #[test]
    fn hexadecimal_prefix_differs_from_decimal() {
        assert_ne!(
            digest_for(test_hash(), SignatureType::Decimal),
            digest_for(test_hash(), SignatureType::Hexadecimal)
        );
        assert_ne!(
            digest_for(test_hash(), SignatureType::NoPrepend),
            digest_for(test_hash(), SignatureType::Decimal)
        );
    }
}
