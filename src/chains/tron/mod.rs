//! Tron support: base58check addresses and recoverable ECDSA signing.

pub mod signer;

pub use signer::{sign_message, sign_transaction};

use crate::chains::base58check_encode;
use crate::core::errors::WalletError;
use crate::crypto::hash::keccak256;

const ADDRESS_PREFIX: u8 = 0x41;

/// Tron address: base58check over `0x41 ‖ keccak256(pubkey)[12..]`.
pub fn address_from_public_key(public_key: &[u8]) -> Result<String, WalletError> {
    if public_key.len() != 65 || public_key[0] != 0x04 {
        return Err(WalletError::InvalidInput(
            "expected an uncompressed secp256k1 public key".to_string(),
        ));
    }
    let hash = keccak256(&public_key[1..]);
    let mut payload = vec![ADDRESS_PREFIX];
    payload.extend_from_slice(&hash[12..]);
    Ok(base58check_encode(&payload))
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TronTxInput {
    /// Serialized `raw_data` of the transaction, hex
    #[prost(string, tag = "1")]
    pub raw_data: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TronTxOutput {
    /// 65-byte r‖s‖id signatures, hex
    #[prost(string, repeated, tag = "1")]
    pub signatures: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TronMessageInput {
    #[prost(string, tag = "1")]
    pub value: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub is_hex: bool,
    /// false falls back to the Ethereum message header
    #[prost(bool, tag = "3")]
    pub is_tron_header: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TronMessageOutput {
    #[prost(string, tag = "1")]
    pub signature: ::prost::alloc::string::String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::hd;

    const TEST_MNEMONIC: &str =
        "inject kidney empty canal shadow pact comfort wife crush horse wife sketch";

    #[test]
    fn test_reference_address() {
        let seed = hd::mnemonic_to_seed(TEST_MNEMONIC).unwrap();
        let pubkey = hd::derive_public_key_uncompressed(seed.as_ref(), "m/44'/195'/0'/0/0").unwrap();
        let address = address_from_public_key(&pubkey).unwrap();
        assert_eq!(address, "TY2uroBeZ5trA9QT96aEWj32XLkAAhQ9R2");
    }

    #[test]
    fn test_address_prefix() {
        let seed = hd::mnemonic_to_seed(TEST_MNEMONIC).unwrap();
        let pubkey = hd::derive_public_key_uncompressed(seed.as_ref(), "m/44'/195'/0'/0/1").unwrap();
        let address = address_from_public_key(&pubkey).unwrap();
        assert!(address.starts_with('T'));
        assert!(address_from_public_key(&pubkey[..33]).is_err());
    }
}
