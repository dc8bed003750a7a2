//! Ethereum support: EIP-55 addresses, EIP-155 transaction signing, EIP-191
//! personal message signing.

pub mod signer;

pub use signer::{personal_sign, sign_transaction};

use ethers::types::H160;
use ethers::utils::to_checksum;

use crate::core::errors::WalletError;
use crate::crypto::hash::keccak256;

/// EIP-55 checksummed address for an uncompressed (65-byte) public key.
pub fn address_from_public_key(public_key: &[u8]) -> Result<String, WalletError> {
    if public_key.len() != 65 || public_key[0] != 0x04 {
        return Err(WalletError::InvalidInput(
            "expected an uncompressed secp256k1 public key".to_string(),
        ));
    }
    let hash = keccak256(&public_key[1..]);
    let address = H160::from_slice(&hash[12..]);
    Ok(to_checksum(&address, None))
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthTxInput {
    /// Quantities accept decimal or 0x-prefixed hex
    #[prost(string, tag = "1")]
    pub nonce: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub to: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub value: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub gas_price: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub gas_limit: ::prost::alloc::string::String,
    /// Call data, hex (optional 0x prefix)
    #[prost(string, tag = "6")]
    pub data: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub chain_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthTxOutput {
    /// Signed RLP, hex without 0x
    #[prost(string, tag = "1")]
    pub signature: ::prost::alloc::string::String,
    /// keccak256 of the signed RLP, 0x-prefixed
    #[prost(string, tag = "2")]
    pub tx_hash: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthMessageInput {
    #[prost(string, tag = "1")]
    pub value: ::prost::alloc::string::String,
    /// true: `value` is hex bytes; false: UTF-8 text
    #[prost(bool, tag = "2")]
    pub is_hex: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthMessageOutput {
    /// 65-byte r‖s‖v signature, hex, v ∈ {27, 28}
    #[prost(string, tag = "1")]
    pub signature: ::prost::alloc::string::String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::hd;

    const ABANDON_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_abandon_mnemonic_reference_address() {
        let seed = hd::mnemonic_to_seed(ABANDON_MNEMONIC).unwrap();
        let pubkey = hd::derive_public_key_uncompressed(seed.as_ref(), "m/44'/60'/0'/0/0").unwrap();
        let address = address_from_public_key(&pubkey).unwrap();
        assert_eq!(address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    }

    #[test]
    fn test_rejects_compressed_key() {
        let seed = hd::mnemonic_to_seed(ABANDON_MNEMONIC).unwrap();
        let pubkey = hd::derive_public_key(seed.as_ref(), "m/44'/60'/0'/0/0").unwrap();
        assert!(address_from_public_key(&pubkey).is_err());
    }
}
