//! EOS support: key encoding and canonical transaction signatures.

pub mod signer;

pub use signer::{ec_sign, sign_transactions, EosKeyPair};

use bitcoin::hashes::{ripemd160, Hash};

use crate::core::errors::WalletError;

const PUBLIC_KEY_PREFIX: &str = "EOS";

/// EOS public key: `EOS` + base58(compressed key ‖ ripemd160(key)[..4]).
pub fn encode_public_key(compressed: &[u8]) -> Result<String, WalletError> {
    if compressed.len() != 33 {
        return Err(WalletError::InvalidInput(
            "expected a compressed secp256k1 public key".to_string(),
        ));
    }
    let checksum = ripemd160::Hash::hash(compressed).to_byte_array();
    let mut payload = compressed.to_vec();
    payload.extend_from_slice(&checksum[..4]);
    Ok(format!("{}{}", PUBLIC_KEY_PREFIX, bs58::encode(payload).into_string()))
}

/// Inverse of [`encode_public_key`], checksum-verified.
pub fn decode_public_key(public_key: &str) -> Result<[u8; 33], WalletError> {
    let body = public_key
        .strip_prefix(PUBLIC_KEY_PREFIX)
        .ok_or_else(|| WalletError::InvalidInput(format!("not an EOS public key: {}", public_key)))?;
    let data = bs58::decode(body)
        .into_vec()
        .map_err(|_| WalletError::InvalidInput("EOS public key not base58".to_string()))?;
    if data.len() != 37 {
        return Err(WalletError::InvalidInput("EOS public key wrong length".to_string()));
    }
    let (key, checksum) = data.split_at(33);
    let expected = ripemd160::Hash::hash(key).to_byte_array();
    if expected[..4] != *checksum {
        return Err(WalletError::InvalidInput("EOS public key checksum mismatch".to_string()));
    }
    Ok(key.try_into().expect("33-byte key"))
}

/// Accept an EOS WIF (`5…`) or raw hex secret.
pub fn parse_private_key(input: &str) -> Result<[u8; 32], WalletError> {
    let trimmed = input.trim();
    if let Ok(bytes) = hex::decode(trimmed) {
        if bytes.len() == 32 {
            return Ok(bytes.try_into().expect("32-byte key"));
        }
    }
    let (key, version, compressed) = crate::chains::wif_decode(trimmed)?;
    if version != 0x80 || compressed {
        return Err(WalletError::InvalidInput("not an EOS WIF key".to_string()));
    }
    Ok(key)
}

/// EOS WIF export form (bitcoin-mainnet uncompressed WIF).
pub fn private_key_to_wif(key: &[u8; 32]) -> String {
    crate::chains::wif_encode(key, 0x80, false)
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EosSignData {
    /// Packed transaction, hex
    #[prost(string, tag = "1")]
    pub tx_hex: ::prost::alloc::string::String,
    /// Public keys whose signatures the chain requires
    #[prost(string, repeated, tag = "2")]
    pub public_keys: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EosTxInput {
    #[prost(string, tag = "1")]
    pub chain_id: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub transactions: ::prost::alloc::vec::Vec<EosSignData>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EosSignedTx {
    #[prost(string, tag = "1")]
    pub hash: ::prost::alloc::string::String,
    /// `SIG_K1_…` signatures, one per required key
    #[prost(string, repeated, tag = "2")]
    pub signatures: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EosTxOutput {
    #[prost(message, repeated, tag = "1")]
    pub transactions: ::prost::alloc::vec::Vec<EosSignedTx>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EosMessageInput {
    #[prost(string, tag = "1")]
    pub data: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub public_key: ::prost::alloc::string::String,
    #[prost(bool, tag = "3")]
    pub is_hex: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EosMessageOutput {
    #[prost(string, tag = "1")]
    pub signature: ::prost::alloc::string::String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    #[test]
    fn test_public_key_round_trip() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let compressed = PublicKey::from_secret_key(&secp, &secret).serialize();

        let encoded = encode_public_key(&compressed).unwrap();
        assert!(encoded.starts_with("EOS"));
        assert_eq!(decode_public_key(&encoded).unwrap(), compressed);
    }

    #[test]
    fn test_decode_rejects_tampered_checksum() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x22; 32]).unwrap();
        let compressed = PublicKey::from_secret_key(&secp, &secret).serialize();
        let encoded = encode_public_key(&compressed).unwrap();

        let mut tampered = encoded.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'1' { b'2' } else { b'1' };
        assert!(decode_public_key(&String::from_utf8(tampered).unwrap()).is_err());
    }

    #[test]
    fn test_private_key_wif_round_trip() {
        let mut key = [0u8; 32];
        key[31] = 1;
        let wif = private_key_to_wif(&key);
        assert_eq!(wif, "5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf");
        assert_eq!(parse_private_key(&wif).unwrap(), key);
        assert_eq!(parse_private_key(&hex::encode(key)).unwrap(), key);
    }

    #[test]
    fn test_parse_rejects_compressed_wif() {
        let key = [0x33u8; 32];
        let compressed_wif = crate::chains::wif_encode(&key, 0x80, true);
        assert!(parse_private_key(&compressed_wif).is_err());
    }
}
