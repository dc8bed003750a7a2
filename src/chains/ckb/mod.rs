//! Nervos CKB support: short addresses, molecule serialization and grouped
//! witness signing.

pub mod hash;
pub mod serializer;
pub mod signer;

pub use signer::sign_transaction;

use bech32::{Bech32, Hrp};

use crate::chains::ckb::hash::{blake2b_160, blake2b_256};
use crate::chains::ckb::serializer::Serializer;
use crate::core::errors::WalletError;

/// Short-format secp256k1 address: bech32(hrp, 0x01 ‖ 0x00 ‖ blake160(pubkey)).
pub fn address_from_public_key(compressed: &[u8], network: &str) -> Result<String, WalletError> {
    if compressed.len() != 33 {
        return Err(WalletError::InvalidInput(
            "expected a compressed secp256k1 public key".to_string(),
        ));
    }
    let prefix = match network {
        "TESTNET" => "ckt",
        _ => "ckb",
    };
    let hrp = Hrp::parse(prefix).map_err(|e| WalletError::CryptoError(format!("bad hrp: {:?}", e)))?;

    let mut payload = vec![0x01, 0x00];
    payload.extend_from_slice(&blake2b_160(compressed));
    bech32::encode::<Bech32>(hrp, &payload)
        .map_err(|e| WalletError::CryptoError(format!("bech32 encoding failed: {}", e)))
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutPoint {
    #[prost(bytes = "vec", tag = "1")]
    pub tx_hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(int32, tag = "2")]
    pub index: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Witness {
    #[prost(bytes = "vec", tag = "1")]
    pub lock: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub input_type: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub output_type: ::prost::alloc::vec::Vec<u8>,
}

impl Witness {
    fn optional_bytes(data: &[u8]) -> Vec<u8> {
        if data.is_empty() {
            vec![]
        } else {
            Serializer::serialize_fixed_vec(&[data])
        }
    }

    /// Molecule `WitnessArgs` table.
    pub fn serialize(&self) -> Vec<u8> {
        Serializer::serialize_dynamic_vec(&[
            Self::optional_bytes(&self.lock).as_slice(),
            Self::optional_bytes(&self.input_type).as_slice(),
            Self::optional_bytes(&self.output_type).as_slice(),
        ])
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Script {
    #[prost(bytes = "vec", tag = "1")]
    pub args: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub code_hash: ::prost::alloc::vec::Vec<u8>,
    /// `data` or `type`
    #[prost(string, tag = "3")]
    pub hash_type: ::prost::alloc::string::String,
}

impl Script {
    fn serialize_hash_type(&self) -> Result<Vec<u8>, WalletError> {
        match self.hash_type.as_str() {
            "data" => Ok(vec![0x00]),
            "type" => Ok(vec![0x01]),
            other => Err(WalletError::MalformedTransactionInput(format!(
                "invalid hash type: {}",
                other
            ))),
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, WalletError> {
        Ok(Serializer::serialize_dynamic_vec(&[
            self.code_hash.as_slice(),
            self.serialize_hash_type()?.as_slice(),
            Serializer::serialize_fixed_vec(&[self.args.as_slice()]).as_slice(),
        ]))
    }

    pub fn to_hash(&self) -> Result<[u8; 32], WalletError> {
        Ok(blake2b_256(&self.serialize()?))
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CellInput {
    #[prost(message, optional, tag = "1")]
    pub previous_output: ::core::option::Option<OutPoint>,
    #[prost(string, tag = "2")]
    pub since: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CachedCell {
    #[prost(int64, tag = "1")]
    pub capacity: i64,
    #[prost(message, optional, tag = "2")]
    pub lock: ::core::option::Option<Script>,
    #[prost(message, optional, tag = "3")]
    pub out_point: ::core::option::Option<OutPoint>,
    /// Relative derivation path of the key owning this cell (may be empty)
    #[prost(string, tag = "4")]
    pub derived_path: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CkbTxInput {
    #[prost(message, repeated, tag = "1")]
    pub inputs: ::prost::alloc::vec::Vec<CellInput>,
    #[prost(message, repeated, tag = "2")]
    pub witnesses: ::prost::alloc::vec::Vec<Witness>,
    #[prost(message, repeated, tag = "3")]
    pub cached_cells: ::prost::alloc::vec::Vec<CachedCell>,
    #[prost(bytes = "vec", tag = "4")]
    pub tx_hash: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CkbTxOutput {
    #[prost(bytes = "vec", tag = "1")]
    pub tx_hash: ::prost::alloc::vec::Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub witnesses: ::prost::alloc::vec::Vec<Witness>,
}
