//! Bitcoin-fork (BITCOIN / LITECOIN) support: addresses + UTXO signing.

pub mod address;
pub mod signer;

pub use address::{
    address_from_public_key, is_valid_address, network_params, script_pubkey_for_address,
    BtcForkNetwork,
};
pub use signer::sign_transaction;

/// One unspent output funding a transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Utxo {
    #[prost(string, tag = "1")]
    pub tx_hash: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub vout: i32,
    #[prost(int64, tag = "3")]
    pub amount: i64,
    #[prost(string, tag = "4")]
    pub address: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub script_pub_key: ::prost::alloc::string::String,
    /// Relative path (`0/3` style) below the wallet's account; empty when
    /// the input belongs to a single-key wallet.
    #[prost(string, tag = "6")]
    pub derived_path: ::prost::alloc::string::String,
    #[prost(int64, tag = "7")]
    pub sequence: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BtcForkTxInput {
    #[prost(string, tag = "1")]
    pub to: ::prost::alloc::string::String,
    #[prost(int64, tag = "2")]
    pub amount: i64,
    #[prost(message, repeated, tag = "3")]
    pub unspents: ::prost::alloc::vec::Vec<Utxo>,
    #[prost(int64, tag = "4")]
    pub fee: i64,
    #[prost(uint32, tag = "5")]
    pub change_address_index: u32,
    #[prost(string, tag = "6")]
    pub change_address: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub network: ::prost::alloc::string::String,
    #[prost(string, tag = "8")]
    pub seg_wit: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BtcForkSignedTxOutput {
    /// Fully serialized signed transaction, hex
    #[prost(string, tag = "1")]
    pub signature: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub tx_hash: ::prost::alloc::string::String,
}
