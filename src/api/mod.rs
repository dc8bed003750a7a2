//! Wire messages for the bridge surface.
//!
//! Field numbers are part of the contract: clients marshal against these
//! exact tags, so they never change meaning, only grow. Chain-specific
//! transaction payloads live with their chain modules and travel inside the
//! `Any` envelope of `SignParam`.

pub mod handler;

use prost::Message;

use crate::core::errors::WalletError;

pub use crate::chains::bitcoin::{BtcForkSignedTxOutput, BtcForkTxInput, Utxo};
pub use crate::chains::ckb::{CachedCell, CellInput, CkbTxInput, CkbTxOutput, OutPoint, Witness};
pub use crate::chains::eos::{
    EosMessageInput, EosMessageOutput, EosSignData, EosSignedTx, EosTxInput, EosTxOutput,
};
pub use crate::chains::ethereum::{EthMessageInput, EthMessageOutput, EthTxInput, EthTxOutput};
pub use crate::chains::tron::{TronMessageInput, TronMessageOutput, TronTxInput, TronTxOutput};

/// Uniform outer envelope: dispatch happens on `method`, the payload rides
/// along as an `Any`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyAction {
    #[prost(string, tag = "1")]
    pub method: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub param: ::core::option::Option<Any>,
}

/// protobuf `Any`: a type tag plus the serialized payload bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(bool, tag = "1")]
    pub is_success: bool,
    #[prost(string, tag = "2")]
    pub error: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InitParam {
    #[prost(string, tag = "1")]
    pub file_dir: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub xpub_common_key: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub xpub_common_iv: ::prost::alloc::string::String,
}

impl InitParam {
    /// Host init message → engine configuration.
    pub fn into_config(self) -> crate::core::config::EngineConfig {
        let mut config = crate::core::config::EngineConfig::new(self.file_dir);
        if !self.xpub_common_key.is_empty() {
            config.xpub_common_key = self.xpub_common_key;
        }
        if !self.xpub_common_iv.is_empty() {
            config.xpub_common_iv = self.xpub_common_iv;
        }
        config
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MnemonicResult {
    #[prost(string, tag = "1")]
    pub mnemonic: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HdStoreCreateParam {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub password_hint: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImportMnemonicParam {
    #[prost(string, tag = "1")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub mnemonic: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub path: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub source: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub network: ::prost::alloc::string::String,
    #[prost(string, tag = "8")]
    pub seg_wit: ::prost::alloc::string::String,
    #[prost(string, tag = "9")]
    pub password_hint: ::prost::alloc::string::String,
    #[prost(bool, tag = "10")]
    pub overwrite: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeystoreImportParam {
    #[prost(string, tag = "1")]
    pub keystore: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub password_hint: ::prost::alloc::string::String,
    #[prost(bool, tag = "5")]
    pub overwrite: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EosPermissionParam {
    #[prost(string, tag = "1")]
    pub permission: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub public_key: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrivateKeyImportParam {
    #[prost(string, tag = "1")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub network: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub private_key: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub seg_wit: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub password_hint: ::prost::alloc::string::String,
    #[prost(bool, tag = "8")]
    pub overwrite: bool,
    /// EOS only: one entry per imported key
    #[prost(string, repeated, tag = "9")]
    pub private_keys: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "10")]
    pub permissions: ::prost::alloc::vec::Vec<EosPermissionParam>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExistsMnemonicParam {
    #[prost(string, tag = "1")]
    pub mnemonic: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExistsPrivateKeyParam {
    #[prost(string, tag = "1")]
    pub private_key: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExistsKeystoreParam {
    #[prost(string, tag = "1")]
    pub keystore: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExistsResult {
    #[prost(bool, tag = "1")]
    pub exists: bool,
    #[prost(string, tag = "2")]
    pub id: ::prost::alloc::string::String,
}

/// (id, password) pair used by export/remove/verify/derived-key calls.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WalletKeyParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExportPrivateKeyParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub main_address: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub path: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExportMnemonicResult {
    #[prost(string, tag = "1")]
    pub mnemonic: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub path: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub address: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExportPrivateKeyResult {
    #[prost(string, tag = "1")]
    pub private_key: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExportKeystoreResult {
    #[prost(string, tag = "1")]
    pub json: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveWalletResult {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VerifyPasswordResult {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DerivationSpecParam {
    #[prost(string, tag = "1")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub path: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub network: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub seg_wit: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub chain_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeriveParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub derivations: ::prost::alloc::vec::Vec<DerivationSpecParam>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExternalAddress {
    #[prost(string, tag = "1")]
    pub address: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub derived_path: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub r#type: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountResponse {
    #[prost(string, tag = "1")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub address: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub path: ::prost::alloc::string::String,
    /// Encrypted for watch-only export
    #[prost(string, tag = "4")]
    pub extended_xpub_key: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "5")]
    pub external_address: ::core::option::Option<ExternalAddress>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountsResponse {
    #[prost(message, repeated, tag = "1")]
    pub accounts: ::prost::alloc::vec::Vec<AccountResponse>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WalletResult {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub source: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "4")]
    pub accounts: ::prost::alloc::vec::Vec<AccountResponse>,
    #[prost(int64, tag = "5")]
    pub created_at: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExternalAddressParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub external_idx: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct XpubParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub password: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub address: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct XpubResult {
    #[prost(string, tag = "1")]
    pub xpub: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CacheDerivedKeyParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub derived_key: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub temp_password: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VerifyDerivedKeyParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub derived_key: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DerivedKeyResult {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub derived_key: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClearDerivedKeysParam {
    /// Empty clears every wallet's entry
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignParam {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub chain_type: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub address: ::prost::alloc::string::String,
    /// Chain-specific payload (`EthTxInput`, `BtcForkTxInput`, …)
    #[prost(message, optional, tag = "6")]
    pub input: ::core::option::Option<Any>,
    #[prost(oneof = "sign_param::Key", tags = "2, 3")]
    pub key: ::core::option::Option<sign_param::Key>,
}

pub mod sign_param {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Key {
        #[prost(string, tag = "2")]
        Password(::prost::alloc::string::String),
        #[prost(string, tag = "3")]
        DerivedKey(::prost::alloc::string::String),
    }
}

/// Encode any wire message to its byte form.
pub fn encode_message(msg: impl Message) -> Vec<u8> {
    let mut buf = bytes::BytesMut::with_capacity(msg.encoded_len());
    msg.encode(&mut buf).expect("BytesMut grows on demand");
    buf.to_vec()
}

/// Wrap a message in an `Any` with the conventional type url prefix.
pub fn pack_any(type_name: &str, msg: impl Message) -> Any {
    Any {
        type_url: format!("type.keyring.api/{}", type_name),
        value: msg.encode_to_vec(),
    }
}

pub(crate) fn decode_param<M: Message + Default>(bytes: &[u8]) -> Result<M, WalletError> {
    M::decode(bytes).map_err(|e| WalletError::SerializationError(format!("bad param: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trip() {
        let action = KeyAction {
            method: "sign_tx".to_string(),
            param: Some(pack_any(
                "SignParam",
                SignParam {
                    id: "w1".to_string(),
                    chain_type: "ETHEREUM".to_string(),
                    address: "0xabc".to_string(),
                    input: Some(pack_any(
                        "EthTxInput",
                        EthTxInput {
                            nonce: "0".to_string(),
                            to: String::new(),
                            value: "1".to_string(),
                            gas_price: "1".to_string(),
                            gas_limit: "21000".to_string(),
                            data: String::new(),
                            chain_id: "1".to_string(),
                        },
                    )),
                    key: Some(sign_param::Key::Password("pw".to_string())),
                },
            )),
        };

        let bytes = encode_message(action.clone());
        let decoded = KeyAction::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, action);

        let sign_param: SignParam =
            decode_param(&decoded.param.unwrap().value).unwrap();
        assert_eq!(sign_param.chain_type, "ETHEREUM");
        match sign_param.key.unwrap() {
            sign_param::Key::Password(p) => assert_eq!(p, "pw"),
            _ => panic!("expected the password arm"),
        }
    }

    #[test]
    fn test_decode_param_rejects_garbage() {
        // a truncated varint cannot decode into any message
        let err = decode_param::<SignParam>(&[0x0a]).unwrap_err();
        assert_eq!(err.code(), "serialization_error");
    }

    #[test]
    fn test_init_param_to_config() {
        let config = InitParam {
            file_dir: "/data/wallets".to_string(),
            xpub_common_key: "aa".repeat(16),
            xpub_common_iv: "bb".repeat(16),
        }
        .into_config();
        assert_eq!(config.keystore_dir, "/data/wallets");
        assert_eq!(config.xpub_common_key, "aa".repeat(16));

        // empty fields keep the defaults
        let config = InitParam {
            file_dir: "/data".to_string(),
            xpub_common_key: String::new(),
            xpub_common_iv: String::new(),
        }
        .into_config();
        assert_eq!(config.xpub_common_key.len(), 32);
    }

    #[test]
    fn test_wallet_result_defaults() {
        let empty = WalletResult::default();
        let bytes = encode_message(empty.clone());
        assert!(bytes.is_empty()); // all-default proto serializes to nothing
        assert_eq!(WalletResult::decode(bytes.as_slice()).unwrap(), empty);
    }
}
