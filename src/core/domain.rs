//! Core domain model: chain registry, wallet metadata, derived accounts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::WalletError;

/// Closed set of supported chains. Unknown bridge tags are rejected with
/// `UnsupportedChainType` instead of falling through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainType {
    Bitcoin,
    Litecoin,
    Ethereum,
    Tron,
    Eos,
    Nervos,
}

impl ChainType {
    pub fn from_tag(tag: &str) -> Result<Self, WalletError> {
        match tag {
            "BITCOIN" => Ok(ChainType::Bitcoin),
            "LITECOIN" => Ok(ChainType::Litecoin),
            "ETHEREUM" => Ok(ChainType::Ethereum),
            "TRON" => Ok(ChainType::Tron),
            "EOS" => Ok(ChainType::Eos),
            "NERVOS" => Ok(ChainType::Nervos),
            _ => Err(WalletError::UnsupportedChainType(tag.to_string())),
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            ChainType::Bitcoin => "BITCOIN",
            ChainType::Litecoin => "LITECOIN",
            ChainType::Ethereum => "ETHEREUM",
            ChainType::Tron => "TRON",
            ChainType::Eos => "EOS",
            ChainType::Nervos => "NERVOS",
        }
    }

    /// UTXO chains carry an extended public key and an external address pool.
    pub fn is_bitcoin_fork(&self) -> bool {
        matches!(self, ChainType::Bitcoin | ChainType::Litecoin)
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Bitcoin-fork segwit mode: `NONE` (p2pkh), `P2WPKH` (p2sh-wrapped segwit),
/// `BECH32` (native segwit v0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegWit {
    None,
    P2wpkh,
    Bech32,
}

impl SegWit {
    pub fn from_tag(tag: &str) -> Result<Self, WalletError> {
        match tag {
            "" | "NONE" => Ok(SegWit::None),
            "P2WPKH" => Ok(SegWit::P2wpkh),
            "BECH32" | "SEGWIT" => Ok(SegWit::Bech32),
            _ => Err(WalletError::InvalidInput(format!("unknown segwit mode: {}", tag))),
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            SegWit::None => "NONE",
            SegWit::P2wpkh => "P2WPKH",
            SegWit::Bech32 => "BECH32",
        }
    }
}

/// Where the root key material came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    NewMnemonic,
    Mnemonic,
    Keystore,
    Private,
    Wif,
}

impl Source {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Source::NewMnemonic => "NEW_MNEMONIC",
            Source::Mnemonic => "MNEMONIC",
            Source::Keystore => "KEYSTORE",
            Source::Private => "PRIVATE",
            Source::Wif => "WIF",
        }
    }
}

/// Presentation metadata stored beside the sealed key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub password_hint: String,
    #[serde(default = "metadata_default_time")]
    pub timestamp: i64,
    #[serde(default = "metadata_default_source")]
    pub source: Source,
}

fn metadata_default_time() -> i64 {
    Utc::now().timestamp()
}

fn metadata_default_source() -> Source {
    Source::Mnemonic
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            name: String::from("Unknown"),
            password_hint: String::new(),
            timestamp: metadata_default_time(),
            source: Source::Mnemonic,
        }
    }
}

/// One derived blockchain account of a wallet.
///
/// (wallet id, coin, derivation path) is the identity; re-deriving the same
/// path is an upsert, never a duplicate entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub derivation_path: String,
    pub coin: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub seg_wit: String,
    /// Account-level extended public key (base58), bitcoin forks only
    #[serde(default)]
    pub ext_pub_key: String,
}

/// One requested derivation, as carried by the bridge.
#[derive(Debug, Clone)]
pub struct DerivationSpec {
    pub chain_type: ChainType,
    pub path: String,
    pub network: String,
    pub seg_wit: SegWit,
    pub chain_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_type_round_trip() {
        for tag in ["BITCOIN", "LITECOIN", "ETHEREUM", "TRON", "EOS", "NERVOS"] {
            let chain = ChainType::from_tag(tag).unwrap();
            assert_eq!(chain.as_tag(), tag);
        }
    }

    #[test]
    fn test_chain_type_unknown() {
        let err = ChainType::from_tag("DOGECOIN").unwrap_err();
        assert_eq!(err.code(), "unsupported_chain_type");
    }

    #[test]
    fn test_bitcoin_fork_flag() {
        assert!(ChainType::Bitcoin.is_bitcoin_fork());
        assert!(ChainType::Litecoin.is_bitcoin_fork());
        assert!(!ChainType::Ethereum.is_bitcoin_fork());
        assert!(!ChainType::Nervos.is_bitcoin_fork());
    }

    #[test]
    fn test_segwit_tags() {
        assert_eq!(SegWit::from_tag("").unwrap(), SegWit::None);
        assert_eq!(SegWit::from_tag("NONE").unwrap(), SegWit::None);
        assert_eq!(SegWit::from_tag("P2WPKH").unwrap(), SegWit::P2wpkh);
        assert_eq!(SegWit::from_tag("BECH32").unwrap(), SegWit::Bech32);
        assert!(SegWit::from_tag("P2TR").is_err());
    }

    #[test]
    fn test_default_metadata() {
        let meta = Metadata::default();
        assert_eq!(meta.name, "Unknown");
        assert!(meta.timestamp > 0);
        assert_eq!(meta.source, Source::Mnemonic);
    }

    #[test]
    fn test_account_serde_camel_case() {
        let account = Account {
            address: "bc1qtest".to_string(),
            derivation_path: "m/84'/0'/0'/0/0".to_string(),
            coin: "BITCOIN".to_string(),
            network: "MAINNET".to_string(),
            seg_wit: "BECH32".to_string(),
            ext_pub_key: "xpub".to_string(),
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("derivationPath"));
        assert!(json.contains("extPubKey"));
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
