//! BIP39/BIP32 helpers and the HD (mnemonic) keystore.

use bip39::{Language, Mnemonic};
use coins_bip32::enc::{MainnetEncoder, TestnetEncoder, XKeyEncoder};
use coins_bip32::path::DerivationPath;
use coins_bip32::prelude::*;
use coins_bip32::xkeys::XPriv;
use k256::ecdsa::{SigningKey, VerifyingKey};
use rand_core::RngCore;
use zeroize::Zeroizing;

use crate::core::config::KdfPreset;
use crate::core::domain::Metadata;
use crate::core::errors::WalletError;
use crate::crypto::hash::dsha256;
use crate::crypto::SealedBlob;
use crate::keystore::{KeyType, KeystoreRecord, HD_KEYSTORE_VERSION};

/// Normalize user input: trim, collapse whitespace, lowercase.
pub fn normalize_mnemonic(mnemonic: &str) -> String {
    mnemonic
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validate against the English wordlist + checksum, returning the
/// normalized phrase.
pub fn validate_mnemonic(mnemonic: &str) -> Result<String, WalletError> {
    let normalized = normalize_mnemonic(mnemonic);
    Mnemonic::parse_in(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(normalized)
}

/// 12 English words from 128 bits of OS entropy.
pub fn generate_mnemonic() -> String {
    let mut entropy = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    let mnemonic =
        Mnemonic::from_entropy_in(Language::English, &entropy).expect("16-byte entropy is valid");
    mnemonic.to_string()
}

/// BIP39 seed with an empty passphrase.
pub fn mnemonic_to_seed(mnemonic: &str) -> Result<Zeroizing<[u8; 64]>, WalletError> {
    let normalized = normalize_mnemonic(mnemonic);
    let parsed = Mnemonic::parse_in(Language::English, &normalized)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(parsed.to_seed("")))
}

/// Duplicate-detection fingerprint: first 20 bytes of dsha256 of the
/// normalized phrase. Never reveals key material.
pub fn key_hash_from_mnemonic(mnemonic: &str) -> String {
    let normalized = normalize_mnemonic(mnemonic);
    hex::encode(&dsha256(normalized.as_bytes())[..20])
}

fn parse_path(path: &str) -> Result<DerivationPath, WalletError> {
    let normalized = if path.starts_with("m/") || path == "m" {
        path.to_string()
    } else {
        format!("m/{}", path)
    };
    normalized
        .parse::<DerivationPath>()
        .map_err(|e| WalletError::InvalidDerivationPath(format!("{}: {}", path, e)))
}

/// Validate a bridge-supplied derivation path without deriving anything.
pub fn validate_path(path: &str) -> Result<(), WalletError> {
    if path.is_empty() {
        return Err(WalletError::InvalidDerivationPath("empty path".to_string()));
    }
    parse_path(path).map(|_| ())
}

/// Account-level path: the first three (hardened) components, e.g.
/// `m/44'/0'/0'` for `m/44'/0'/0'/0/0`.
pub fn account_path(path: &str) -> Result<String, WalletError> {
    validate_path(path)?;
    let trimmed = path.trim_start_matches("m/");
    let components: Vec<&str> = trimmed.split('/').filter(|c| !c.is_empty()).collect();
    if components.len() < 3 {
        return Err(WalletError::InvalidDerivationPath(format!(
            "path too shallow for an account: {}",
            path
        )));
    }
    Ok(format!("m/{}", components[..3].join("/")))
}

/// Relative remainder of `path` below its account level (`0/0` style).
pub fn relative_path(path: &str) -> Result<String, WalletError> {
    account_path(path)?;
    let trimmed = path.trim_start_matches("m/");
    let components: Vec<&str> = trimmed.split('/').filter(|c| !c.is_empty()).collect();
    Ok(components[3..].join("/"))
}

fn root_from_seed(seed: &[u8]) -> Result<XPriv, WalletError> {
    XPriv::root_from_seed(seed, None)
        .map_err(|e| WalletError::CryptoError(format!("master key derivation failed: {}", e)))
}

/// Secret key bytes at `path`.
pub fn derive_secret_key(seed: &[u8], path: &str) -> Result<Zeroizing<[u8; 32]>, WalletError> {
    let root = root_from_seed(seed)?;
    let derived = root
        .derive_path(&parse_path(path)?)
        .map_err(|e| WalletError::InvalidDerivationPath(format!("{}: {}", path, e)))?;
    let signing_key: &SigningKey = derived.as_ref();
    Ok(Zeroizing::new(signing_key.to_bytes().into()))
}

/// Compressed public key at `path`.
pub fn derive_public_key(seed: &[u8], path: &str) -> Result<Vec<u8>, WalletError> {
    let root = root_from_seed(seed)?;
    let derived = root
        .derive_path(&parse_path(path)?)
        .map_err(|e| WalletError::InvalidDerivationPath(format!("{}: {}", path, e)))?;
    let signing_key: &SigningKey = derived.as_ref();
    Ok(signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec())
}

/// Uncompressed (65-byte) public key at `path`.
pub fn derive_public_key_uncompressed(seed: &[u8], path: &str) -> Result<Vec<u8>, WalletError> {
    let root = root_from_seed(seed)?;
    let derived = root
        .derive_path(&parse_path(path)?)
        .map_err(|e| WalletError::InvalidDerivationPath(format!("{}: {}", path, e)))?;
    let signing_key: &SigningKey = derived.as_ref();
    Ok(signing_key
        .verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec())
}

/// Base58 account xpub (`xpub…` mainnet, `tpub…` testnet).
pub fn account_xpub_base58(seed: &[u8], path: &str, testnet: bool) -> Result<String, WalletError> {
    let account = account_path(path)?;
    let root = root_from_seed(seed)?;
    let derived = root
        .derive_path(&parse_path(&account)?)
        .map_err(|e| WalletError::InvalidDerivationPath(format!("{}: {}", account, e)))?;
    let xpub = derived.verify_key();
    let encoded = if testnet {
        TestnetEncoder::xpub_to_base58(&xpub)
    } else {
        MainnetEncoder::xpub_to_base58(&xpub)
    };
    encoded.map_err(|e| WalletError::CryptoError(format!("xpub encoding failed: {}", e)))
}

/// Public-only child derivation from a base58 xpub; `rel_path` is
/// non-hardened (`0/2` style). Used for external receive addresses and
/// change scripts — no password involved.
pub fn xpub_child_public_key(xpub_b58: &str, rel_path: &str) -> Result<Vec<u8>, WalletError> {
    let xpub = if xpub_b58.starts_with("tpub") {
        TestnetEncoder::xpub_from_base58(xpub_b58)
    } else {
        MainnetEncoder::xpub_from_base58(xpub_b58)
    }
    .map_err(|e| WalletError::CryptoError(format!("invalid xpub: {}", e)))?;

    let child = xpub
        .derive_path(&parse_path(rel_path)?)
        .map_err(|e| WalletError::InvalidDerivationPath(format!("{}: {}", rel_path, e)))?;
    let verifying_key: &VerifyingKey = child.as_ref();
    Ok(verifying_key.to_encoded_point(true).as_bytes().to_vec())
}

/// HD keystore: one sealed mnemonic deriving any number of chain accounts.
#[derive(Debug)]
pub struct HdKeystore {
    pub(crate) record: KeystoreRecord,
    pub(crate) cached_mnemonic: Option<Zeroizing<String>>,
}

impl HdKeystore {
    pub fn from_mnemonic(
        mnemonic: &str,
        password: &str,
        meta: Metadata,
        preset: KdfPreset,
    ) -> Result<HdKeystore, WalletError> {
        let normalized = validate_mnemonic(mnemonic)?;
        let crypto = SealedBlob::seal(password, normalized.as_bytes(), preset)?;
        Ok(HdKeystore {
            record: KeystoreRecord::new(
                HD_KEYSTORE_VERSION,
                KeyType::Mnemonic,
                key_hash_from_mnemonic(&normalized),
                crypto,
                meta,
            ),
            cached_mnemonic: None,
        })
    }

    pub fn from_record(record: KeystoreRecord) -> HdKeystore {
        HdKeystore {
            record,
            cached_mnemonic: None,
        }
    }

    pub fn unlock_by_password(&mut self, password: &str) -> Result<(), WalletError> {
        let payload = self.record.crypto.open(password)?;
        self.cache_payload(payload)
    }

    pub fn unlock_by_credential(&mut self, credential: &[u8]) -> Result<(), WalletError> {
        let payload = self.record.crypto.open_with_credential(credential)?;
        self.cache_payload(payload)
    }

    fn cache_payload(&mut self, payload: Zeroizing<Vec<u8>>) -> Result<(), WalletError> {
        let text = String::from_utf8(payload.to_vec())
            .map_err(|_| WalletError::InvalidKeystoreFormat("mnemonic payload not utf-8".to_string()))?;
        self.cached_mnemonic = Some(Zeroizing::new(text));
        Ok(())
    }

    pub fn lock(&mut self) {
        self.cached_mnemonic = None;
    }

    pub fn is_locked(&self) -> bool {
        self.cached_mnemonic.is_none()
    }

    pub fn mnemonic(&self) -> Result<Zeroizing<String>, WalletError> {
        self.cached_mnemonic
            .clone()
            .ok_or_else(|| WalletError::CryptoError("keystore_locked".to_string()))
    }

    pub fn seed(&self) -> Result<Zeroizing<[u8; 64]>, WalletError> {
        mnemonic_to_seed(&self.mnemonic()?)
    }
}
