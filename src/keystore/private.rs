//! Private-key keystore: a single raw secp256k1 key, or a tagged EOS key set.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::config::KdfPreset;
use crate::core::domain::Metadata;
use crate::core::errors::WalletError;
use crate::crypto::hash::dsha256;
use crate::crypto::SealedBlob;
use crate::keystore::{KeyType, KeystoreRecord, PRIVATE_KEYSTORE_VERSION};

/// One imported EOS key, tagged with the permission it serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EosKeyEntry {
    pub permission: String,
    pub public_key: String,
    /// 32-byte secret, hex
    pub private_key: String,
}

/// Duplicate-detection fingerprint over raw key bytes.
pub fn key_hash_from_private_key(key: &[u8]) -> String {
    hex::encode(&dsha256(key)[..20])
}

/// Fingerprint for an EOS key set: order-independent over the secrets.
pub fn key_hash_from_eos_keys(keys: &[EosKeyEntry]) -> String {
    let mut secrets: Vec<&str> = keys.iter().map(|k| k.private_key.as_str()).collect();
    secrets.sort_unstable();
    key_hash_from_private_key(secrets.join(",").as_bytes())
}

#[derive(Debug)]
pub struct PrivateKeystore {
    pub(crate) record: KeystoreRecord,
    pub(crate) cached_payload: Option<Zeroizing<Vec<u8>>>,
}

impl PrivateKeystore {
    /// Seal a single 32-byte secret key (stored as hex).
    pub fn from_private_key(
        key: &[u8],
        password: &str,
        meta: Metadata,
        preset: KdfPreset,
    ) -> Result<PrivateKeystore, WalletError> {
        if key.len() != 32 {
            return Err(WalletError::InvalidInput(format!(
                "private key must be 32 bytes, got {}",
                key.len()
            )));
        }
        let payload = Zeroizing::new(hex::encode(key));
        let crypto = SealedBlob::seal(password, payload.as_bytes(), preset)?;
        Ok(PrivateKeystore {
            record: KeystoreRecord::new(
                PRIVATE_KEYSTORE_VERSION,
                KeyType::Private,
                key_hash_from_private_key(key),
                crypto,
                meta,
            ),
            cached_payload: None,
        })
    }

    /// Seal an EOS key set (stored as JSON).
    pub fn from_eos_keys(
        keys: &[EosKeyEntry],
        password: &str,
        meta: Metadata,
        preset: KdfPreset,
    ) -> Result<PrivateKeystore, WalletError> {
        if keys.is_empty() {
            return Err(WalletError::InvalidInput("no EOS keys supplied".to_string()));
        }
        for key in keys {
            let bytes = hex::decode(&key.private_key)
                .map_err(|_| WalletError::InvalidInput("EOS key not hex".to_string()))?;
            if bytes.len() != 32 {
                return Err(WalletError::InvalidInput("EOS key must be 32 bytes".to_string()));
            }
        }
        let payload = Zeroizing::new(serde_json::to_vec(keys)?);
        let crypto = SealedBlob::seal(password, &payload, preset)?;
        Ok(PrivateKeystore {
            record: KeystoreRecord::new(
                PRIVATE_KEYSTORE_VERSION,
                KeyType::EosKeys,
                key_hash_from_eos_keys(keys),
                crypto,
                meta,
            ),
            cached_payload: None,
        })
    }

    pub fn from_record(record: KeystoreRecord) -> PrivateKeystore {
        PrivateKeystore {
            record,
            cached_payload: None,
        }
    }

    pub fn unlock_by_password(&mut self, password: &str) -> Result<(), WalletError> {
        self.cached_payload = Some(self.record.crypto.open(password)?);
        Ok(())
    }

    pub fn unlock_by_credential(&mut self, credential: &[u8]) -> Result<(), WalletError> {
        self.cached_payload = Some(self.record.crypto.open_with_credential(credential)?);
        Ok(())
    }

    pub fn lock(&mut self) {
        self.cached_payload = None;
    }

    pub fn is_locked(&self) -> bool {
        self.cached_payload.is_none()
    }

    fn payload(&self) -> Result<&Zeroizing<Vec<u8>>, WalletError> {
        self.cached_payload
            .as_ref()
            .ok_or_else(|| WalletError::CryptoError("keystore_locked".to_string()))
    }

    /// The single raw secret key. Errors on EOS key-set stores.
    pub fn private_key(&self) -> Result<Zeroizing<[u8; 32]>, WalletError> {
        if self.record.key_type == KeyType::EosKeys {
            return Err(WalletError::InvalidInput(
                "wallet holds an EOS key set, not a single key".to_string(),
            ));
        }
        let payload = self.payload()?;
        let hex_str = std::str::from_utf8(payload)
            .map_err(|_| WalletError::InvalidKeystoreFormat("key payload not utf-8".to_string()))?;
        let bytes = hex::decode(hex_str.trim())
            .map_err(|_| WalletError::InvalidKeystoreFormat("key payload not hex".to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WalletError::InvalidKeystoreFormat("key payload not 32 bytes".to_string()))?;
        Ok(Zeroizing::new(arr))
    }

    /// The EOS key set. Errors on single-key stores.
    pub fn eos_keys(&self) -> Result<Vec<EosKeyEntry>, WalletError> {
        if self.record.key_type != KeyType::EosKeys {
            return Err(WalletError::InvalidInput(
                "wallet does not hold an EOS key set".to_string(),
            ));
        }
        let payload = self.payload()?;
        Ok(serde_json::from_slice(payload)?)
    }

    /// Payload for export: hex key, or the JSON key set for EOS.
    pub fn export(&self) -> Result<Zeroizing<String>, WalletError> {
        let payload = self.payload()?;
        let text = String::from_utf8(payload.to_vec())
            .map_err(|_| WalletError::InvalidKeystoreFormat("payload not utf-8".to_string()))?;
        Ok(Zeroizing::new(text))
    }
}
