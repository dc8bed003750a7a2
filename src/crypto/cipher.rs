//! Authenticated sealing of root key material.
//!
//! A `SealedBlob` is what lands in the keystore JSON: KDF parameters plus an
//! AES-256-GCM ciphertext keyed by the derived credential. The GCM tag doubles
//! as the password check — a failed open IS the wrong-password signal, there
//! is no separate MAC to keep in sync.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::config::KdfPreset;
use crate::core::errors::WalletError;
use crate::crypto::kdf::{Kdf, CREDENTIAL_LEN};

const CIPHER_NAME: &str = "aes-256-gcm";
const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CipherParams {
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SealedBlob {
    pub cipher: String,
    pub cipherparams: CipherParams,
    pub ciphertext: String,
    #[serde(flatten)]
    pub kdf: Kdf,
}

impl SealedBlob {
    /// Seal `payload` under `password` using fresh salt and nonce.
    pub fn seal(password: &str, payload: &[u8], preset: KdfPreset) -> Result<SealedBlob, WalletError> {
        let kdf = Kdf::for_preset(preset);
        let credential = kdf.derive(password)?;
        let nonce_bytes: [u8; NONCE_LEN] = crate::crypto::random_bytes(NONCE_LEN)
            .try_into()
            .expect("nonce length");

        let cipher = Aes256Gcm::new_from_slice(credential.as_ref())
            .map_err(|_| WalletError::CryptoError("cipher init failed".to_string()))?;
        let nonce = Nonce::from(nonce_bytes);
        let ciphertext = cipher
            .encrypt(&nonce, payload)
            .map_err(|_| WalletError::CryptoError("sealing failed".to_string()))?;

        Ok(SealedBlob {
            cipher: CIPHER_NAME.to_string(),
            cipherparams: CipherParams {
                nonce: hex::encode(nonce_bytes),
            },
            ciphertext: hex::encode(ciphertext),
            kdf,
        })
    }

    /// Re-derive the credential for `password`. Expensive; the result is what
    /// the derived-key cache holds on behalf of the caller.
    pub fn credential(&self, password: &str) -> Result<Zeroizing<[u8; CREDENTIAL_LEN]>, WalletError> {
        self.kdf.derive(password)
    }

    /// Open with a password. Wrong password surfaces as `IncorrectPassword`.
    pub fn open(&self, password: &str) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        let credential = self.credential(password)?;
        self.open_with_credential(credential.as_ref())
    }

    /// Open with an already-derived credential (derived-key unlock path).
    pub fn open_with_credential(&self, credential: &[u8]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        if credential.len() != CREDENTIAL_LEN {
            return Err(WalletError::IncorrectPassword);
        }
        if self.cipher != CIPHER_NAME {
            return Err(WalletError::InvalidKeystoreFormat(format!(
                "unsupported cipher: {}",
                self.cipher
            )));
        }
        let nonce_bytes: [u8; NONCE_LEN] = hex::decode(&self.cipherparams.nonce)
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| WalletError::InvalidKeystoreFormat("bad nonce".to_string()))?;
        let ciphertext = hex::decode(&self.ciphertext)
            .map_err(|_| WalletError::InvalidKeystoreFormat("bad ciphertext".to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(credential)
            .map_err(|_| WalletError::CryptoError("cipher init failed".to_string()))?;
        let nonce = Nonce::from(nonce_bytes);
        let plain = cipher
            .decrypt(&nonce, ciphertext.as_slice())
            .map_err(|_| WalletError::IncorrectPassword)?;
        Ok(Zeroizing::new(plain))
    }

    /// Does `password` authenticate? No payload escapes this call.
    pub fn verify_password(&self, password: &str) -> bool {
        self.open(password).is_ok()
    }

    /// Does `credential` match the one this blob was sealed with?
    pub fn verify_credential(&self, credential: &[u8]) -> bool {
        self.open_with_credential(credential).is_ok()
    }
}
