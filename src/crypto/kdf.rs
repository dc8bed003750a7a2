//! Password-based key derivation for keystore sealing.
//!
//! The parameters a keystore was sealed with are persisted next to the
//! ciphertext, so old records stay readable when the default preset moves.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::core::config::KdfPreset;
use crate::core::errors::WalletError;

/// Derived credential length. The first 32 bytes key AES-256-GCM.
pub const CREDENTIAL_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pbkdf2Params {
    pub c: u32,
    pub prf: String,
    pub dklen: u32,
    pub salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScryptParams {
    pub n: u32,
    pub r: u32,
    pub p: u32,
    pub dklen: u32,
    pub salt: String,
}

/// KDF algorithm + parameters, adjacently tagged so the keystore JSON reads
/// `"kdf": "pbkdf2", "kdfparams": { ... }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kdf", content = "kdfparams", rename_all = "lowercase")]
pub enum Kdf {
    Pbkdf2(Pbkdf2Params),
    Scrypt(ScryptParams),
}

impl Kdf {
    /// Fresh parameters for `preset` with a random 32-byte salt.
    pub fn for_preset(preset: KdfPreset) -> Kdf {
        let salt = hex::encode(crate::crypto::random_bytes(32));
        match preset {
            KdfPreset::Scrypt => Kdf::Scrypt(ScryptParams {
                n: 16384,
                r: 8,
                p: 1,
                dklen: CREDENTIAL_LEN as u32,
                salt,
            }),
            KdfPreset::Pbkdf2 => Kdf::Pbkdf2(Pbkdf2Params {
                c: 10240,
                prf: "hmac-sha256".to_string(),
                dklen: CREDENTIAL_LEN as u32,
                salt,
            }),
            KdfPreset::FastInsecure => Kdf::Pbkdf2(Pbkdf2Params {
                c: 1024,
                prf: "hmac-sha256".to_string(),
                dklen: CREDENTIAL_LEN as u32,
                salt,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        let ok = match self {
            Kdf::Pbkdf2(p) => p.c > 0 && p.dklen as usize == CREDENTIAL_LEN && !p.salt.is_empty(),
            Kdf::Scrypt(p) => {
                p.n.is_power_of_two()
                    && p.n > 1
                    && p.r > 0
                    && p.p > 0
                    && p.dklen as usize == CREDENTIAL_LEN
                    && !p.salt.is_empty()
            }
        };
        if ok {
            Ok(())
        } else {
            Err(WalletError::CryptoError("invalid kdf params".to_string()))
        }
    }

    /// Derive the 32-byte credential for `password`.
    pub fn derive(&self, password: &str) -> Result<Zeroizing<[u8; CREDENTIAL_LEN]>, WalletError> {
        self.validate()?;
        let mut credential = Zeroizing::new([0u8; CREDENTIAL_LEN]);
        match self {
            Kdf::Pbkdf2(p) => {
                debug!("deriving credential with PBKDF2 ({} rounds)", p.c);
                let salt = hex::decode(&p.salt)
                    .map_err(|_| WalletError::CryptoError("invalid kdf salt".to_string()))?;
                pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, p.c, credential.as_mut());
            }
            Kdf::Scrypt(p) => {
                debug!("deriving credential with scrypt (n={}, r={}, p={})", p.n, p.r, p.p);
                let salt = hex::decode(&p.salt)
                    .map_err(|_| WalletError::CryptoError("invalid kdf salt".to_string()))?;
                let params =
                    scrypt::Params::new(p.n.ilog2() as u8, p.r, p.p, CREDENTIAL_LEN).map_err(
                        |e| WalletError::CryptoError(format!("invalid scrypt params: {}", e)),
                    )?;
                scrypt::scrypt(password.as_bytes(), &salt, &params, credential.as_mut())
                    .map_err(|e| WalletError::CryptoError(format!("scrypt failed: {}", e)))?;
            }
        }
        Ok(credential)
    }
}
