//! Extended-public-key encryption for watch-only export.
//!
//! The host supplies a process-wide AES-128 key and IV at init time; the
//! encrypted xpub travels to the watch-only side as
//! base64(AES-128-CBC/PKCS7(xpub)). The algorithm is part of the bridge
//! contract and is unrelated to the password-derived keystore sealing.

use aes::Aes128;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::core::errors::WalletError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

fn key_iv(key_hex: &str, iv_hex: &str) -> Result<(Vec<u8>, Vec<u8>), WalletError> {
    let key = hex::decode(key_hex)
        .map_err(|_| WalletError::CryptoError("xpub key not hex".to_string()))?;
    let iv = hex::decode(iv_hex)
        .map_err(|_| WalletError::CryptoError("xpub iv not hex".to_string()))?;
    if key.len() != 16 || iv.len() != 16 {
        return Err(WalletError::CryptoError("xpub key/iv must be 16 bytes".to_string()));
    }
    Ok((key, iv))
}

pub fn encrypt_xpub(xpub: &str, key_hex: &str, iv_hex: &str) -> Result<String, WalletError> {
    let (key, iv) = key_iv(key_hex, iv_hex)?;
    let enc = Aes128CbcEnc::new_from_slices(&key, &iv)
        .map_err(|_| WalletError::CryptoError("cipher init failed".to_string()))?;
    let ciphertext = enc.encrypt_padded_vec_mut::<Pkcs7>(xpub.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(ciphertext))
}

pub fn decrypt_xpub(enc_xpub: &str, key_hex: &str, iv_hex: &str) -> Result<String, WalletError> {
    let (key, iv) = key_iv(key_hex, iv_hex)?;
    let ciphertext = base64::engine::general_purpose::STANDARD
        .decode(enc_xpub)
        .map_err(|_| WalletError::InvalidInput("enc xpub not base64".to_string()))?;
    let dec = Aes128CbcDec::new_from_slices(&key, &iv)
        .map_err(|_| WalletError::CryptoError("cipher init failed".to_string()))?;
    let plain = dec
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| WalletError::CryptoError("xpub decryption failed".to_string()))?;
    String::from_utf8(plain).map_err(|_| WalletError::CryptoError("xpub not utf-8".to_string()))
}
