//! Per-chain address encoding and signing backends.
//!
//! Each module owns the wire-level input/output messages for its chain and a
//! pure signing function over already-unlocked key material; nothing in here
//! touches storage or passwords.

pub mod bitcoin;
pub mod ckb;
pub mod eos;
pub mod ethereum;
pub mod tron;

use crate::core::errors::WalletError;
use crate::crypto::hash::dsha256;

/// base58 with a 4-byte dsha256 checksum (bitcoin-style).
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = dsha256(payload);
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).into_string()
}

/// Inverse of [`base58check_encode`]; returns the payload without checksum.
pub fn base58check_decode(encoded: &str) -> Result<Vec<u8>, WalletError> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| WalletError::InvalidInput(format!("not base58: {}", encoded)))?;
    if data.len() < 5 {
        return Err(WalletError::InvalidInput("base58 payload too short".to_string()));
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    if dsha256(payload)[..4] != *checksum {
        return Err(WalletError::InvalidInput("base58 checksum mismatch".to_string()));
    }
    Ok(payload.to_vec())
}

/// WIF encoding of a 32-byte secret.
pub fn wif_encode(key: &[u8; 32], version: u8, compressed: bool) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(version);
    payload.extend_from_slice(key);
    if compressed {
        payload.push(0x01);
    }
    base58check_encode(&payload)
}

/// Decode a WIF string to (secret, version byte, compressed flag).
pub fn wif_decode(wif: &str) -> Result<([u8; 32], u8, bool), WalletError> {
    let payload = base58check_decode(wif)?;
    match payload.len() {
        33 => {
            let mut key = [0u8; 32];
            key.copy_from_slice(&payload[1..33]);
            Ok((key, payload[0], false))
        }
        34 if payload[33] == 0x01 => {
            let mut key = [0u8; 32];
            key.copy_from_slice(&payload[1..33]);
            Ok((key, payload[0], true))
        }
        _ => Err(WalletError::InvalidInput("invalid WIF payload".to_string())),
    }
}
