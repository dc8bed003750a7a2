//! Shared digest helpers used across keystore fingerprinting and signers.

use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Double SHA-256.
pub fn dsha256(bytes: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(first);
    second.into()
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    Keccak256::digest(bytes).into()
}
