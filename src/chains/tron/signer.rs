//! Tron transaction and message signing.

use k256::ecdsa::SigningKey;
use zeroize::Zeroizing;

use crate::chains::tron::{TronMessageInput, TronMessageOutput, TronTxInput, TronTxOutput};
use crate::core::errors::WalletError;
use crate::crypto::hash::{keccak256, sha256};

const TRON_MESSAGE_HEADER: &[u8] = b"\x19TRON Signed Message:\n32";
const ETH_MESSAGE_HEADER: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// 65-byte r‖s‖recovery-id signature over `prehash`.
fn sign_recoverable(key: &Zeroizing<[u8; 32]>, prehash: &[u8]) -> Result<[u8; 65], WalletError> {
    let signing_key = SigningKey::from_slice(key.as_ref())
        .map_err(|e| WalletError::CryptoError(format!("invalid signing key: {}", e)))?;
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(prehash)
        .map_err(|e| WalletError::CryptoError(format!("signing failed: {}", e)))?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Sign the sha256 digest of the serialized `raw_data`.
pub fn sign_transaction(
    input: &TronTxInput,
    key: &Zeroizing<[u8; 32]>,
) -> Result<TronTxOutput, WalletError> {
    let raw = hex::decode(input.raw_data.trim())
        .map_err(|_| WalletError::MalformedTransactionInput("raw_data not hex".to_string()))?;
    if raw.is_empty() {
        return Err(WalletError::MalformedTransactionInput("empty raw_data".to_string()));
    }
    let digest = sha256(&raw);
    let signature = sign_recoverable(key, &digest)?;
    Ok(TronTxOutput {
        signatures: vec![hex::encode(signature)],
    })
}

/// Sign a prefixed message; the recovery byte is offset by 27 like the
/// on-chain verifiers expect.
pub fn sign_message(
    input: &TronMessageInput,
    key: &Zeroizing<[u8; 32]>,
) -> Result<TronMessageOutput, WalletError> {
    let data = if input.is_hex {
        let trimmed = input
            .value
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        hex::decode(trimmed)
            .map_err(|_| WalletError::MalformedTransactionInput("message not hex".to_string()))?
    } else {
        input.value.as_bytes().to_vec()
    };

    let header = if input.is_tron_header {
        TRON_MESSAGE_HEADER
    } else {
        ETH_MESSAGE_HEADER
    };
    let to_hash = [header, data.as_slice()].concat();
    let digest = keccak256(&to_hash);

    let mut signature = sign_recoverable(key, &digest)?;
    signature[64] += 27;
    Ok(TronMessageOutput {
        signature: hex::encode(signature),
    })
}
