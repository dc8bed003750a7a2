//! Canonical EOS signatures.
//!
//! EOS rejects non-canonical ECDSA signatures, so signing retries with
//! deterministic extra nonce data until the (r, s) encoding is canonical.
//! Signature digest: sha256(chain_id ‖ packed_tx ‖ 32 zero bytes).

use bitcoin::hashes::{ripemd160, Hash};
use secp256k1::ecdsa::RecoverableSignature;
use secp256k1::{Message, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use crate::chains::eos::{
    encode_public_key, EosMessageInput, EosMessageOutput, EosSignedTx, EosTxInput, EosTxOutput,
};
use crate::core::errors::WalletError;
use crate::crypto::hash::sha256;

/// One held EOS key: its display form plus the raw secret.
pub struct EosKeyPair {
    pub public_key: String,
    pub secret: Zeroizing<[u8; 32]>,
}

impl EosKeyPair {
    pub fn from_secret(secret: &[u8; 32]) -> Result<EosKeyPair, WalletError> {
        let secp = Secp256k1::new();
        let secret_key = SecretKey::from_slice(secret)
            .map_err(|e| WalletError::CryptoError(format!("invalid secret key: {}", e)))?;
        let compressed = secp256k1::PublicKey::from_secret_key(&secp, &secret_key).serialize();
        Ok(EosKeyPair {
            public_key: encode_public_key(&compressed)?,
            secret: Zeroizing::new(*secret),
        })
    }
}

/// eosjs canonicality rule over the 64 compact (r ‖ s) bytes.
fn is_canonical(compact: &[u8; 64]) -> bool {
    compact[0] & 0x80 == 0
        && !(compact[0] == 0 && compact[1] & 0x80 == 0)
        && compact[32] & 0x80 == 0
        && !(compact[32] == 0 && compact[33] & 0x80 == 0)
}

fn sign_canonical(
    digest: &[u8; 32],
    secret: &[u8; 32],
) -> Result<RecoverableSignature, WalletError> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(secret)
        .map_err(|e| WalletError::CryptoError(format!("invalid secret key: {}", e)))?;
    let message = Message::from_slice(digest)
        .map_err(|e| WalletError::CryptoError(e.to_string()))?;

    for counter in 0u32..256 {
        let signature = if counter == 0 {
            secp.sign_ecdsa_recoverable(&message, &secret_key)
        } else {
            let mut nonce_data = [0u8; 32];
            nonce_data[..4].copy_from_slice(&counter.to_le_bytes());
            secp.sign_ecdsa_recoverable_with_noncedata(&message, &secret_key, &nonce_data)
        };
        let (_, compact) = signature.serialize_compact();
        if is_canonical(&compact) {
            return Ok(signature);
        }
    }
    Err(WalletError::CryptoError(
        "no canonical signature found".to_string(),
    ))
}

/// `SIG_K1_` + base58(header ‖ r ‖ s ‖ ripemd160(sig ‖ "K1")[..4]).
fn encode_signature(signature: &RecoverableSignature) -> String {
    let (recovery_id, compact) = signature.serialize_compact();
    let mut sig = Vec::with_capacity(65);
    sig.push(recovery_id.to_i32() as u8 + 27 + 4);
    sig.extend_from_slice(&compact);

    let mut to_checksum = sig.clone();
    to_checksum.extend_from_slice(b"K1");
    let checksum = ripemd160::Hash::hash(&to_checksum).to_byte_array();
    sig.extend_from_slice(&checksum[..4]);

    format!("SIG_K1_{}", bs58::encode(sig).into_string())
}

fn find_key<'a>(keys: &'a [EosKeyPair], public_key: &str) -> Result<&'a EosKeyPair, WalletError> {
    keys.iter()
        .find(|k| k.public_key == public_key)
        .ok_or_else(|| WalletError::MissingRequiredKey(public_key.to_string()))
}

/// Sign every transaction with every required key, preserving order.
pub fn sign_transactions(
    input: &EosTxInput,
    keys: &[EosKeyPair],
) -> Result<EosTxOutput, WalletError> {
    let chain_id = hex::decode(input.chain_id.trim())
        .map_err(|_| WalletError::MalformedTransactionInput("chain id not hex".to_string()))?;
    if chain_id.len() != 32 {
        return Err(WalletError::MalformedTransactionInput(
            "chain id must be 32 bytes".to_string(),
        ));
    }
    if input.transactions.is_empty() {
        return Err(WalletError::MalformedTransactionInput("no transactions".to_string()));
    }

    let mut signed = vec![];
    for tx in &input.transactions {
        let tx_bytes = hex::decode(tx.tx_hex.trim())
            .map_err(|_| WalletError::MalformedTransactionInput("tx not hex".to_string()))?;
        if tx.public_keys.is_empty() {
            return Err(WalletError::MalformedTransactionInput(
                "transaction lists no required keys".to_string(),
            ));
        }

        // digest binds the chain id and a reserved context-free section
        let mut preimage = chain_id.clone();
        preimage.extend_from_slice(&tx_bytes);
        preimage.extend_from_slice(&[0u8; 32]);
        let digest = sha256(&preimage);

        let mut signatures = vec![];
        for public_key in &tx.public_keys {
            let key = find_key(keys, public_key)?;
            let signature = sign_canonical(&digest, &key.secret)?;
            signatures.push(encode_signature(&signature));
        }
        signed.push(EosSignedTx {
            hash: hex::encode(sha256(&tx_bytes)),
            signatures,
        });
    }
    Ok(EosTxOutput {
        transactions: signed,
    })
}

/// Sign arbitrary data (`is_hex` selects raw bytes vs UTF-8) with one held key.
pub fn ec_sign(input: &EosMessageInput, keys: &[EosKeyPair]) -> Result<EosMessageOutput, WalletError> {
    let data = if input.is_hex {
        let trimmed = input
            .data
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        hex::decode(trimmed)
            .map_err(|_| WalletError::MalformedTransactionInput("data not hex".to_string()))?
    } else {
        input.data.as_bytes().to_vec()
    };
    let key = find_key(keys, &input.public_key)?;
    let digest = sha256(&data);
    let signature = sign_canonical(&digest, &key.secret)?;
    Ok(EosMessageOutput {
        signature: encode_signature(&signature),
    })
}
