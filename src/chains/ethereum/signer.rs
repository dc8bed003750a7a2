//! Offline Ethereum signing on top of the ethers signer stack.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Bytes, TransactionRequest, H160, U256};
use ethers::utils::hash_message;
use zeroize::Zeroizing;

use crate::chains::ethereum::{EthMessageInput, EthMessageOutput, EthTxInput, EthTxOutput};
use crate::core::errors::WalletError;
use crate::crypto::hash::keccak256;

/// Decimal by default, hex with a 0x prefix.
fn parse_quantity(field: &str, value: &str) -> Result<U256, WalletError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(U256::zero());
    }
    let parsed = if let Some(hex_part) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        U256::from_str_radix(hex_part, 16).ok()
    } else {
        U256::from_dec_str(trimmed).ok()
    };
    parsed.ok_or_else(|| {
        WalletError::MalformedTransactionInput(format!("bad {}: {}", field, value))
    })
}

fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

fn parse_address(value: &str) -> Result<H160, WalletError> {
    let bytes = hex::decode(strip_0x(value))
        .map_err(|_| WalletError::MalformedTransactionInput(format!("bad address: {}", value)))?;
    if bytes.len() != 20 {
        return Err(WalletError::MalformedTransactionInput(format!("bad address: {}", value)));
    }
    Ok(H160::from_slice(&bytes))
}

fn wallet_from_key(key: &Zeroizing<[u8; 32]>) -> Result<LocalWallet, WalletError> {
    LocalWallet::from_bytes(key.as_ref())
        .map_err(|e| WalletError::CryptoError(format!("invalid signing key: {}", e)))
}

/// Sign a legacy transaction with EIP-155 replay protection.
pub fn sign_transaction(
    input: &EthTxInput,
    key: &Zeroizing<[u8; 32]>,
) -> Result<EthTxOutput, WalletError> {
    let chain_id: u64 = input
        .chain_id
        .trim()
        .parse()
        .map_err(|_| WalletError::MalformedTransactionInput(format!("bad chain id: {}", input.chain_id)))?;

    let mut tx = TransactionRequest::new()
        .nonce(parse_quantity("nonce", &input.nonce)?)
        .value(parse_quantity("value", &input.value)?)
        .gas_price(parse_quantity("gasPrice", &input.gas_price)?)
        .gas(parse_quantity("gasLimit", &input.gas_limit)?)
        .chain_id(chain_id);
    if !input.to.trim().is_empty() {
        tx = tx.to(parse_address(&input.to)?);
    }
    if !input.data.trim().is_empty() {
        let data = hex::decode(strip_0x(input.data.trim()))
            .map_err(|_| WalletError::MalformedTransactionInput("bad call data".to_string()))?;
        tx = tx.data(Bytes::from(data));
    }

    let wallet = wallet_from_key(key)?.with_chain_id(chain_id);
    let typed: TypedTransaction = tx.into();
    let signature = wallet
        .sign_transaction_sync(&typed)
        .map_err(|e| WalletError::CryptoError(format!("signing failed: {}", e)))?;
    let raw = typed.rlp_signed(&signature);

    Ok(EthTxOutput {
        signature: hex::encode(raw.as_ref()),
        tx_hash: format!("0x{}", hex::encode(keccak256(raw.as_ref()))),
    })
}

/// EIP-191 `personal_sign`.
pub fn personal_sign(
    input: &EthMessageInput,
    key: &Zeroizing<[u8; 32]>,
) -> Result<EthMessageOutput, WalletError> {
    let data = if input.is_hex {
        hex::decode(strip_0x(input.value.trim()))
            .map_err(|_| WalletError::MalformedTransactionInput("message not hex".to_string()))?
    } else {
        input.value.as_bytes().to_vec()
    };

    let wallet = wallet_from_key(key)?;
    let hash = hash_message(&data);
    let signature = wallet
        .sign_hash(hash)
        .map_err(|e| WalletError::CryptoError(format!("signing failed: {}", e)))?;

    Ok(EthMessageOutput {
        signature: hex::encode(signature.to_vec()),
    })
}
