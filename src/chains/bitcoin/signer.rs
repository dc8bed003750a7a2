//! UTXO transaction construction and signing for bitcoin forks.
//!
//! Input selection happens upstream; this module validates conservation
//! (inputs ≥ outputs + fee), assembles the transaction, and signs each input
//! with its corresponding key — legacy script-sig, nested segwit, or native
//! segwit per the requested mode.

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use tracing::debug;
use zeroize::Zeroizing;

use crate::chains::bitcoin::address::{
    script_pubkey_for_address, wpkh_script_for_public_key, BtcForkNetwork,
};
use crate::chains::bitcoin::{BtcForkSignedTxOutput, BtcForkTxInput};
use crate::core::domain::SegWit;
use crate::core::errors::WalletError;

/// Outputs below this are unspendable noise; change below it folds into the fee.
const DUST: i64 = 546;

fn secret_keys(keys: &[Zeroizing<[u8; 32]>]) -> Result<Vec<SecretKey>, WalletError> {
    keys.iter()
        .map(|k| {
            SecretKey::from_slice(k.as_ref())
                .map_err(|e| WalletError::CryptoError(format!("invalid secret key: {}", e)))
        })
        .collect()
}

fn build_outputs(
    input: &BtcForkTxInput,
    network: &BtcForkNetwork,
    change_script: ScriptBuf,
) -> Result<Vec<TxOut>, WalletError> {
    if input.amount < DUST {
        return Err(WalletError::MalformedTransactionInput(
            "amount below dust threshold".to_string(),
        ));
    }
    if input.fee < 0 {
        return Err(WalletError::MalformedTransactionInput("negative fee".to_string()));
    }

    let total: i64 = input.unspents.iter().map(|u| u.amount).sum();
    if total < input.amount + input.fee {
        return Err(WalletError::InsufficientFunds(format!(
            "inputs {} < amount {} + fee {}",
            total, input.amount, input.fee
        )));
    }

    let mut outputs = vec![TxOut {
        value: Amount::from_sat(input.amount as u64),
        script_pubkey: script_pubkey_for_address(network, &input.to)?,
    }];

    let change = total - input.amount - input.fee;
    if change >= DUST {
        outputs.push(TxOut {
            value: Amount::from_sat(change as u64),
            script_pubkey: change_script,
        });
    } else if change > 0 {
        debug!("folding sub-dust change ({} sat) into the fee", change);
    }
    Ok(outputs)
}

fn build_inputs(input: &BtcForkTxInput) -> Result<Vec<TxIn>, WalletError> {
    let mut tx_inputs = vec![];
    for unspent in &input.unspents {
        let txid = Txid::from_str(&unspent.tx_hash).map_err(|_| {
            WalletError::MalformedTransactionInput(format!("bad tx hash: {}", unspent.tx_hash))
        })?;
        if unspent.vout < 0 {
            return Err(WalletError::MalformedTransactionInput("negative vout".to_string()));
        }
        let sequence = if unspent.sequence > 0 {
            Sequence(unspent.sequence as u32)
        } else {
            Sequence::MAX
        };
        tx_inputs.push(TxIn {
            previous_output: OutPoint {
                txid,
                vout: unspent.vout as u32,
            },
            script_sig: ScriptBuf::new(),
            sequence,
            witness: Witness::new(),
        });
    }
    Ok(tx_inputs)
}

fn push_bytes(bytes: Vec<u8>) -> Result<PushBytesBuf, WalletError> {
    PushBytesBuf::try_from(bytes)
        .map_err(|_| WalletError::CryptoError("script push too large".to_string()))
}

/// Sign `input` with one key per unspent (same order). `change_script` is
/// where any change ≥ dust goes.
pub fn sign_transaction(
    input: &BtcForkTxInput,
    network: &BtcForkNetwork,
    seg_wit: SegWit,
    keys: &[Zeroizing<[u8; 32]>],
    change_script: ScriptBuf,
) -> Result<BtcForkSignedTxOutput, WalletError> {
    if input.unspents.is_empty() {
        return Err(WalletError::MalformedTransactionInput("no unspents".to_string()));
    }
    if keys.len() != input.unspents.len() {
        return Err(WalletError::MalformedTransactionInput(
            "one key required per unspent".to_string(),
        ));
    }

    let secp = Secp256k1::new();
    let secret_keys = secret_keys(keys)?;

    let version = match seg_wit {
        SegWit::None => Version::ONE,
        _ => Version::TWO,
    };
    let mut tx = Transaction {
        version,
        lock_time: LockTime::ZERO,
        input: build_inputs(input)?,
        output: build_outputs(input, network, change_script)?,
    };

    let mut script_sigs: Vec<ScriptBuf> = Vec::with_capacity(tx.input.len());
    let mut witnesses: Vec<Witness> = Vec::with_capacity(tx.input.len());
    {
        let mut cache = SighashCache::new(&tx);
        for (index, unspent) in input.unspents.iter().enumerate() {
            let secret_key = &secret_keys[index];
            let public_key = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, secret_key);
            let pubkey_bytes = public_key.serialize().to_vec();

            match seg_wit {
                SegWit::None => {
                    let script = if unspent.script_pub_key.is_empty() {
                        script_pubkey_for_address(network, &unspent.address)?
                    } else {
                        ScriptBuf::from(hex::decode(&unspent.script_pub_key)?)
                    };
                    let sighash = cache
                        .legacy_signature_hash(index, &script, EcdsaSighashType::All.to_u32())
                        .map_err(|e| WalletError::CryptoError(format!("sighash failed: {}", e)))?;
                    let msg = Message::from_digest_slice(sighash.as_byte_array())
                        .map_err(|e| WalletError::CryptoError(e.to_string()))?;
                    let mut sig = secp.sign_ecdsa(&msg, secret_key).serialize_der().to_vec();
                    sig.push(EcdsaSighashType::All as u8);

                    let script_sig = Builder::new()
                        .push_slice(push_bytes(sig)?)
                        .push_slice(push_bytes(pubkey_bytes)?)
                        .into_script();
                    script_sigs.push(script_sig);
                    witnesses.push(Witness::new());
                }
                SegWit::P2wpkh | SegWit::Bech32 => {
                    let wpkh_script = wpkh_script_for_public_key(&public_key.serialize());
                    let sighash = cache
                        .p2wpkh_signature_hash(
                            index,
                            &wpkh_script,
                            Amount::from_sat(unspent.amount as u64),
                            EcdsaSighashType::All,
                        )
                        .map_err(|e| WalletError::CryptoError(format!("sighash failed: {}", e)))?;
                    let msg = Message::from_digest_slice(sighash.as_byte_array())
                        .map_err(|e| WalletError::CryptoError(e.to_string()))?;
                    let mut sig = secp.sign_ecdsa(&msg, secret_key).serialize_der().to_vec();
                    sig.push(EcdsaSighashType::All as u8);

                    if seg_wit == SegWit::P2wpkh {
                        // nested segwit reveals the redeem script in script_sig
                        let script_sig = Builder::new()
                            .push_slice(push_bytes(wpkh_script.as_bytes().to_vec())?)
                            .into_script();
                        script_sigs.push(script_sig);
                    } else {
                        script_sigs.push(ScriptBuf::new());
                    }
                    witnesses
                        .push(Witness::from_slice(&[sig.as_slice(), pubkey_bytes.as_slice()]));
                }
            }
        }
    }

    for (index, tx_in) in tx.input.iter_mut().enumerate() {
        tx_in.script_sig = script_sigs[index].clone();
        tx_in.witness = witnesses[index].clone();
    }

    let raw = bitcoin::consensus::encode::serialize(&tx);
    Ok(BtcForkSignedTxOutput {
        signature: hex::encode(raw),
        tx_hash: tx.txid().to_string(),
    })
}
