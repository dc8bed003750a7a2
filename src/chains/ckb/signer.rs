//! Grouped witness signing for CKB transactions.
//!
//! Input cells sharing a lock script sign as one group: the group's first
//! witness gets the 65-byte recoverable signature over
//! blake2b(tx_hash ‖ len ‖ empty-lock witness ‖ [len ‖ witness]…).

use std::collections::HashMap;

use k256::ecdsa::SigningKey;
use zeroize::Zeroizing;

use crate::chains::ckb::hash::CkbBlake2b;
use crate::chains::ckb::serializer::Serializer;
use crate::chains::ckb::{CachedCell, CkbTxInput, CkbTxOutput, OutPoint, Witness};
use crate::core::errors::WalletError;

/// Resolves the signing key for a cell's relative derivation path; the empty
/// path means the wallet's account key.
pub type KeyResolver<'a> =
    &'a dyn Fn(&str) -> Result<Zeroizing<[u8; 32]>, WalletError>;

fn find_cached_cell<'a>(
    cells: &'a [CachedCell],
    out_point: &OutPoint,
) -> Result<&'a CachedCell, WalletError> {
    cells
        .iter()
        .find(|cell| {
            cell.out_point
                .as_ref()
                .map(|p| p.index == out_point.index && p.tx_hash == out_point.tx_hash)
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            WalletError::MalformedTransactionInput("cell input not cached".to_string())
        })
}

/// Group input indices by lock-script hash, remembering each group's key path.
fn group_by_lock_script(
    input_cells: &[&CachedCell],
) -> Result<Vec<(Vec<usize>, String)>, WalletError> {
    let mut order: Vec<Vec<u8>> = vec![];
    let mut groups: HashMap<Vec<u8>, (Vec<usize>, String)> = HashMap::new();

    for (index, cell) in input_cells.iter().enumerate() {
        let lock = cell.lock.as_ref().ok_or_else(|| {
            WalletError::MalformedTransactionInput("input cell missing lock script".to_string())
        })?;
        let hash = lock.to_hash()?.to_vec();
        match groups.get_mut(&hash) {
            Some((indices, _)) => indices.push(index),
            None => {
                order.push(hash.clone());
                groups.insert(hash, (vec![index], cell.derived_path.clone()));
            }
        }
    }

    Ok(order
        .into_iter()
        .map(|hash| groups.remove(&hash).expect("group recorded"))
        .collect())
}

fn sign_witness_group(
    tx_hash: &[u8],
    group_witnesses: &[&Witness],
    key: &Zeroizing<[u8; 32]>,
) -> Result<Witness, WalletError> {
    let first = group_witnesses
        .first()
        .ok_or_else(|| WalletError::MalformedTransactionInput("witness group empty".to_string()))?;

    let mut empty_witness = Witness {
        lock: vec![0u8; 65],
        input_type: first.input_type.clone(),
        output_type: first.output_type.clone(),
    };
    let serialized_empty = empty_witness.serialize();

    let mut hasher = CkbBlake2b::new();
    hasher.update(tx_hash);
    hasher.update(&Serializer::serialize_u64(serialized_empty.len() as u64));
    hasher.update(&serialized_empty);
    for witness in &group_witnesses[1..] {
        let bytes = witness.serialize();
        hasher.update(&Serializer::serialize_u64(bytes.len() as u64));
        hasher.update(&bytes);
    }
    let digest = hasher.finalize();

    let signing_key = SigningKey::from_slice(key.as_ref())
        .map_err(|e| WalletError::CryptoError(format!("invalid signing key: {}", e)))?;
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| WalletError::CryptoError(format!("signing failed: {}", e)))?;

    let mut lock = Vec::with_capacity(65);
    lock.extend_from_slice(&signature.to_bytes());
    lock.push(recovery_id.to_byte());
    empty_witness.lock = lock;
    Ok(empty_witness)
}

pub fn sign_transaction(
    input: &CkbTxInput,
    key_for_path: KeyResolver<'_>,
) -> Result<CkbTxOutput, WalletError> {
    if input.tx_hash.len() != 32 {
        return Err(WalletError::MalformedTransactionInput(
            "tx hash must be 32 bytes".to_string(),
        ));
    }
    if input.witnesses.is_empty() {
        return Err(WalletError::MalformedTransactionInput("witnesses required".to_string()));
    }
    if input.inputs.is_empty() {
        return Err(WalletError::MalformedTransactionInput("inputs required".to_string()));
    }

    let mut input_cells: Vec<&CachedCell> = vec![];
    for cell_input in &input.inputs {
        let out_point = cell_input.previous_output.as_ref().ok_or_else(|| {
            WalletError::MalformedTransactionInput("input missing previous output".to_string())
        })?;
        input_cells.push(find_cached_cell(&input.cached_cells, out_point)?);
    }

    let mut signed_witnesses = input.witnesses.clone();
    for (indices, derived_path) in group_by_lock_script(&input_cells)? {
        let mut group: Vec<&Witness> = indices.iter().map(|i| &input.witnesses[*i]).collect();
        // witnesses beyond the input count belong to every group's digest
        if input.witnesses.len() > input_cells.len() {
            group.extend(&input.witnesses[input_cells.len()..]);
        }

        let key = key_for_path(&derived_path)?;
        let signed = sign_witness_group(&input.tx_hash, &group, &key)?;
        signed_witnesses[indices[0]] = signed;
    }

    Ok(CkbTxOutput {
        tx_hash: input.tx_hash.clone(),
        witnesses: signed_witnesses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ckb::{CellInput, Script};

    fn key_resolver() -> impl Fn(&str) -> Result<Zeroizing<[u8; 32]>, WalletError> {
        |path: &str| {
            if path.is_empty() || path == "0/0" {
                Ok(Zeroizing::new([0x11; 32]))
            } else {
                Ok(Zeroizing::new([0x22; 32]))
            }
        }
    }

    fn cell(tx_hash: u8, index: i32, lock_args: &[u8], derived_path: &str) -> CachedCell {
        CachedCell {
            capacity: 100_000_000,
            lock: Some(Script {
                args: lock_args.to_vec(),
                code_hash: vec![0xab; 32],
                hash_type: "type".to_string(),
            }),
            out_point: Some(OutPoint {
                tx_hash: vec![tx_hash; 32],
                index,
            }),
            derived_path: derived_path.to_string(),
        }
    }

    fn cell_input(tx_hash: u8, index: i32) -> CellInput {
        CellInput {
            previous_output: Some(OutPoint {
                tx_hash: vec![tx_hash; 32],
                index,
            }),
            since: String::new(),
        }
    }

    fn base_input() -> CkbTxInput {
        CkbTxInput {
            inputs: vec![cell_input(1, 0), cell_input(1, 1)],
            witnesses: vec![Witness::default(), Witness::default()],
            cached_cells: vec![cell(1, 0, &[0x01], "0/0"), cell(1, 1, &[0x01], "0/0")],
            tx_hash: vec![0x42; 32],
        }
    }

    #[test]
    fn test_same_lock_signs_first_witness_only() {
        let resolver = key_resolver();
        let output = sign_transaction(&base_input(), &resolver).unwrap();

        assert_eq!(output.witnesses.len(), 2);
        assert_eq!(output.witnesses[0].lock.len(), 65);
        // second input shares the lock group — its witness stays untouched
        assert!(output.witnesses[1].lock.is_empty());
    }

    #[test]
    fn test_distinct_locks_sign_independently() {
        let mut input = base_input();
        input.cached_cells[1] = cell(1, 1, &[0x02], "0/1");
        let resolver = key_resolver();
        let output = sign_transaction(&input, &resolver).unwrap();

        assert_eq!(output.witnesses[0].lock.len(), 65);
        assert_eq!(output.witnesses[1].lock.len(), 65);
        assert_ne!(output.witnesses[0].lock, output.witnesses[1].lock);
    }

    #[test]
    fn test_deterministic_signature() {
        let resolver = key_resolver();
        let a = sign_transaction(&base_input(), &resolver).unwrap();
        let b = sign_transaction(&base_input(), &resolver).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validation_errors() {
        let resolver = key_resolver();

        let mut input = base_input();
        input.tx_hash = vec![0x42; 16];
        assert!(sign_transaction(&input, &resolver).is_err());

        let mut input = base_input();
        input.witnesses.clear();
        assert!(sign_transaction(&input, &resolver).is_err());

        let mut input = base_input();
        input.cached_cells.pop();
        assert!(matches!(
            sign_transaction(&input, &resolver),
            Err(WalletError::MalformedTransactionInput(_))
        ));
    }

    #[test]
    fn test_extra_witnesses_feed_digest() {
        let resolver = key_resolver();
        let plain = sign_transaction(&base_input(), &resolver).unwrap();

        let mut input = base_input();
        input.witnesses.push(Witness {
            lock: vec![],
            input_type: vec![0xdd],
            output_type: vec![],
        });
        let extended = sign_transaction(&input, &resolver).unwrap();
        assert_ne!(plain.witnesses[0].lock, extended.witnesses[0].lock);
    }
}
