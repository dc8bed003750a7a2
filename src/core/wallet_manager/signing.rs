//! Transaction/message signing dispatch and derived-key cache operations.
//!
//! ## Signing flow
//! ```text
//! request (id, auth, chainType, payload)
//!    ↓
//! authenticate (password | cached temp password | derived key)
//!    ↓
//! unlock keystore (guard re-locks on drop)
//!    ↓
//! chain dispatch (exhaustive match on the chain tag)
//!    ↓
//! signed output, or structured failure
//! ```
//!
//! Signers themselves are pure functions over unlocked key material, so a
//! failed call leaves no state behind.

use tracing::info;
use zeroize::Zeroizing;

use super::{Auth, WalletManager};
use crate::chains;
use crate::core::domain::{ChainType, SegWit};
use crate::core::errors::WalletError;
use crate::keystore::{hd, Keystore, KeyType};

/// Chain-specific unsigned payloads, tagged by chain family.
#[derive(Debug, Clone)]
pub enum SignTxInput {
    BtcFork(chains::bitcoin::BtcForkTxInput),
    Ethereum(chains::ethereum::EthTxInput),
    Tron(chains::tron::TronTxInput),
    Eos(chains::eos::EosTxInput),
    Ckb(chains::ckb::CkbTxInput),
}

/// Chain-specific signing results.
#[derive(Debug, Clone)]
pub enum SignTxOutput {
    BtcFork(chains::bitcoin::BtcForkSignedTxOutput),
    Ethereum(chains::ethereum::EthTxOutput),
    Tron(chains::tron::TronTxOutput),
    Eos(chains::eos::EosTxOutput),
    Ckb(chains::ckb::CkbTxOutput),
}

impl WalletManager {
    /// Sign one chain-specific transaction for account (`chain_type`,
    /// `address`) of wallet `id`.
    ///
    /// # Arguments
    /// * `auth` - Password, cached temp password, or raw derived key
    /// * `input` - Chain-tagged unsigned payload
    ///
    /// # Returns
    /// * `Ok(SignTxOutput)` - Chain-specific signed encoding
    /// * `Err(IncorrectPassword)` - Authentication failed, nothing touched
    pub async fn sign_transaction(
        &self,
        id: &str,
        auth: &Auth,
        chain_type: &str,
        address: &str,
        input: SignTxInput,
    ) -> Result<SignTxOutput, WalletError> {
        let chain = ChainType::from_tag(chain_type)?;

        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let resolved = self.resolve_auth(keystore, auth)?;
        let mut guard = resolved.unlock(keystore)?;
        let ks = guard.keystore_mut();

        let output = match (chain, input) {
            (ChainType::Bitcoin | ChainType::Litecoin, SignTxInput::BtcFork(tx)) => {
                SignTxOutput::BtcFork(sign_btc_fork(ks, chain, chain_type, address, &tx)?)
            }
            (ChainType::Ethereum, SignTxInput::Ethereum(tx)) => {
                let key = ks.find_private_key(chain_type, address)?;
                SignTxOutput::Ethereum(chains::ethereum::sign_transaction(&tx, &key)?)
            }
            (ChainType::Tron, SignTxInput::Tron(tx)) => {
                let key = ks.find_private_key(chain_type, address)?;
                SignTxOutput::Tron(chains::tron::sign_transaction(&tx, &key)?)
            }
            (ChainType::Eos, SignTxInput::Eos(tx)) => {
                let keys = eos_key_pairs(ks, address)?;
                SignTxOutput::Eos(chains::eos::sign_transactions(&tx, &keys)?)
            }
            (ChainType::Nervos, SignTxInput::Ckb(tx)) => {
                let resolver = |path: &str| -> Result<Zeroizing<[u8; 32]>, WalletError> {
                    if path.is_empty() {
                        ks.find_private_key(chain_type, address)
                    } else {
                        ks.find_private_key_by_path(chain_type, address, path)
                    }
                };
                SignTxOutput::Ckb(chains::ckb::sign_transaction(&tx, &resolver)?)
            }
            _ => {
                return Err(WalletError::MalformedTransactionInput(format!(
                    "payload does not match chain {}",
                    chain_type
                )))
            }
        };

        info!("✅ signed {} transaction for wallet {}", chain_type, id);
        Ok(output)
    }

    /// EIP-191 personal message signing (Ethereum accounts).
    pub async fn personal_sign(
        &self,
        id: &str,
        auth: &Auth,
        address: &str,
        input: &chains::ethereum::EthMessageInput,
    ) -> Result<chains::ethereum::EthMessageOutput, WalletError> {
        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let resolved = self.resolve_auth(keystore, auth)?;
        let guard = resolved.unlock(keystore)?;
        let key = guard.keystore().find_private_key("ETHEREUM", address)?;
        chains::ethereum::personal_sign(input, &key)
    }

    /// Tron message signing with the TRON (or Ethereum) prefix convention.
    pub async fn tron_sign_message(
        &self,
        id: &str,
        auth: &Auth,
        address: &str,
        input: &chains::tron::TronMessageInput,
    ) -> Result<chains::tron::TronMessageOutput, WalletError> {
        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let resolved = self.resolve_auth(keystore, auth)?;
        let guard = resolved.unlock(keystore)?;
        let key = guard.keystore().find_private_key("TRON", address)?;
        chains::tron::sign_message(input, &key)
    }

    /// EOS arbitrary-data signing with a held key.
    pub async fn eos_ec_sign(
        &self,
        id: &str,
        auth: &Auth,
        address: &str,
        input: &chains::eos::EosMessageInput,
    ) -> Result<chains::eos::EosMessageOutput, WalletError> {
        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let resolved = self.resolve_auth(keystore, auth)?;
        let guard = resolved.unlock(keystore)?;
        let keys = eos_key_pairs(guard.keystore(), address)?;
        chains::eos::ec_sign(input, &keys)
    }

    /// Hand the caller the KDF credential for caching (password-gated).
    pub async fn get_derived_key(&self, id: &str, password: &str) -> Result<String, WalletError> {
        let map = self.keystores.read();
        let keystore = map
            .get(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let credential = keystore.credential(password)?;
        Ok(hex::encode(AsRef::<[u8]>::as_ref(&credential)))
    }

    /// Register a derived key under an ephemeral temp password. The key must
    /// verify against the record first.
    pub async fn cache_derived_key(
        &self,
        id: &str,
        derived_key: &str,
        temp_password: &str,
    ) -> Result<(), WalletError> {
        if temp_password.is_empty() {
            return Err(WalletError::InvalidInput("temp password cannot be empty".to_string()));
        }
        let credential = self.checked_credential(id, derived_key)?;
        self.derived_keys.put(id, &credential, temp_password);
        info!("derived key cached for wallet {}", id);
        Ok(())
    }

    /// Re-validate a cached derived key against the record; a mismatch also
    /// evicts whatever the cache holds for that wallet.
    pub async fn verify_derived_key(&self, id: &str, derived_key: &str) -> Result<(), WalletError> {
        self.checked_credential(id, derived_key).map(|_| ())
    }

    /// Drop one wallet's cache entry, or all of them.
    pub async fn clear_derived_keys(&self, id: Option<&str>) {
        match id {
            Some(id) => self.derived_keys.clear(id),
            None => self.derived_keys.clear_all(),
        }
    }

    fn checked_credential(
        &self,
        id: &str,
        derived_key: &str,
    ) -> Result<Zeroizing<[u8; 32]>, WalletError> {
        let map = self.keystores.read();
        let keystore = map
            .get(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let bytes = hex::decode(derived_key).map_err(|_| WalletError::IncorrectPassword)?;
        let credential: [u8; 32] = bytes.try_into().map_err(|_| WalletError::IncorrectPassword)?;
        if keystore.verify_credential(&credential) {
            Ok(Zeroizing::new(credential))
        } else {
            self.derived_keys.clear(id);
            Err(WalletError::IncorrectPassword)
        }
    }
}

/// Per-input keys plus the change script for a bitcoin-fork transaction.
fn sign_btc_fork(
    keystore: &Keystore,
    chain: ChainType,
    chain_type: &str,
    address: &str,
    tx: &chains::bitcoin::BtcForkTxInput,
) -> Result<chains::bitcoin::BtcForkSignedTxOutput, WalletError> {
    let network = chains::bitcoin::network_params(chain, &tx.network)?;
    let seg_wit = SegWit::from_tag(&tx.seg_wit)?;

    if !chains::bitcoin::is_valid_address(&network, &tx.to) {
        return Err(WalletError::MalformedTransactionInput(format!(
            "address_invalid: {}",
            tx.to
        )));
    }

    let mut keys = vec![];
    for unspent in &tx.unspents {
        let key = if !unspent.derived_path.is_empty() {
            keystore.find_private_key_by_path(chain_type, address, &unspent.derived_path)?
        } else {
            keystore.find_private_key(chain_type, &unspent.address)?
        };
        keys.push(key);
    }

    let change_script = if !tx.change_address.is_empty() {
        chains::bitcoin::script_pubkey_for_address(&network, &tx.change_address)?
    } else if let Some(account) = keystore.account(chain_type, address) {
        if account.ext_pub_key.is_empty() {
            chains::bitcoin::script_pubkey_for_address(&network, address)?
        } else {
            // internal (change) chain of the account xpub
            let rel_path = format!("1/{}", tx.change_address_index);
            let pubkey = hd::xpub_child_public_key(&account.ext_pub_key, &rel_path)?;
            let change_address =
                chains::bitcoin::address_from_public_key(&network, seg_wit, &pubkey)?;
            chains::bitcoin::script_pubkey_for_address(&network, &change_address)?
        }
    } else {
        return Err(WalletError::AccountNotFound(format!("{}/{}", chain_type, address)));
    };

    chains::bitcoin::sign_transaction(tx, &network, seg_wit, &keys, change_script)
}

/// Every EOS key a wallet holds: the imported key set, or the single key
/// derived at the account path for HD wallets.
fn eos_key_pairs(
    keystore: &Keystore,
    address: &str,
) -> Result<Vec<chains::eos::EosKeyPair>, WalletError> {
    match keystore {
        Keystore::PrivateKey(pk_store) if pk_store.record.key_type == KeyType::EosKeys => pk_store
            .eos_keys()?
            .iter()
            .map(|entry| {
                let secret: [u8; 32] = hex::decode(&entry.private_key)
                    .map_err(|_| WalletError::InvalidKeystoreFormat("EOS key not hex".to_string()))?
                    .try_into()
                    .map_err(|_| {
                        WalletError::InvalidKeystoreFormat("EOS key not 32 bytes".to_string())
                    })?;
                chains::eos::EosKeyPair::from_secret(&secret)
            })
            .collect(),
        _ => {
            let secret = keystore.find_private_key("EOS", address)?;
            Ok(vec![chains::eos::EosKeyPair::from_secret(&secret)?])
        }
    }
}
