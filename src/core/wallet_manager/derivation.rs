//! Account derivation and extended-public-key handling.

use k256::ecdsa::SigningKey;
use tracing::info;

use super::{AccountSnapshot, Auth, ExternalAddressSnapshot, WalletManager, WalletSnapshot};
use crate::chains;
use crate::core::domain::{Account, ChainType, DerivationSpec, SegWit};
use crate::core::errors::WalletError;
use crate::crypto::xpub::encrypt_xpub;
use crate::keystore::{hd, Keystore};

/// (compressed, uncompressed) public keys for a raw secret.
fn public_keys_from_secret(secret: &[u8; 32]) -> Result<(Vec<u8>, Vec<u8>), WalletError> {
    let signing_key = SigningKey::from_slice(secret)
        .map_err(|e| WalletError::CryptoError(format!("invalid secret key: {}", e)))?;
    let verifying_key = signing_key.verifying_key();
    Ok((
        verifying_key.to_encoded_point(true).as_bytes().to_vec(),
        verifying_key.to_encoded_point(false).as_bytes().to_vec(),
    ))
}

fn address_for_chain(
    spec: &DerivationSpec,
    compressed: &[u8],
    uncompressed: &[u8],
) -> Result<String, WalletError> {
    match spec.chain_type {
        ChainType::Bitcoin | ChainType::Litecoin => {
            let network = chains::bitcoin::network_params(spec.chain_type, &spec.network)?;
            chains::bitcoin::address_from_public_key(&network, spec.seg_wit, compressed)
        }
        ChainType::Ethereum => chains::ethereum::address_from_public_key(uncompressed),
        ChainType::Tron => chains::tron::address_from_public_key(uncompressed),
        ChainType::Eos => chains::eos::encode_public_key(compressed),
        ChainType::Nervos => chains::ckb::address_from_public_key(compressed, &spec.network),
    }
}

/// Derive one account on an unlocked keystore and record it (idempotent
/// upsert). The same (seed, path, chain, network, segwit) always lands on
/// the same address — wallet restore depends on it.
pub(crate) fn derive_account_unlocked(
    keystore: &mut Keystore,
    spec: &DerivationSpec,
) -> Result<Account, WalletError> {
    let account = match keystore {
        Keystore::Hd(hd_store) => {
            hd::validate_path(&spec.path)?;
            let seed = hd_store.seed()?;
            let compressed = hd::derive_public_key(seed.as_ref(), &spec.path)?;
            let uncompressed = hd::derive_public_key_uncompressed(seed.as_ref(), &spec.path)?;
            let address = address_for_chain(spec, &compressed, &uncompressed)?;

            let ext_pub_key = if spec.chain_type.is_bitcoin_fork() {
                let network = chains::bitcoin::network_params(spec.chain_type, &spec.network)?;
                hd::account_xpub_base58(seed.as_ref(), &spec.path, network.is_testnet)?
            } else {
                String::new()
            };

            Account {
                address,
                derivation_path: spec.path.clone(),
                coin: spec.chain_type.as_tag().to_string(),
                network: spec.network.clone(),
                seg_wit: spec.seg_wit.as_tag().to_string(),
                ext_pub_key,
            }
        }
        Keystore::PrivateKey(pk_store) => {
            if pk_store.record.key_type == crate::keystore::KeyType::EosKeys {
                let keys = pk_store.eos_keys()?;
                Account {
                    address: keys[0].public_key.clone(),
                    derivation_path: String::new(),
                    coin: spec.chain_type.as_tag().to_string(),
                    network: spec.network.clone(),
                    seg_wit: String::new(),
                    ext_pub_key: String::new(),
                }
            } else {
                let secret = pk_store.private_key()?;
                let (compressed, uncompressed) = public_keys_from_secret(&secret)?;
                Account {
                    address: address_for_chain(spec, &compressed, &uncompressed)?,
                    derivation_path: String::new(),
                    coin: spec.chain_type.as_tag().to_string(),
                    network: spec.network.clone(),
                    seg_wit: spec.seg_wit.as_tag().to_string(),
                    ext_pub_key: String::new(),
                }
            }
        }
    };

    keystore.upsert_account(account.clone());
    Ok(account)
}

impl WalletManager {
    pub(crate) fn encrypt_account_xpub(&self, account: &Account) -> Result<String, WalletError> {
        if account.ext_pub_key.is_empty() {
            return Ok(String::new());
        }
        encrypt_xpub(
            &account.ext_pub_key,
            &self.config.xpub_common_key,
            &self.config.xpub_common_iv,
        )
    }

    pub(crate) fn account_snapshot(
        &self,
        account: &Account,
        external_address: Option<ExternalAddressSnapshot>,
    ) -> Result<AccountSnapshot, WalletError> {
        Ok(AccountSnapshot {
            chain_type: account.coin.clone(),
            address: account.address.clone(),
            path: account.derivation_path.clone(),
            extended_xpub_key: self.encrypt_account_xpub(account)?,
            external_address,
        })
    }

    /// Next external receive address for a bitcoin-fork account, public-only
    /// derivation from the recorded account xpub.
    pub(crate) fn external_address_for(
        &self,
        account: &Account,
        index: u32,
    ) -> Result<ExternalAddressSnapshot, WalletError> {
        let chain = ChainType::from_tag(&account.coin)?;
        if !chain.is_bitcoin_fork() || account.ext_pub_key.is_empty() {
            return Err(WalletError::InvalidInput(format!(
                "external addresses are only defined for bitcoin-fork accounts, not {}",
                account.coin
            )));
        }
        let rel_path = format!("0/{}", index);
        let pubkey = hd::xpub_child_public_key(&account.ext_pub_key, &rel_path)?;
        let network = chains::bitcoin::network_params(chain, &account.network)?;
        let seg_wit = SegWit::from_tag(&account.seg_wit)?;
        Ok(ExternalAddressSnapshot {
            address: chains::bitcoin::address_from_public_key(&network, seg_wit, &pubkey)?,
            derived_path: rel_path,
            kind: "EXTERNAL".to_string(),
        })
    }

    pub(crate) fn wallet_snapshot(
        &self,
        keystore: &Keystore,
        with_external: bool,
    ) -> Result<WalletSnapshot, WalletError> {
        let meta = keystore.meta();
        let external_index = keystore.record().external_index;
        let mut accounts = vec![];
        for account in keystore.accounts() {
            let external = if with_external {
                self.external_address_for(account, external_index).ok()
            } else {
                None
            };
            accounts.push(self.account_snapshot(account, external)?);
        }
        Ok(WalletSnapshot {
            id: keystore.id(),
            name: meta.name,
            source: meta.source.as_tag().to_string(),
            created_at: meta.timestamp,
            accounts,
        })
    }

    /// Derive accounts for every spec, preserving request order.
    pub async fn derive_accounts(
        &self,
        id: &str,
        auth: &Auth,
        specs: &[DerivationSpec],
    ) -> Result<Vec<AccountSnapshot>, WalletError> {
        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let resolved = self.resolve_auth(keystore, auth)?;

        let mut snapshots = vec![];
        {
            let mut guard = resolved.unlock(keystore)?;
            for spec in specs {
                let account = derive_account_unlocked(guard.keystore_mut(), spec)?;
                snapshots.push(self.account_snapshot(&account, None)?);
            }
        }
        self.storage.flush(keystore)?;
        info!("derived {} account(s) for wallet {}", snapshots.len(), id);
        Ok(snapshots)
    }

    /// All recorded accounts of a wallet. Pure read, no password.
    pub async fn list_accounts(&self, id: &str) -> Result<Vec<AccountSnapshot>, WalletError> {
        let map = self.keystores.read();
        let keystore = map
            .get(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        keystore
            .accounts()
            .iter()
            .map(|account| self.account_snapshot(account, None))
            .collect()
    }

    /// The plain (unencrypted) account xpub; password-gated.
    pub async fn extended_public_key(
        &self,
        id: &str,
        auth: &Auth,
        chain_type: &str,
        address: &str,
    ) -> Result<String, WalletError> {
        ChainType::from_tag(chain_type)?;
        let map = self.keystores.read();
        let keystore = map
            .get(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        self.resolve_auth(keystore, auth)?;
        let account = keystore
            .account(chain_type, address)
            .ok_or_else(|| WalletError::AccountNotFound(format!("{}/{}", chain_type, address)))?;
        if account.ext_pub_key.is_empty() {
            return Err(WalletError::AccountNotFound(format!(
                "{}/{} carries no extended public key",
                chain_type, address
            )));
        }
        Ok(account.ext_pub_key.clone())
    }

    /// Deterministically derive the Nth external (receive) address for a
    /// bitcoin-fork wallet; extends the pool high-water mark when `index`
    /// reaches past it. No password required — public derivation only.
    pub async fn calc_external_address(
        &self,
        id: &str,
        chain_type: &str,
        index: u32,
    ) -> Result<ExternalAddressSnapshot, WalletError> {
        let chain = ChainType::from_tag(chain_type)?;
        if !chain.is_bitcoin_fork() {
            return Err(WalletError::UnsupportedChainType(format!(
                "external addresses are not defined for {}",
                chain_type
            )));
        }

        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let account = keystore
            .account_by_coin(chain_type)
            .ok_or_else(|| WalletError::AccountNotFound(chain_type.to_string()))?
            .clone();

        let snapshot = self.external_address_for(&account, index)?;

        // indices are assigned monotonically and never reused
        if index >= keystore.record().external_index {
            keystore.record_mut().external_index = index + 1;
            self.storage.flush(keystore)?;
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{test_manager, TEST_MNEMONIC, TEST_PASSWORD};
    use super::*;

    fn spec(chain: ChainType, path: &str, network: &str, seg_wit: SegWit) -> DerivationSpec {
        DerivationSpec {
            chain_type: chain,
            path: path.to_string(),
            network: network.to_string(),
            seg_wit,
            chain_id: String::new(),
        }
    }

    async fn import(manager: &crate::core::wallet_manager::WalletManager) -> String {
        manager
            .import_wallet_from_mnemonic(
                "derive-test",
                TEST_MNEMONIC,
                TEST_PASSWORD,
                "",
                spec(ChainType::Litecoin, "m/44'/1'/0'/0/0", "TESTNET", SegWit::None),
                false,
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_derive_is_deterministic_and_ordered() {
        let (manager, _dir) = test_manager().await;
        let id = import(&manager).await;
        let auth = Auth::Password(TEST_PASSWORD.to_string());

        let specs = vec![
            spec(ChainType::Ethereum, "m/44'/60'/0'/0/0", "", SegWit::None),
            spec(ChainType::Tron, "m/44'/195'/0'/0/0", "", SegWit::None),
        ];
        let first = manager.derive_accounts(&id, &auth, &specs).await.unwrap();
        let second = manager.derive_accounts(&id, &auth, &specs).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].chain_type, "ETHEREUM");
        assert_eq!(first[1].chain_type, "TRON");
        assert_eq!(first[1].address, "TY2uroBeZ5trA9QT96aEWj32XLkAAhQ9R2");
        assert_eq!(first, second);

        // re-deriving did not duplicate accounts
        let accounts = manager.list_accounts(&id).await.unwrap();
        assert_eq!(accounts.len(), 3); // LTC from import + ETH + TRON
    }

    #[tokio::test]
    async fn test_derive_rejects_bad_auth_and_path() {
        let (manager, _dir) = test_manager().await;
        let id = import(&manager).await;

        let err = manager
            .derive_accounts(
                &id,
                &Auth::Password("wrong".to_string()),
                &[spec(ChainType::Ethereum, "m/44'/60'/0'/0/0", "", SegWit::None)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::IncorrectPassword));

        let err = manager
            .derive_accounts(
                &id,
                &Auth::Password(TEST_PASSWORD.to_string()),
                &[spec(ChainType::Ethereum, "m/not-a-path", "", SegWit::None)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidDerivationPath(_)));
    }

    #[tokio::test]
    async fn test_external_address_pool_monotone() {
        let (manager, _dir) = test_manager().await;
        let id = import(&manager).await;

        let first = manager.calc_external_address(&id, "LITECOIN", 1).await.unwrap();
        assert_eq!(first.derived_path, "0/1");
        assert_eq!(first.kind, "EXTERNAL");

        let third = manager.calc_external_address(&id, "LITECOIN", 3).await.unwrap();
        assert_eq!(third.derived_path, "0/3");
        assert_ne!(first.address, third.address);

        // re-requesting an old index still yields the same address
        let again = manager.calc_external_address(&id, "LITECOIN", 1).await.unwrap();
        assert_eq!(again.address, first.address);

        // pool high-water advanced past the largest requested index
        let map = manager.keystores.read();
        assert_eq!(map.get(&id).unwrap().record().external_index, 4);
    }

    #[tokio::test]
    async fn test_external_address_requires_utxo_chain() {
        let (manager, _dir) = test_manager().await;
        let id = import(&manager).await;
        let auth = Auth::Password(TEST_PASSWORD.to_string());
        manager
            .derive_accounts(
                &id,
                &auth,
                &[spec(ChainType::Ethereum, "m/44'/60'/0'/0/0", "", SegWit::None)],
            )
            .await
            .unwrap();

        assert!(manager.calc_external_address(&id, "ETHEREUM", 1).await.is_err());
        assert!(manager.calc_external_address(&id, "DOGE", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_extended_public_key_gated_and_encrypted_snapshot() {
        let (manager, _dir) = test_manager().await;
        let id = import(&manager).await;
        let auth = Auth::Password(TEST_PASSWORD.to_string());

        let accounts = manager.list_accounts(&id).await.unwrap();
        let ltc = &accounts[0];
        assert!(!ltc.extended_xpub_key.is_empty());

        let xpub = manager
            .extended_public_key(&id, &auth, "LITECOIN", &ltc.address)
            .await
            .unwrap();
        assert!(xpub.starts_with("tpub"));
        // snapshot carries the encrypted form, not the raw xpub
        assert_ne!(ltc.extended_xpub_key, xpub);

        let err = manager
            .extended_public_key(&id, &Auth::Password("bad".to_string()), "LITECOIN", &ltc.address)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::IncorrectPassword));

        let err = manager
            .extended_public_key(&id, &auth, "LITECOIN", "unknown")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::AccountNotFound(_)));
    }
}
