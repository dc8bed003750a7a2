//! Wallet lifecycle: create, import, exists, verify-password, remove.

use tracing::{info, warn};

use super::{Auth, WalletManager, WalletSnapshot};
use crate::core::domain::{DerivationSpec, Metadata, Source};
use crate::core::errors::WalletError;
use crate::keystore::{
    hd, private, EosKeyEntry, HdKeystore, Keystore, KeystoreGuard, PrivateKeystore,
};

/// One `permission → public key` binding accompanying an EOS private-key
/// import.
#[derive(Debug, Clone, Default)]
pub struct EosPermission {
    pub permission: String,
    pub public_key: String,
}

impl WalletManager {
    /// Fresh 12-word BIP39 mnemonic. Stateless.
    pub fn generate_mnemonic(&self) -> String {
        hd::generate_mnemonic()
    }

    fn find_id_by_key_hash(&self, key_hash: &str) -> Option<String> {
        self.keystores
            .read()
            .values()
            .find(|ks| ks.key_hash() == key_hash)
            .map(|ks| ks.id())
    }

    /// Duplicate-import policy: same key material either errors or (with
    /// `overwrite`) replaces the record while keeping the wallet id stable.
    fn resolve_duplicate(
        &self,
        key_hash: &str,
        overwrite: bool,
    ) -> Result<Option<String>, WalletError> {
        match self.find_id_by_key_hash(key_hash) {
            Some(existing) if !overwrite => Err(WalletError::WalletAlreadyExists(existing)),
            Some(existing) => Ok(Some(existing)),
            None => Ok(None),
        }
    }

    fn install_keystore(
        &self,
        mut keystore: Keystore,
        existing_id: Option<String>,
        with_external: bool,
    ) -> Result<WalletSnapshot, WalletError> {
        if let Some(id) = existing_id {
            keystore.set_id(&id);
            self.derived_keys.clear(&id);
            warn!("overwriting wallet {} with re-imported key material", id);
        }
        let id = keystore.id();

        let lock = self.wallet_lock(&id);
        let _serialized = lock.lock();

        self.storage.flush(&keystore)?;
        let snapshot = self.wallet_snapshot(&keystore, with_external)?;
        self.keystores.write().insert(id.clone(), keystore);
        info!("✅ wallet {} installed", id);
        Ok(snapshot)
    }

    /// Create a brand-new HD wallet from generated entropy. No accounts are
    /// derived yet.
    pub async fn create_hd_wallet(
        &self,
        name: &str,
        password: &str,
        password_hint: &str,
    ) -> Result<WalletSnapshot, WalletError> {
        let mnemonic = hd::generate_mnemonic();
        let meta = Metadata {
            name: name.to_string(),
            password_hint: password_hint.to_string(),
            source: Source::NewMnemonic,
            ..Metadata::default()
        };
        let keystore = Keystore::Hd(HdKeystore::from_mnemonic(
            &mnemonic,
            password,
            meta,
            self.config.kdf,
        )?);
        self.install_keystore(keystore, None, false)
    }

    /// Import a mnemonic and derive its first account in one step, the way
    /// the bridge drives it.
    ///
    /// # Arguments
    /// * `name` - Wallet display name
    /// * `mnemonic` - BIP39 phrase (whitespace/case normalized at import)
    /// * `password` - Password sealing the phrase at rest
    /// * `initial` - Chain/path/network of the first derived account
    /// * `overwrite` - Replace an existing wallet holding the same phrase
    ///
    /// # Errors
    /// * `InvalidMnemonic` - Wordlist or checksum failure
    /// * `WalletAlreadyExists` - Same phrase imported and `overwrite` is false
    pub async fn import_wallet_from_mnemonic(
        &self,
        name: &str,
        mnemonic: &str,
        password: &str,
        password_hint: &str,
        initial: DerivationSpec,
        overwrite: bool,
    ) -> Result<WalletSnapshot, WalletError> {
        let normalized = hd::validate_mnemonic(mnemonic)?;
        let existing = self.resolve_duplicate(&hd::key_hash_from_mnemonic(&normalized), overwrite)?;

        let meta = Metadata {
            name: name.to_string(),
            password_hint: password_hint.to_string(),
            source: Source::Mnemonic,
            ..Metadata::default()
        };
        let mut keystore = Keystore::Hd(HdKeystore::from_mnemonic(
            &normalized,
            password,
            meta,
            self.config.kdf,
        )?);

        {
            let mut guard = KeystoreGuard::unlock_by_password(&mut keystore, password)?;
            super::derivation::derive_account_unlocked(guard.keystore_mut(), &initial)?;
        }
        self.install_keystore(keystore, existing, true)
    }

    /// Import an exported keystore JSON. Identity (id, accounts, sealing)
    /// is preserved; only the source marker changes.
    pub async fn import_wallet_from_keystore(
        &self,
        keystore_json: &str,
        password: &str,
        overwrite: bool,
    ) -> Result<WalletSnapshot, WalletError> {
        let mut keystore = Keystore::from_json(keystore_json)?;
        if !keystore.verify_password(password) {
            return Err(WalletError::IncorrectPassword);
        }
        let existing = self.resolve_duplicate(&keystore.key_hash(), overwrite)?;
        // id collisions with a *different* wallet never overwrite silently
        if existing.is_none() && self.keystores.read().contains_key(&keystore.id()) {
            return Err(WalletError::WalletAlreadyExists(keystore.id()));
        }
        keystore.record_mut().meta.source = Source::Keystore;
        self.install_keystore(keystore, existing, false)
    }

    /// Import one raw private key (hex or WIF), or an EOS key set.
    #[allow(clippy::too_many_arguments)]
    pub async fn import_wallet_from_private_key(
        &self,
        name: &str,
        password: &str,
        password_hint: &str,
        initial: DerivationSpec,
        private_key: &str,
        eos_keys: &[(String, EosPermission)],
        overwrite: bool,
    ) -> Result<WalletSnapshot, WalletError> {
        let chain = initial.chain_type;

        let keystore_inner = if chain == crate::core::domain::ChainType::Eos {
            let entries = build_eos_entries(private_key, eos_keys)?;
            let meta = Metadata {
                name: name.to_string(),
                password_hint: password_hint.to_string(),
                source: Source::Private,
                ..Metadata::default()
            };
            PrivateKeystore::from_eos_keys(&entries, password, meta, self.config.kdf)?
        } else {
            let (secret, from_wif) = decode_single_key(chain, &initial.network, private_key)?;
            let meta = Metadata {
                name: name.to_string(),
                password_hint: password_hint.to_string(),
                source: if from_wif { Source::Wif } else { Source::Private },
                ..Metadata::default()
            };
            PrivateKeystore::from_private_key(&secret, password, meta, self.config.kdf)?
        };

        let existing = self.resolve_duplicate(&keystore_inner.record.key_hash, overwrite)?;
        let mut keystore = Keystore::PrivateKey(keystore_inner);
        {
            let mut guard = KeystoreGuard::unlock_by_password(&mut keystore, password)?;
            super::derivation::derive_account_unlocked(guard.keystore_mut(), &initial)?;
        }
        self.install_keystore(keystore, existing, false)
    }

    pub async fn exists_mnemonic(&self, mnemonic: &str) -> Result<Option<String>, WalletError> {
        let normalized = hd::validate_mnemonic(mnemonic)?;
        Ok(self.find_id_by_key_hash(&hd::key_hash_from_mnemonic(&normalized)))
    }

    pub async fn exists_private_key(&self, private_key: &str) -> Result<Option<String>, WalletError> {
        // WIF and hex forms of the same key must collide
        let key_hash = match crate::chains::wif_decode(private_key) {
            Ok((key, _, _)) => private::key_hash_from_private_key(&key),
            Err(_) => {
                let bytes = hex::decode(private_key.trim()).map_err(|_| {
                    WalletError::InvalidInput("private key is neither WIF nor hex".to_string())
                })?;
                if bytes.len() != 32 {
                    return Err(WalletError::InvalidInput(
                        "private key must be 32 bytes".to_string(),
                    ));
                }
                private::key_hash_from_private_key(&bytes)
            }
        };
        Ok(self.find_id_by_key_hash(&key_hash))
    }

    pub async fn exists_keystore(
        &self,
        keystore_json: &str,
        password: &str,
    ) -> Result<Option<String>, WalletError> {
        let keystore = Keystore::from_json(keystore_json)?;
        if !keystore.verify_password(password) {
            return Err(WalletError::IncorrectPassword);
        }
        Ok(self.find_id_by_key_hash(&keystore.key_hash()))
    }

    /// Authenticate without side effects.
    pub async fn verify_password(&self, id: &str, auth: &Auth) -> Result<String, WalletError> {
        let map = self.keystores.read();
        let keystore = map
            .get(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        self.resolve_auth(keystore, auth)?;
        Ok(id.to_string())
    }

    /// Irreversibly delete a wallet: keystore file, registry entry, cached
    /// derived key. Once this returns, every later operation on `id` fails
    /// with `WalletNotFound`.
    pub async fn remove_wallet(&self, id: &str, auth: &Auth) -> Result<String, WalletError> {
        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        self.resolve_auth(keystore, auth)?;

        self.storage.delete(id)?;
        map.remove(id);
        self.derived_keys.clear(id);
        info!("wallet {} removed", id);
        Ok(id.to_string())
    }
}

fn build_eos_entries(
    single_key: &str,
    keys: &[(String, EosPermission)],
) -> Result<Vec<EosKeyEntry>, WalletError> {
    let mut raw: Vec<(String, EosPermission)> = keys.to_vec();
    if raw.is_empty() {
        if single_key.trim().is_empty() {
            return Err(WalletError::InvalidInput("no EOS keys supplied".to_string()));
        }
        raw.push((single_key.to_string(), EosPermission::default()));
    }

    let mut entries = vec![];
    for (key_str, permission) in raw {
        let secret = crate::chains::eos::parse_private_key(&key_str)?;
        let pair = crate::chains::eos::EosKeyPair::from_secret(&secret)?;
        if !permission.public_key.is_empty() && permission.public_key != pair.public_key {
            return Err(WalletError::InvalidInput(format!(
                "supplied public key {} does not match the private key",
                permission.public_key
            )));
        }
        entries.push(EosKeyEntry {
            permission: if permission.permission.is_empty() {
                "active".to_string()
            } else {
                permission.permission
            },
            public_key: pair.public_key,
            private_key: hex::encode(secret),
        });
    }
    Ok(entries)
}

/// Decode hex or WIF; WIF versions are checked against the target network.
fn decode_single_key(
    chain: crate::core::domain::ChainType,
    network: &str,
    private_key: &str,
) -> Result<([u8; 32], bool), WalletError> {
    let trimmed = private_key.trim();
    if let Ok(bytes) = hex::decode(trimmed) {
        if bytes.len() == 32 {
            return Ok((bytes.try_into().expect("32-byte key"), false));
        }
    }
    let (key, version, _compressed) = crate::chains::wif_decode(trimmed)?;
    if chain.is_bitcoin_fork() {
        let params = crate::chains::bitcoin::network_params(chain, network)?;
        if version != params.wif_prefix {
            return Err(WalletError::InvalidInput(format!(
                "WIF version 0x{:02x} does not match {} {}",
                version, chain, network
            )));
        }
    }
    Ok((key, true))
}
