//! Encrypted keystore records and their in-memory wrapper.
//!
//! One wallet = one `KeystoreRecord` persisted as JSON. The `Keystore` enum
//! wraps a record together with the (transient) unlocked payload; every
//! signing/export path goes through an unlock, and `KeystoreGuard` guarantees
//! the payload is wiped again when the operation ends.

pub mod hd;
pub mod private;
pub mod storage;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

pub use hd::HdKeystore;
pub use private::{EosKeyEntry, PrivateKeystore};
pub use storage::KeystoreStorage;

use crate::core::domain::{Account, Metadata};
use crate::core::errors::WalletError;
use crate::crypto::kdf::CREDENTIAL_LEN;
use crate::crypto::SealedBlob;

pub const HD_KEYSTORE_VERSION: i64 = 11000;
pub const PRIVATE_KEYSTORE_VERSION: i64 = 11001;

/// What kind of secret the sealed payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    Mnemonic,
    Private,
    EosKeys,
}

/// Persisted wallet record (camelCase JSON, one file per wallet).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystoreRecord {
    pub id: String,
    pub version: i64,
    pub key_type: KeyType,
    pub key_hash: String,
    pub crypto: SealedBlob,
    #[serde(default)]
    pub active_accounts: Vec<Account>,
    /// Next external receive index for bitcoin-fork wallets (monotone)
    #[serde(default = "default_external_index")]
    pub external_index: u32,
    pub meta: Metadata,
}

fn default_external_index() -> u32 {
    1
}

impl KeystoreRecord {
    pub fn new(
        version: i64,
        key_type: KeyType,
        key_hash: String,
        crypto: SealedBlob,
        meta: Metadata,
    ) -> KeystoreRecord {
        KeystoreRecord {
            id: Uuid::new_v4().to_string(),
            version,
            key_type,
            key_hash,
            crypto,
            active_accounts: vec![],
            external_index: default_external_index(),
            meta,
        }
    }
}

#[derive(Debug)]
pub enum Keystore {
    Hd(HdKeystore),
    PrivateKey(PrivateKeystore),
}

impl Keystore {
    pub fn from_json(json: &str) -> Result<Keystore, WalletError> {
        let record: KeystoreRecord = serde_json::from_str(json)
            .map_err(|e| WalletError::InvalidKeystoreFormat(e.to_string()))?;
        match record.version {
            HD_KEYSTORE_VERSION => Ok(Keystore::Hd(HdKeystore::from_record(record))),
            PRIVATE_KEYSTORE_VERSION => Ok(Keystore::PrivateKey(PrivateKeystore::from_record(record))),
            other => Err(WalletError::InvalidKeystoreFormat(format!(
                "unknown keystore version {}",
                other
            ))),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self.record()).expect("keystore record serializes")
    }

    pub fn record(&self) -> &KeystoreRecord {
        match self {
            Keystore::Hd(ks) => &ks.record,
            Keystore::PrivateKey(ks) => &ks.record,
        }
    }

    pub fn record_mut(&mut self) -> &mut KeystoreRecord {
        match self {
            Keystore::Hd(ks) => &mut ks.record,
            Keystore::PrivateKey(ks) => &mut ks.record,
        }
    }

    pub fn id(&self) -> String {
        self.record().id.clone()
    }

    pub fn set_id(&mut self, id: &str) {
        self.record_mut().id = id.to_string();
    }

    pub fn meta(&self) -> Metadata {
        self.record().meta.clone()
    }

    pub fn key_hash(&self) -> String {
        self.record().key_hash.clone()
    }

    pub fn key_type(&self) -> KeyType {
        self.record().key_type
    }

    /// HD keystores can keep deriving new accounts; private-key stores cannot.
    pub fn determinable(&self) -> bool {
        matches!(self, Keystore::Hd(_))
    }

    pub fn accounts(&self) -> &[Account] {
        &self.record().active_accounts
    }

    pub fn account(&self, coin: &str, address: &str) -> Option<&Account> {
        self.record()
            .active_accounts
            .iter()
            .find(|acc| acc.coin == coin && acc.address == address)
    }

    pub fn account_by_coin(&self, coin: &str) -> Option<&Account> {
        self.record().active_accounts.iter().find(|acc| acc.coin == coin)
    }

    /// Idempotent upsert keyed on (coin, derivation path).
    pub fn upsert_account(&mut self, account: Account) {
        let accounts = &mut self.record_mut().active_accounts;
        if let Some(existing) = accounts
            .iter_mut()
            .find(|a| a.coin == account.coin && a.derivation_path == account.derivation_path)
        {
            *existing = account;
        } else {
            accounts.push(account);
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.record().crypto.verify_password(password)
    }

    /// The KDF credential for `password` — the derived key handed to the
    /// short-lived cache.
    pub fn credential(&self, password: &str) -> Result<Zeroizing<[u8; CREDENTIAL_LEN]>, WalletError> {
        if !self.verify_password(password) {
            return Err(WalletError::IncorrectPassword);
        }
        self.record().crypto.credential(password)
    }

    pub fn verify_credential(&self, credential: &[u8]) -> bool {
        self.record().crypto.verify_credential(credential)
    }

    pub fn unlock_by_password(&mut self, password: &str) -> Result<(), WalletError> {
        match self {
            Keystore::Hd(ks) => ks.unlock_by_password(password),
            Keystore::PrivateKey(ks) => ks.unlock_by_password(password),
        }
    }

    pub fn unlock_by_credential(&mut self, credential: &[u8]) -> Result<(), WalletError> {
        match self {
            Keystore::Hd(ks) => ks.unlock_by_credential(credential),
            Keystore::PrivateKey(ks) => ks.unlock_by_credential(credential),
        }
    }

    pub fn lock(&mut self) {
        match self {
            Keystore::Hd(ks) => ks.lock(),
            Keystore::PrivateKey(ks) => ks.lock(),
        }
    }

    pub fn is_locked(&self) -> bool {
        match self {
            Keystore::Hd(ks) => ks.is_locked(),
            Keystore::PrivateKey(ks) => ks.is_locked(),
        }
    }

    /// Raw exportable payload: mnemonic, hex key, or EOS key-set JSON.
    /// Requires an unlocked keystore.
    pub fn export(&self) -> Result<Zeroizing<String>, WalletError> {
        match self {
            Keystore::Hd(ks) => Ok(Zeroizing::new(ks.mnemonic()?.to_string())),
            Keystore::PrivateKey(ks) => ks.export(),
        }
    }

    /// Secret key for an account, resolved by (coin, address). Requires an
    /// unlocked keystore.
    pub fn find_private_key(
        &self,
        coin: &str,
        address: &str,
    ) -> Result<Zeroizing<[u8; 32]>, WalletError> {
        match self {
            Keystore::PrivateKey(ks) => {
                // single-key store: the address must still belong to it
                if self.account(coin, address).is_none() && !self.accounts().is_empty() {
                    return Err(WalletError::AccountNotFound(format!("{}/{}", coin, address)));
                }
                ks.private_key()
            }
            Keystore::Hd(ks) => {
                let account = self
                    .account(coin, address)
                    .ok_or_else(|| WalletError::AccountNotFound(format!("{}/{}", coin, address)))?;
                let path = account.derivation_path.clone();
                let seed = ks.seed()?;
                hd::derive_secret_key(seed.as_ref(), &path)
            }
        }
    }

    /// Secret key at `rel_path` below the account of (coin, address) — used
    /// for UTXO inputs carrying a `derivedPath` like `0/3`.
    pub fn find_private_key_by_path(
        &self,
        coin: &str,
        address: &str,
        rel_path: &str,
    ) -> Result<Zeroizing<[u8; 32]>, WalletError> {
        match self {
            Keystore::PrivateKey(ks) => ks.private_key(),
            Keystore::Hd(ks) => {
                if rel_path.is_empty() {
                    return self.find_private_key(coin, address);
                }
                let account = self
                    .account(coin, address)
                    .ok_or_else(|| WalletError::AccountNotFound(format!("{}/{}", coin, address)))?;
                let account_path = hd::account_path(&account.derivation_path)?;
                let full_path = format!("{}/{}", account_path, rel_path.trim_start_matches('/'));
                let seed = ks.seed()?;
                hd::derive_secret_key(seed.as_ref(), &full_path)
            }
        }
    }
}

/// Unlocks a keystore for the duration of one operation; re-locks (and
/// zeroizes the cached payload) on drop, error paths included.
pub struct KeystoreGuard<'a> {
    keystore: &'a mut Keystore,
}

impl<'a> KeystoreGuard<'a> {
    pub fn unlock_by_password(
        keystore: &'a mut Keystore,
        password: &str,
    ) -> Result<KeystoreGuard<'a>, WalletError> {
        keystore.unlock_by_password(password)?;
        Ok(KeystoreGuard { keystore })
    }

    pub fn unlock_by_credential(
        keystore: &'a mut Keystore,
        credential: &[u8],
    ) -> Result<KeystoreGuard<'a>, WalletError> {
        keystore.unlock_by_credential(credential)?;
        Ok(KeystoreGuard { keystore })
    }

    pub fn keystore(&self) -> &Keystore {
        self.keystore
    }

    pub fn keystore_mut(&mut self) -> &mut Keystore {
        self.keystore
    }
}

impl Drop for KeystoreGuard<'_> {
    fn drop(&mut self) {
        self.keystore.lock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::KdfPreset;
    use crate::core::domain::Source;

    const TEST_MNEMONIC: &str =
        "inject kidney empty canal shadow pact comfort wife crush horse wife sketch";
    const PASSWORD: &str = "Insecure Pa55w0rd";

    fn hd_keystore() -> Keystore {
        let mut meta = Metadata::default();
        meta.name = "test-wallet".to_string();
        meta.source = Source::Mnemonic;
        Keystore::Hd(
            HdKeystore::from_mnemonic(TEST_MNEMONIC, PASSWORD, meta, KdfPreset::FastInsecure).unwrap(),
        )
    }

    fn btc_account() -> Account {
        Account {
            address: "mkeNU5nVnozJiaACDELLCsVUc8Wxoh1rQN".to_string(),
            derivation_path: "m/44'/1'/0'/0/0".to_string(),
            coin: "BITCOIN".to_string(),
            network: "TESTNET".to_string(),
            seg_wit: "NONE".to_string(),
            ext_pub_key: String::new(),
        }
    }

    #[test]
    fn test_json_round_trip_preserves_identity() {
        let mut keystore = hd_keystore();
        keystore.upsert_account(btc_account());
        let json = keystore.to_json();
        assert!(json.contains("activeAccounts"));
        assert!(json.contains("keyHash"));

        let restored = Keystore::from_json(&json).unwrap();
        assert_eq!(restored.id(), keystore.id());
        assert_eq!(restored.key_hash(), keystore.key_hash());
        assert_eq!(restored.accounts().len(), 1);
        assert!(restored.determinable());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut keystore = hd_keystore();
        keystore.record_mut().version = 99;
        let err = Keystore::from_json(&keystore.to_json()).unwrap_err();
        assert!(matches!(err, WalletError::InvalidKeystoreFormat(_)));
    }

    #[test]
    fn test_upsert_account_idempotent() {
        let mut keystore = hd_keystore();
        keystore.upsert_account(btc_account());
        keystore.upsert_account(btc_account());
        assert_eq!(keystore.accounts().len(), 1);

        let mut other = btc_account();
        other.derivation_path = "m/44'/1'/0'/0/1".to_string();
        other.address = "other".to_string();
        keystore.upsert_account(other);
        assert_eq!(keystore.accounts().len(), 2);
    }

    #[test]
    fn test_export_requires_unlock() {
        let mut keystore = hd_keystore();
        assert!(keystore.export().is_err());
        let guard = KeystoreGuard::unlock_by_password(&mut keystore, PASSWORD).unwrap();
        assert_eq!(guard.keystore().export().unwrap().as_str(), TEST_MNEMONIC);
        drop(guard);
        assert!(keystore.is_locked());
        assert!(keystore.export().is_err());
    }

    #[test]
    fn test_credential_round_trip() {
        let mut keystore = hd_keystore();
        assert!(matches!(
            keystore.credential("nope"),
            Err(WalletError::IncorrectPassword)
        ));
        let credential = keystore.credential(PASSWORD).unwrap();
        assert!(keystore.verify_credential(credential.as_ref()));
        assert!(!keystore.verify_credential(&[7u8; 32]));

        let guard = KeystoreGuard::unlock_by_credential(&mut keystore, credential.as_ref()).unwrap();
        assert_eq!(guard.keystore().export().unwrap().as_str(), TEST_MNEMONIC);
    }

    #[test]
    fn test_find_private_key_requires_known_account() {
        let mut keystore = hd_keystore();
        keystore.upsert_account(btc_account());
        let mut guard = KeystoreGuard::unlock_by_password(&mut keystore, PASSWORD).unwrap();
        let ks = guard.keystore_mut();

        assert!(ks
            .find_private_key("BITCOIN", "mkeNU5nVnozJiaACDELLCsVUc8Wxoh1rQN")
            .is_ok());
        assert!(matches!(
            ks.find_private_key("BITCOIN", "unknown-address"),
            Err(WalletError::AccountNotFound(_))
        ));

        let by_path = ks
            .find_private_key_by_path("BITCOIN", "mkeNU5nVnozJiaACDELLCsVUc8Wxoh1rQN", "0/0")
            .unwrap();
        let direct = ks
            .find_private_key("BITCOIN", "mkeNU5nVnozJiaACDELLCsVUc8Wxoh1rQN")
            .unwrap();
        assert_eq!(AsRef::<[u8]>::as_ref(&by_path), AsRef::<[u8]>::as_ref(&direct));
    }
}
