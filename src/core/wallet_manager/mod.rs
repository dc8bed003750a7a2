//! Wallet lifecycle manager
//!
//! Top-level orchestrator composing the secure key store, derivation engine,
//! derived-key cache and per-chain signers.
//!
//! ## Module structure
//! - `lifecycle`  - import / exists / remove / verify-password
//! - `derivation` - account derivation, xpub handling, external addresses
//! - `export`     - mnemonic / private-key / keystore export
//! - `signing`    - transaction + message signing, derived-key cache ops
//!
//! ## Concurrency model
//! Operations on one wallet id serialize on a per-id mutex; operations on
//! distinct ids run in parallel. The registry itself sits behind an RwLock
//! and no lock is ever held across an await point.

pub mod derivation;
pub mod export;
pub mod lifecycle;
pub mod signing;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::core::config::EngineConfig;
use crate::core::derived_key_cache::DerivedKeyCache;
use crate::core::errors::WalletError;
use crate::keystore::{Keystore, KeystoreStorage};

/// Authentication material accompanying a request: the wallet password (or a
/// temp password registered in the derived-key cache), or the hex derived
/// key itself.
#[derive(Debug, Clone)]
pub enum Auth {
    Password(String),
    DerivedKey(String),
}

/// One derived account as presented across the bridge. `extended_xpub_key`
/// is already encrypted for watch-only export.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub chain_type: String,
    pub address: String,
    pub path: String,
    pub extended_xpub_key: String,
    pub external_address: Option<ExternalAddressSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalAddressSnapshot {
    pub address: String,
    pub derived_path: String,
    pub kind: String,
}

/// Aggregate wallet view returned by imports and lookups.
#[derive(Debug, Clone)]
pub struct WalletSnapshot {
    pub id: String,
    pub name: String,
    pub source: String,
    pub created_at: i64,
    pub accounts: Vec<AccountSnapshot>,
}

/// Wallet manager: owns every keystore loaded from the storage directory.
pub struct WalletManager {
    pub(crate) config: EngineConfig,
    pub(crate) keystores: Arc<RwLock<HashMap<String, Keystore>>>,
    pub(crate) storage: KeystoreStorage,
    pub(crate) derived_keys: DerivedKeyCache,
    op_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WalletManager {
    /// Create a manager rooted at `config.keystore_dir`, loading every
    /// keystore already present there.
    pub async fn new(config: &EngineConfig) -> Result<WalletManager, WalletError> {
        if config.keystore_dir.is_empty() {
            return Err(WalletError::InvalidInput("keystore_dir cannot be empty".to_string()));
        }
        let storage = KeystoreStorage::new(&config.keystore_dir)?;

        let mut map = HashMap::new();
        for keystore in storage.scan()? {
            map.insert(keystore.id(), keystore);
        }
        info!("wallet manager ready with {} wallet(s)", map.len());

        Ok(WalletManager {
            config: config.clone(),
            keystores: Arc::new(RwLock::new(map)),
            storage,
            derived_keys: DerivedKeyCache::new(Duration::from_secs(config.derived_key_ttl_secs)),
            op_locks: Mutex::new(HashMap::new()),
        })
    }

    /// The serialization lock for one wallet id.
    pub(crate) fn wallet_lock(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.op_locks.lock();
        locks.entry(id.to_string()).or_default().clone()
    }

    pub(crate) fn ensure_exists(&self, id: &str) -> Result<(), WalletError> {
        if self.keystores.read().contains_key(id) {
            Ok(())
        } else {
            Err(WalletError::WalletNotFound(id.to_string()))
        }
    }

    /// Resolve `auth` against a keystore: real password first, then the
    /// derived-key cache (treating the supplied password as a temp
    /// password), then an explicit derived key.
    pub(crate) fn resolve_auth(
        &self,
        keystore: &Keystore,
        auth: &Auth,
    ) -> Result<ResolvedAuth, WalletError> {
        match auth {
            Auth::Password(password) => {
                if keystore.verify_password(password) {
                    return Ok(ResolvedAuth::Password(password.clone()));
                }
                if let Some(credential) = self.derived_keys.get(&keystore.id(), password) {
                    if keystore.verify_credential(credential.as_ref()) {
                        return Ok(ResolvedAuth::Credential(credential));
                    }
                    // stale entry — the wallet was re-sealed since caching
                    self.derived_keys.clear(&keystore.id());
                }
                Err(WalletError::IncorrectPassword)
            }
            Auth::DerivedKey(hex_key) => {
                let bytes = hex::decode(hex_key)
                    .map_err(|_| WalletError::IncorrectPassword)?;
                let credential: [u8; 32] =
                    bytes.try_into().map_err(|_| WalletError::IncorrectPassword)?;
                if keystore.verify_credential(&credential) {
                    Ok(ResolvedAuth::Credential(zeroize::Zeroizing::new(credential)))
                } else {
                    self.derived_keys.clear(&keystore.id());
                    Err(WalletError::IncorrectPassword)
                }
            }
        }
    }
}

/// Outcome of authentication, ready to unlock a keystore.
pub(crate) enum ResolvedAuth {
    Password(String),
    Credential(zeroize::Zeroizing<[u8; 32]>),
}

impl ResolvedAuth {
    pub(crate) fn unlock<'a>(
        &self,
        keystore: &'a mut Keystore,
    ) -> Result<crate::keystore::KeystoreGuard<'a>, WalletError> {
        match self {
            ResolvedAuth::Password(password) => {
                crate::keystore::KeystoreGuard::unlock_by_password(keystore, password)
            }
            ResolvedAuth::Credential(credential) => {
                crate::keystore::KeystoreGuard::unlock_by_credential(keystore, credential.as_ref())
            }
        }
    }
}
