//! File-backed keystore persistence: one JSON file per wallet id.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::errors::WalletError;
use crate::keystore::Keystore;

#[derive(Debug, Clone)]
pub struct KeystoreStorage {
    dir: PathBuf,
}

impl KeystoreStorage {
    /// Open (and create if missing) the keystore directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<KeystoreStorage, WalletError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| WalletError::StorageError(format!("create {}: {}", dir.display(), e)))?;
        Ok(KeystoreStorage { dir })
    }

    fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Load every readable keystore file. Files that fail to parse are
    /// skipped with a warning, not fatal — one corrupt record must not take
    /// the whole wallet directory down.
    pub fn scan(&self) -> Result<Vec<Keystore>, WalletError> {
        let mut keystores = vec![];
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("skipping unreadable keystore {}: {}", path.display(), e);
                    continue;
                }
            };
            match Keystore::from_json(&contents) {
                Ok(ks) => keystores.push(ks),
                Err(e) => warn!("skipping invalid keystore {}: {}", path.display(), e),
            }
        }
        info!("loaded {} keystore(s) from {}", keystores.len(), self.dir.display());
        Ok(keystores)
    }

    /// Atomic write: temp file + rename, so a crash never leaves a
    /// half-written record behind.
    pub fn flush(&self, keystore: &Keystore) -> Result<(), WalletError> {
        let id = keystore.id();
        let json = keystore.to_json();
        let tmp_path = self.dir.join(format!(".{}.json.tmp", id));
        fs::write(&tmp_path, json.as_bytes())
            .map_err(|e| WalletError::StorageError(format!("write {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, self.file_path(&id))
            .map_err(|e| WalletError::StorageError(format!("rename keystore {}: {}", id, e)))?;
        debug!("flushed keystore {}", id);
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), WalletError> {
        let path = self.file_path(id);
        fs::remove_file(&path)
            .map_err(|e| WalletError::StorageError(format!("delete {}: {}", path.display(), e)))?;
        info!("deleted keystore file for {}", id);
        Ok(())
    }

    pub fn exists(&self, id: &str) -> bool {
        self.file_path(id).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::KdfPreset;
    use crate::core::domain::Metadata;
    use crate::keystore::HdKeystore;

    const TEST_MNEMONIC: &str =
        "inject kidney empty canal shadow pact comfort wife crush horse wife sketch";

    fn sample_keystore() -> Keystore {
        Keystore::Hd(
            HdKeystore::from_mnemonic(
                TEST_MNEMONIC,
                "Insecure Pa55w0rd",
                Metadata::default(),
                KdfPreset::FastInsecure,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_flush_scan_delete_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = KeystoreStorage::new(tmp.path()).unwrap();

        let keystore = sample_keystore();
        let id = keystore.id();
        storage.flush(&keystore).unwrap();
        assert!(storage.exists(&id));

        let loaded = storage.scan().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), id);

        storage.delete(&id).unwrap();
        assert!(!storage.exists(&id));
        assert!(storage.scan().unwrap().is_empty());
    }

    #[test]
    fn test_scan_skips_garbage_files() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = KeystoreStorage::new(tmp.path()).unwrap();

        std::fs::write(tmp.path().join("junk.json"), b"{not json").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"ignore me").unwrap();
        let keystore = sample_keystore();
        storage.flush(&keystore).unwrap();

        let loaded = storage.scan().unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_delete_missing_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = KeystoreStorage::new(tmp.path()).unwrap();
        assert!(storage.delete("nope").is_err());
    }
}
