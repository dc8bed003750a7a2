//! Ephemeral, password-gated cache of derived keystore credentials.
//!
//! Re-deriving the KDF credential on every signing call is expensive; a
//! caller batching operations can fetch the credential once, register it here
//! under a throwaway temp password, and authenticate the following calls with
//! that temp password instead. Entries live only in this process: nothing is
//! ever persisted, entries expire, and eviction zeroizes the key bytes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::hash::dsha256;
use crate::crypto::kdf::CREDENTIAL_LEN;

struct CacheEntry {
    credential: Zeroizing<[u8; CREDENTIAL_LEN]>,
    temp_password_hash: [u8; 32],
    expires_at: Instant,
}

pub struct DerivedKeyCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl DerivedKeyCache {
    pub fn new(ttl: Duration) -> DerivedKeyCache {
        DerivedKeyCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register `credential` for `wallet_id`, gated by `temp_password`.
    /// Replaces any previous entry for the same wallet.
    pub fn put(&self, wallet_id: &str, credential: &[u8; CREDENTIAL_LEN], temp_password: &str) {
        let entry = CacheEntry {
            credential: Zeroizing::new(*credential),
            temp_password_hash: dsha256(temp_password.as_bytes()),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().insert(wallet_id.to_string(), entry);
        debug!("cached derived key for wallet {}", wallet_id);
    }

    /// Fetch the credential for `wallet_id` if `temp_password` matches a live
    /// entry. A miss is not an error — callers fall back to the full
    /// password path.
    pub fn get(
        &self,
        wallet_id: &str,
        temp_password: &str,
    ) -> Option<Zeroizing<[u8; CREDENTIAL_LEN]>> {
        let mut entries = self.entries.lock();
        let entry = entries.get(wallet_id)?;
        if entry.expires_at <= Instant::now() {
            entries.remove(wallet_id);
            return None;
        }
        let candidate = dsha256(temp_password.as_bytes());
        let matches: bool = candidate.ct_eq(&entry.temp_password_hash).into();
        if matches {
            Some(entry.credential.clone())
        } else {
            None
        }
    }

    /// Drop the entry for one wallet. Called on removal and whenever
    /// credential verification fails for that id.
    pub fn clear(&self, wallet_id: &str) {
        if self.entries.lock().remove(wallet_id).is_some() {
            debug!("cleared derived key cache for wallet {}", wallet_id);
        }
    }

    /// Drop everything.
    pub fn clear_all(&self) {
        self.entries.lock().clear();
    }

    pub fn contains(&self, wallet_id: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(wallet_id) {
            Some(entry) if entry.expires_at > Instant::now() => true,
            Some(_) => {
                entries.remove(wallet_id);
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(byte: u8) -> [u8; CREDENTIAL_LEN] {
        [byte; CREDENTIAL_LEN]
    }

    #[test]
    fn test_put_get_round_trip() {
        let cache = DerivedKeyCache::new(Duration::from_secs(60));
        cache.put("w1", &credential(7), "temp-pass");

        let hit = cache.get("w1", "temp-pass").unwrap();
        assert_eq!(AsRef::<[u8]>::as_ref(&hit), &credential(7));
        assert!(cache.contains("w1"));
    }

    #[test]
    fn test_wrong_temp_password_misses() {
        let cache = DerivedKeyCache::new(Duration::from_secs(60));
        cache.put("w1", &credential(7), "temp-pass");
        assert!(cache.get("w1", "other").is_none());
        assert!(cache.get("w2", "temp-pass").is_none());
    }

    #[test]
    fn test_expiry_evicts() {
        let cache = DerivedKeyCache::new(Duration::from_millis(0));
        cache.put("w1", &credential(1), "t");
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("w1", "t").is_none());
        assert!(!cache.contains("w1"));
    }

    #[test]
    fn test_clear_one_and_all() {
        let cache = DerivedKeyCache::new(Duration::from_secs(60));
        cache.put("w1", &credential(1), "t1");
        cache.put("w2", &credential(2), "t2");

        cache.clear("w1");
        assert!(!cache.contains("w1"));
        assert!(cache.contains("w2"));

        cache.clear_all();
        assert!(!cache.contains("w2"));
    }

    #[test]
    fn test_put_replaces_previous_entry() {
        let cache = DerivedKeyCache::new(Duration::from_secs(60));
        cache.put("w1", &credential(1), "old");
        cache.put("w1", &credential(2), "new");
        assert!(cache.get("w1", "old").is_none());
        assert_eq!(AsRef::<[u8]>::as_ref(&cache.get("w1", "new").unwrap()), &credential(2));
    }
}
