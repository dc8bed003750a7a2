use serde::{Deserialize, Serialize};

/// Key-derivation preset applied to newly sealed keystores.
///
/// Imported keystores keep whatever parameters they were sealed with; this
/// only selects what new records are written with. The fast PBKDF2 preset
/// exists for tests and debug tooling, the same way the production KDF
/// rounds were dialed down in debug builds upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdfPreset {
    /// scrypt n=2^14, r=8, p=1 (memory-hard, production default)
    Scrypt,
    /// PBKDF2-HMAC-SHA256, c=10240
    Pbkdf2,
    /// PBKDF2-HMAC-SHA256, c=1024 — tests only
    FastInsecure,
}

impl Default for KdfPreset {
    fn default() -> Self {
        KdfPreset::Scrypt
    }
}

/// Engine configuration, created once at process start and read-only after.
///
/// `xpub_common_key` / `xpub_common_iv` are the process-wide AES-128 key and
/// IV (hex) used to encrypt extended public keys for watch-only export. They
/// are supplied by the host at init time and are not derived from any wallet
/// password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding one encrypted keystore JSON file per wallet
    pub keystore_dir: String,

    /// 16-byte AES key, hex encoded
    #[serde(default = "EngineConfig::default_xpub_common_key")]
    pub xpub_common_key: String,

    /// 16-byte AES IV, hex encoded
    #[serde(default = "EngineConfig::default_xpub_common_iv")]
    pub xpub_common_iv: String,

    /// KDF parameters for newly created keystores
    #[serde(default)]
    pub kdf: KdfPreset,

    /// Derived-key cache entry lifetime (seconds)
    #[serde(default = "EngineConfig::default_derived_key_ttl_secs")]
    pub derived_key_ttl_secs: u64,
}

impl EngineConfig {
    fn default_xpub_common_key() -> String {
        // host is expected to override at init; placeholder keeps tests hermetic
        "B888D25EC8C12BD5043777B1AC49F872".to_string()
    }

    fn default_xpub_common_iv() -> String {
        "9C0C30889CBCC5E01AB5B2BB88715799".to_string()
    }

    fn default_derived_key_ttl_secs() -> u64 {
        1800
    }

    /// Config rooted at `dir` with production defaults.
    pub fn new(dir: impl Into<String>) -> Self {
        EngineConfig {
            keystore_dir: dir.into(),
            xpub_common_key: Self::default_xpub_common_key(),
            xpub_common_iv: Self::default_xpub_common_iv(),
            kdf: KdfPreset::default(),
            derived_key_ttl_secs: Self::default_derived_key_ttl_secs(),
        }
    }
}
