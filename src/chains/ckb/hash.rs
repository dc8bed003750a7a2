//! CKB flavored blake2b (personalization `ckb-default-hash`).

const CKB_PERSONALIZATION: &[u8] = b"ckb-default-hash";

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let hash = blake2b_simd::Params::new()
        .hash_length(32)
        .personal(CKB_PERSONALIZATION)
        .hash(data);
    hash.as_bytes().try_into().expect("32-byte digest")
}

/// blake160: the leading 20 bytes of the 256-bit digest.
pub fn blake2b_160(data: &[u8]) -> [u8; 20] {
    blake2b_256(data)[..20].try_into().expect("20-byte prefix")
}

/// Incremental variant used for witness digests.
pub struct CkbBlake2b {
    state: blake2b_simd::State,
}

impl CkbBlake2b {
    pub fn new() -> CkbBlake2b {
        CkbBlake2b {
            state: blake2b_simd::Params::new()
                .hash_length(32)
                .personal(CKB_PERSONALIZATION)
                .to_state(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    pub fn finalize(self) -> [u8; 32] {
        self.state
            .finalize()
            .as_bytes()
            .try_into()
            .expect("32-byte digest")
    }
}

impl Default for CkbBlake2b {
    fn default() -> Self {
        Self::new()
    }
}
