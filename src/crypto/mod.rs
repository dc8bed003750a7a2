//! Crypto building blocks: KDF, authenticated sealing, digests, xpub
//! encryption for watch-only export.

pub mod cipher;
pub mod hash;
pub mod kdf;
pub mod xpub;

pub use cipher::SealedBlob;
pub use kdf::{Kdf, CREDENTIAL_LEN};

/// Fill `len` bytes from the OS RNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut buf = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf
}
