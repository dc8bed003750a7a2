#![allow(clippy::result_large_err)]
#![allow(clippy::large_enum_variant)]

//! chain-keyring: multi-chain wallet key management and signing engine.
//!
//! Imports, derives, stores, exports and deletes cryptographic key material
//! (BIP39 mnemonics, keystores, raw private keys), derives per-chain
//! accounts, and signs transactions/messages for bitcoin-fork, Ethereum,
//! Tron, EOS and Nervos CKB chains. Keystores are sealed at rest under a
//! user password; the bridge surface in [`api`] speaks a protobuf-compatible
//! message format.

pub mod api;
pub mod chains;
pub mod core;
pub mod crypto;
pub mod keystore;

pub use crate::core::config::{EngineConfig, KdfPreset};
pub use crate::core::errors::WalletError;
pub use crate::core::wallet_manager::{Auth, WalletManager};

use once_cell::sync::OnceCell;

static TRACING: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber (filtered by `RUST_LOG`). Host
/// processes call this once at startup; repeated calls are no-ops.
pub fn init_logging() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}
