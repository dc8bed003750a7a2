//! Core engine: configuration, domain model, derived-key cache and the
//! wallet lifecycle manager.

pub mod config;
pub mod derived_key_cache;
pub mod domain;
pub mod errors;
pub mod wallet_manager;

pub use config::{EngineConfig, KdfPreset};
pub use derived_key_cache::DerivedKeyCache;
pub use domain::{Account, ChainType, DerivationSpec, Metadata, SegWit, Source};
pub use errors::WalletError;
pub use wallet_manager::{Auth, WalletManager};
