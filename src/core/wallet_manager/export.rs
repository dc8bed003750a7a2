//! Password-gated export of key material.

use tracing::info;

use super::{Auth, WalletManager};
use crate::core::domain::ChainType;
use crate::core::errors::WalletError;
use crate::keystore::{hd, Keystore, KeyType};

/// Exported mnemonic together with the wallet's primary account, the shape
/// the bridge presents after a restore.
#[derive(Debug, Clone)]
pub struct MnemonicExport {
    pub mnemonic: String,
    pub path: String,
    pub address: String,
}

impl WalletManager {
    /// Export the mnemonic of an HD wallet.
    pub async fn export_mnemonic(&self, id: &str, auth: &Auth) -> Result<MnemonicExport, WalletError> {
        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        if !keystore.determinable() {
            return Err(WalletError::InvalidInput(
                "a private-key wallet has no mnemonic to export".to_string(),
            ));
        }
        let resolved = self.resolve_auth(keystore, auth)?;
        let (path, address) = keystore
            .accounts()
            .first()
            .map(|a| (a.derivation_path.clone(), a.address.clone()))
            .unwrap_or_default();

        let guard = resolved.unlock(keystore)?;
        let mnemonic = guard.keystore().export()?.to_string();
        info!("mnemonic exported for wallet {}", id);
        Ok(MnemonicExport {
            mnemonic,
            path,
            address,
        })
    }

    /// Export a single private key, formatted per chain: WIF for bitcoin
    /// forks (and EOS), hex for the account-based chains. For HD wallets
    /// `path` selects the key; empty path means the account's own path.
    pub async fn export_private_key(
        &self,
        id: &str,
        auth: &Auth,
        chain_type: &str,
        main_address: &str,
        path: &str,
    ) -> Result<String, WalletError> {
        let chain = ChainType::from_tag(chain_type)?;

        let lock = self.wallet_lock(id);
        let _serialized = lock.lock();

        let mut map = self.keystores.write();
        let keystore = map
            .get_mut(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        let resolved = self.resolve_auth(keystore, auth)?;

        // account context drives key resolution and formatting
        let account = keystore.account(chain_type, main_address).cloned();

        let guard = resolved.unlock(keystore)?;
        let ks = guard.keystore();

        if chain == ChainType::Eos {
            return export_eos_key(ks, main_address);
        }

        let account = account
            .ok_or_else(|| WalletError::AccountNotFound(format!("{}/{}", chain_type, main_address)))?;
        let secret = if path.is_empty() {
            ks.find_private_key(chain_type, main_address)?
        } else {
            let rel = hd::relative_path(path).unwrap_or_else(|_| path.to_string());
            ks.find_private_key_by_path(chain_type, main_address, &rel)?
        };

        let formatted = match chain {
            ChainType::Bitcoin | ChainType::Litecoin => {
                let params = crate::chains::bitcoin::network_params(chain, &account.network)?;
                crate::chains::wif_encode(&secret, params.wif_prefix, true)
            }
            _ => hex::encode(AsRef::<[u8]>::as_ref(&secret)),
        };
        info!("private key exported for wallet {} ({})", id, chain_type);
        Ok(formatted)
    }

    /// Export the full keystore JSON (still sealed — this never reveals key
    /// material, but it authenticates the caller first).
    pub async fn export_keystore(&self, id: &str, auth: &Auth) -> Result<String, WalletError> {
        let map = self.keystores.read();
        let keystore = map
            .get(id)
            .ok_or_else(|| WalletError::WalletNotFound(id.to_string()))?;
        self.resolve_auth(keystore, auth)?;
        info!("keystore exported for wallet {}", id);
        Ok(keystore.to_json())
    }
}

fn export_eos_key(keystore: &Keystore, public_key: &str) -> Result<String, WalletError> {
    match keystore {
        Keystore::PrivateKey(pk_store) if pk_store.record.key_type == KeyType::EosKeys => {
            let keys = pk_store.eos_keys()?;
            let entry = keys
                .iter()
                .find(|k| k.public_key == public_key)
                .or_else(|| keys.first())
                .ok_or_else(|| WalletError::AccountNotFound(public_key.to_string()))?;
            let secret: [u8; 32] = hex::decode(&entry.private_key)
                .map_err(|_| WalletError::InvalidKeystoreFormat("EOS key not hex".to_string()))?
                .try_into()
                .map_err(|_| WalletError::InvalidKeystoreFormat("EOS key not 32 bytes".to_string()))?;
            Ok(crate::chains::eos::private_key_to_wif(&secret))
        }
        _ => {
            let secret = keystore.find_private_key("EOS", public_key)?;
            Ok(crate::chains::eos::private_key_to_wif(&secret))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{test_manager, TEST_MNEMONIC, TEST_PASSWORD};
    use super::*;
    use crate::core::domain::{DerivationSpec, SegWit};
    use crate::core::wallet_manager::lifecycle::EosPermission;

    fn ltc_spec() -> DerivationSpec {
        DerivationSpec {
            chain_type: ChainType::Litecoin,
            path: "m/44'/1'/0'/0/0".to_string(),
            network: "TESTNET".to_string(),
            seg_wit: SegWit::None,
            chain_id: String::new(),
        }
    }

    #[tokio::test]
    async fn test_mnemonic_round_trip() {
        let (manager, _dir) = test_manager().await;
        let wallet = manager
            .import_wallet_from_mnemonic(
                "w",
                "  Inject kidney empty canal shadow pact comfort wife crush horse wife sketch ",
                TEST_PASSWORD,
                "",
                ltc_spec(),
                false,
            )
            .await
            .unwrap();

        let export = manager
            .export_mnemonic(&wallet.id, &Auth::Password(TEST_PASSWORD.into()))
            .await
            .unwrap();
        // normalization fixed at import
        assert_eq!(export.mnemonic, TEST_MNEMONIC);
        assert_eq!(export.path, "m/44'/1'/0'/0/0");
        assert_eq!(export.address, "mkeNU5nVnozJiaACDELLCsVUc8Wxoh1rQN");
    }

    #[tokio::test]
    async fn test_export_gated_by_password() {
        let (manager, _dir) = test_manager().await;
        let wallet = manager
            .import_wallet_from_mnemonic("w", TEST_MNEMONIC, TEST_PASSWORD, "", ltc_spec(), false)
            .await
            .unwrap();

        for bad in [
            manager.export_mnemonic(&wallet.id, &Auth::Password("bad".into())).await.err(),
            manager
                .export_private_key(&wallet.id, &Auth::Password("bad".into()), "LITECOIN", "x", "")
                .await
                .err(),
            manager.export_keystore(&wallet.id, &Auth::Password("bad".into())).await.err(),
        ] {
            assert!(matches!(bad, Some(WalletError::IncorrectPassword)));
        }
    }

    #[tokio::test]
    async fn test_export_private_key_wif_matches_derivation() {
        let (manager, _dir) = test_manager().await;
        let wallet = manager
            .import_wallet_from_mnemonic("w", TEST_MNEMONIC, TEST_PASSWORD, "", ltc_spec(), false)
            .await
            .unwrap();
        let auth = Auth::Password(TEST_PASSWORD.to_string());
        let address = &wallet.accounts[0].address;

        let wif = manager
            .export_private_key(&wallet.id, &auth, "LITECOIN", address, "")
            .await
            .unwrap();
        let (key, version, compressed) = crate::chains::wif_decode(&wif).unwrap();
        assert_eq!(version, 0xef);
        assert!(compressed);

        let seed = hd::mnemonic_to_seed(TEST_MNEMONIC).unwrap();
        let expected = hd::derive_secret_key(seed.as_ref(), "m/44'/1'/0'/0/0").unwrap();
        assert_eq!(&key, AsRef::<[u8]>::as_ref(&expected));

        // explicit sub-path export resolves below the account
        let wif_child = manager
            .export_private_key(&wallet.id, &auth, "LITECOIN", address, "m/44'/1'/0'/0/1")
            .await
            .unwrap();
        assert_ne!(wif, wif_child);
    }

    #[tokio::test]
    async fn test_export_eth_key_is_hex() {
        let (manager, _dir) = test_manager().await;
        let mut spec = ltc_spec();
        spec.chain_type = ChainType::Ethereum;
        spec.path = "m/44'/60'/0'/0/0".to_string();
        spec.network = String::new();
        let wallet = manager
            .import_wallet_from_mnemonic("w", TEST_MNEMONIC, TEST_PASSWORD, "", spec, false)
            .await
            .unwrap();

        let key_hex = manager
            .export_private_key(
                &wallet.id,
                &Auth::Password(TEST_PASSWORD.into()),
                "ETHEREUM",
                &wallet.accounts[0].address,
                "",
            )
            .await
            .unwrap();
        assert_eq!(key_hex.len(), 64);
        assert!(hex::decode(&key_hex).is_ok());
    }

    #[tokio::test]
    async fn test_export_eos_wif() {
        let (manager, _dir) = test_manager().await;
        let pair = crate::chains::eos::EosKeyPair::from_secret(&[0x11; 32]).unwrap();
        let mut spec = ltc_spec();
        spec.chain_type = ChainType::Eos;
        spec.path = String::new();
        let wallet = manager
            .import_wallet_from_private_key(
                "eos",
                TEST_PASSWORD,
                "",
                spec,
                "",
                &[(
                    hex::encode([0x11u8; 32]),
                    EosPermission {
                        permission: "owner".to_string(),
                        public_key: String::new(),
                    },
                )],
                false,
            )
            .await
            .unwrap();

        let wif = manager
            .export_private_key(
                &wallet.id,
                &Auth::Password(TEST_PASSWORD.into()),
                "EOS",
                &pair.public_key,
                "",
            )
            .await
            .unwrap();
        assert_eq!(crate::chains::eos::parse_private_key(&wif).unwrap(), [0x11; 32]);
    }

    #[tokio::test]
    async fn test_private_key_wallet_cannot_export_mnemonic() {
        let (manager, _dir) = test_manager().await;
        let mut spec = ltc_spec();
        spec.chain_type = ChainType::Ethereum;
        spec.path = String::new();
        let wallet = manager
            .import_wallet_from_private_key(
                "pk",
                TEST_PASSWORD,
                "",
                spec,
                &"11".repeat(32),
                &[],
                false,
            )
            .await
            .unwrap();
        let err = manager
            .export_mnemonic(&wallet.id, &Auth::Password(TEST_PASSWORD.into()))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidInput(_)));
    }
}
