//! End-to-end wallet lifecycle scenarios against a real keystore directory.

use chain_keyring::core::domain::{ChainType, DerivationSpec, SegWit};
use chain_keyring::core::wallet_manager::signing::{SignTxInput, SignTxOutput};
use chain_keyring::{Auth, EngineConfig, KdfPreset, WalletError, WalletManager};

const PASSWORD: &str = "Insecure#1";
const TEST_MNEMONIC: &str =
    "inject kidney empty canal shadow pact comfort wife crush horse wife sketch";

fn test_config(dir: &tempfile::TempDir) -> EngineConfig {
    let mut config = EngineConfig::new(dir.path().to_str().unwrap());
    config.kdf = KdfPreset::FastInsecure;
    config
}

fn eth_spec() -> DerivationSpec {
    DerivationSpec {
        chain_type: ChainType::Ethereum,
        path: "m/44'/60'/0'/0/0".to_string(),
        network: String::new(),
        seg_wit: SegWit::None,
        chain_id: "1".to_string(),
    }
}

#[tokio::test]
async fn generate_import_derive_sign_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let manager = WalletManager::new(&test_config(&dir)).await.unwrap();

    // generate a fresh mnemonic and import it
    let mnemonic = manager.generate_mnemonic();
    let wallet = manager
        .import_wallet_from_mnemonic("scenario", &mnemonic, PASSWORD, "", eth_spec(), false)
        .await
        .unwrap();
    assert_eq!(wallet.accounts.len(), 1);
    let address = wallet.accounts[0].address.clone();
    assert!(address.starts_with("0x"));

    // sign the reference transfer
    let output = manager
        .sign_transaction(
            &wallet.id,
            &Auth::Password(PASSWORD.to_string()),
            "ETHEREUM",
            &address,
            SignTxInput::Ethereum(chain_keyring::api::EthTxInput {
                nonce: "0".to_string(),
                to: "0x132D1eA7EF895b6834D25911656f434d7167093C".to_string(),
                value: "1000000000000000000".to_string(),
                gas_price: "20000000000".to_string(),
                gas_limit: "21000".to_string(),
                data: String::new(),
                chain_id: "1".to_string(),
            }),
        )
        .await
        .unwrap();
    let signed = match output {
        SignTxOutput::Ethereum(out) => out,
        _ => panic!("expected an ethereum output"),
    };

    // the recovered sender must be the derived account
    use ethers::types::Transaction;
    use ethers::utils::rlp::{Decodable, Rlp};
    let raw = hex::decode(&signed.signature).unwrap();
    let tx = Transaction::decode(&Rlp::new(&raw)).unwrap();
    let from = tx.recover_from().unwrap();
    assert_eq!(format!("{:?}", from), address.to_lowercase());
}

#[tokio::test]
async fn restore_from_disk_reproduces_accounts() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let (id, address) = {
        let manager = WalletManager::new(&config).await.unwrap();
        let wallet = manager
            .import_wallet_from_mnemonic("persist", TEST_MNEMONIC, PASSWORD, "", eth_spec(), false)
            .await
            .unwrap();
        (wallet.id, wallet.accounts[0].address.clone())
    };

    // a fresh manager over the same directory sees the same wallet
    let manager = WalletManager::new(&config).await.unwrap();
    let accounts = manager.list_accounts(&id).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].address, address);

    // and the same mnemonic still reports as already imported
    assert_eq!(manager.exists_mnemonic(TEST_MNEMONIC).await.unwrap(), Some(id.clone()));

    // mnemonic survives the round trip byte for byte
    let export = manager
        .export_mnemonic(&id, &Auth::Password(PASSWORD.to_string()))
        .await
        .unwrap();
    assert_eq!(export.mnemonic, TEST_MNEMONIC);
}

#[tokio::test]
async fn derived_key_cache_does_not_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let (id, derived_key) = {
        let manager = WalletManager::new(&config).await.unwrap();
        let wallet = manager
            .import_wallet_from_mnemonic("cache", TEST_MNEMONIC, PASSWORD, "", eth_spec(), false)
            .await
            .unwrap();
        let derived_key = manager.get_derived_key(&wallet.id, PASSWORD).await.unwrap();
        manager
            .cache_derived_key(&wallet.id, &derived_key, "temp-pass")
            .await
            .unwrap();
        // temp password works while the process lives
        manager
            .verify_password(&wallet.id, &Auth::Password("temp-pass".to_string()))
            .await
            .unwrap();
        (wallet.id, derived_key)
    };

    let manager = WalletManager::new(&config).await.unwrap();
    // nothing was persisted: the temp password is gone...
    assert!(matches!(
        manager
            .verify_password(&id, &Auth::Password("temp-pass".to_string()))
            .await,
        Err(WalletError::IncorrectPassword)
    ));
    // ...but the derived key itself still verifies against the record
    manager.verify_derived_key(&id, &derived_key).await.unwrap();
}

#[tokio::test]
async fn password_failures_leave_no_observable_change() {
    let dir = tempfile::tempdir().unwrap();
    let manager = WalletManager::new(&test_config(&dir)).await.unwrap();
    let wallet = manager
        .import_wallet_from_mnemonic("gate", TEST_MNEMONIC, PASSWORD, "", eth_spec(), false)
        .await
        .unwrap();
    let bad = Auth::Password("Wrong Password".to_string());

    assert!(matches!(
        manager.export_mnemonic(&wallet.id, &bad).await,
        Err(WalletError::IncorrectPassword)
    ));
    assert!(matches!(
        manager.remove_wallet(&wallet.id, &bad).await,
        Err(WalletError::IncorrectPassword)
    ));
    assert!(matches!(
        manager.derive_accounts(&wallet.id, &bad, &[eth_spec()]).await,
        Err(WalletError::IncorrectPassword)
    ));

    // wallet is intact and still answers with the right password
    assert_eq!(manager.list_accounts(&wallet.id).await.unwrap().len(), 1);
    manager
        .verify_password(&wallet.id, &Auth::Password(PASSWORD.to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn parallel_operations_on_distinct_wallets() {
    let dir = tempfile::tempdir().unwrap();
    let manager = std::sync::Arc::new(WalletManager::new(&test_config(&dir)).await.unwrap());

    let mut handles = vec![];
    for i in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let wallet = manager
                .create_hd_wallet(&format!("wallet-{}", i), PASSWORD, "")
                .await
                .unwrap();
            let accounts = manager
                .derive_accounts(
                    &wallet.id,
                    &Auth::Password(PASSWORD.to_string()),
                    &[DerivationSpec {
                        chain_type: ChainType::Ethereum,
                        path: "m/44'/60'/0'/0/0".to_string(),
                        network: String::new(),
                        seg_wit: SegWit::None,
                        chain_id: "1".to_string(),
                    }],
                )
                .await
                .unwrap();
            (wallet.id, accounts[0].address.clone())
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let (id, address) = handle.await.unwrap();
        assert!(address.starts_with("0x"));
        ids.insert(id);
    }
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn bitcoin_conservation_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let manager = WalletManager::new(&test_config(&dir)).await.unwrap();
    let wallet = manager
        .import_wallet_from_mnemonic(
            "btc",
            TEST_MNEMONIC,
            PASSWORD,
            "",
            DerivationSpec {
                chain_type: ChainType::Bitcoin,
                path: "m/84'/0'/0'/0/0".to_string(),
                network: "MAINNET".to_string(),
                seg_wit: SegWit::Bech32,
                chain_id: String::new(),
            },
            false,
        )
        .await
        .unwrap();
    let address = wallet.accounts[0].address.clone();
    assert_eq!(address, "bc1q05ec6z8df2vlzkxjxfd2xr3veypzm93wqnazr2");

    let unspent = chain_keyring::api::Utxo {
        tx_hash: "a477af6b2667c29670467e4e0728b685ee07b240235771862318e29ddbe58458".to_string(),
        vout: 0,
        amount: 1_000_000,
        address: address.clone(),
        script_pub_key: String::new(),
        derived_path: "0/0".to_string(),
        sequence: 0,
    };
    let tx = chain_keyring::api::BtcForkTxInput {
        to: address.clone(),
        amount: 600_000,
        unspents: vec![unspent],
        fee: 10_000,
        change_address_index: 0,
        change_address: String::new(),
        network: "MAINNET".to_string(),
        seg_wit: "BECH32".to_string(),
    };

    let output = manager
        .sign_transaction(
            &wallet.id,
            &Auth::Password(PASSWORD.to_string()),
            "BITCOIN",
            &address,
            SignTxInput::BtcFork(tx),
        )
        .await
        .unwrap();
    let signed = match output {
        SignTxOutput::BtcFork(out) => out,
        _ => panic!("expected a btc output"),
    };

    // conservation: outputs + fee == inputs, change credited on-chain
    let raw = hex::decode(&signed.signature).unwrap();
    let tx: bitcoin::Transaction = bitcoin::consensus::encode::deserialize(&raw).unwrap();
    let total_out: u64 = tx.output.iter().map(|o| o.value.to_sat()).sum();
    assert_eq!(total_out, 1_000_000 - 10_000);
    assert_eq!(tx.output[0].value.to_sat(), 600_000);
    assert_eq!(tx.output[1].value.to_sat(), 390_000);
}
