//! Method dispatch for the bridge: decode the envelope, route on the method
//! name, fold every failure into a `Response` — nothing panics across this
//! boundary.

use prost::Message;
use tracing::debug;

use crate::api::*;
use crate::core::domain::{ChainType, DerivationSpec, SegWit};
use crate::core::errors::WalletError;
use crate::core::wallet_manager::lifecycle::EosPermission;
use crate::core::wallet_manager::signing::{SignTxInput, SignTxOutput};
use crate::core::wallet_manager::{
    AccountSnapshot, Auth, WalletManager, WalletSnapshot,
};

fn account_response(snapshot: &AccountSnapshot) -> AccountResponse {
    AccountResponse {
        chain_type: snapshot.chain_type.clone(),
        address: snapshot.address.clone(),
        path: snapshot.path.clone(),
        extended_xpub_key: snapshot.extended_xpub_key.clone(),
        external_address: snapshot.external_address.as_ref().map(|ext| ExternalAddress {
            address: ext.address.clone(),
            derived_path: ext.derived_path.clone(),
            r#type: ext.kind.clone(),
        }),
    }
}

fn wallet_result(snapshot: &WalletSnapshot) -> WalletResult {
    WalletResult {
        id: snapshot.id.clone(),
        name: snapshot.name.clone(),
        source: snapshot.source.clone(),
        accounts: snapshot.accounts.iter().map(account_response).collect(),
        created_at: snapshot.created_at,
    }
}

fn exists_result(id: Option<String>) -> ExistsResult {
    ExistsResult {
        exists: id.is_some(),
        id: id.unwrap_or_default(),
    }
}

fn derivation_spec(param: &DerivationSpecParam) -> Result<DerivationSpec, WalletError> {
    Ok(DerivationSpec {
        chain_type: ChainType::from_tag(&param.chain_type)?,
        path: param.path.clone(),
        network: param.network.clone(),
        seg_wit: SegWit::from_tag(&param.seg_wit)?,
        chain_id: param.chain_id.clone(),
    })
}

fn sign_auth(param: &SignParam) -> Result<Auth, WalletError> {
    match &param.key {
        Some(sign_param::Key::Password(password)) => Ok(Auth::Password(password.clone())),
        Some(sign_param::Key::DerivedKey(derived_key)) => {
            Ok(Auth::DerivedKey(derived_key.clone()))
        }
        None => Err(WalletError::InvalidInput("missing password or derived key".to_string())),
    }
}

fn sign_input(param: &SignParam) -> Result<SignTxInput, WalletError> {
    let input = param
        .input
        .as_ref()
        .ok_or_else(|| WalletError::InvalidInput("missing transaction input".to_string()))?;
    let bytes = input.value.as_slice();
    match ChainType::from_tag(&param.chain_type)? {
        ChainType::Bitcoin | ChainType::Litecoin => {
            Ok(SignTxInput::BtcFork(decode_param(bytes)?))
        }
        ChainType::Ethereum => Ok(SignTxInput::Ethereum(decode_param(bytes)?)),
        ChainType::Tron => Ok(SignTxInput::Tron(decode_param(bytes)?)),
        ChainType::Eos => Ok(SignTxInput::Eos(decode_param(bytes)?)),
        ChainType::Nervos => Ok(SignTxInput::Ckb(decode_param(bytes)?)),
    }
}

fn encode_sign_output(output: SignTxOutput) -> Vec<u8> {
    match output {
        SignTxOutput::BtcFork(out) => encode_message(out),
        SignTxOutput::Ethereum(out) => encode_message(out),
        SignTxOutput::Tron(out) => encode_message(out),
        SignTxOutput::Eos(out) => encode_message(out),
        SignTxOutput::Ckb(out) => encode_message(out),
    }
}

async fn route(manager: &WalletManager, action: &KeyAction) -> Result<Vec<u8>, WalletError> {
    let param_bytes = action
        .param
        .as_ref()
        .map(|any| any.value.as_slice())
        .unwrap_or_default();

    match action.method.as_str() {
        "generate_mnemonic" => Ok(encode_message(MnemonicResult {
            mnemonic: manager.generate_mnemonic(),
        })),

        "hd_store_create" => {
            let param: HdStoreCreateParam = decode_param(param_bytes)?;
            let snapshot = manager
                .create_hd_wallet(&param.name, &param.password, &param.password_hint)
                .await?;
            Ok(encode_message(wallet_result(&snapshot)))
        }

        "import_wallet_from_mnemonic" => {
            let param: ImportMnemonicParam = decode_param(param_bytes)?;
            let initial = DerivationSpec {
                chain_type: ChainType::from_tag(&param.chain_type)?,
                path: param.path.clone(),
                network: param.network.clone(),
                seg_wit: SegWit::from_tag(&param.seg_wit)?,
                chain_id: String::new(),
            };
            let snapshot = manager
                .import_wallet_from_mnemonic(
                    &param.name,
                    &param.mnemonic,
                    &param.password,
                    &param.password_hint,
                    initial,
                    param.overwrite,
                )
                .await?;
            Ok(encode_message(wallet_result(&snapshot)))
        }

        "import_wallet_from_keystore" => {
            let param: KeystoreImportParam = decode_param(param_bytes)?;
            let snapshot = manager
                .import_wallet_from_keystore(&param.keystore, &param.password, param.overwrite)
                .await?;
            Ok(encode_message(wallet_result(&snapshot)))
        }

        "import_wallet_from_private_key" => {
            let param: PrivateKeyImportParam = decode_param(param_bytes)?;
            let initial = DerivationSpec {
                chain_type: ChainType::from_tag(&param.chain_type)?,
                path: String::new(),
                network: param.network.clone(),
                seg_wit: SegWit::from_tag(&param.seg_wit)?,
                chain_id: String::new(),
            };
            let eos_keys: Vec<(String, EosPermission)> = param
                .private_keys
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    let permission = param.permissions.get(i).cloned().unwrap_or_default();
                    (
                        key.clone(),
                        EosPermission {
                            permission: permission.permission,
                            public_key: permission.public_key,
                        },
                    )
                })
                .collect();
            let snapshot = manager
                .import_wallet_from_private_key(
                    &param.name,
                    &param.password,
                    &param.password_hint,
                    initial,
                    &param.private_key,
                    &eos_keys,
                    param.overwrite,
                )
                .await?;
            Ok(encode_message(wallet_result(&snapshot)))
        }

        "exists_mnemonic" => {
            let param: ExistsMnemonicParam = decode_param(param_bytes)?;
            let id = manager.exists_mnemonic(&param.mnemonic).await?;
            Ok(encode_message(exists_result(id)))
        }

        "exists_private_key" => {
            let param: ExistsPrivateKeyParam = decode_param(param_bytes)?;
            let id = manager.exists_private_key(&param.private_key).await?;
            Ok(encode_message(exists_result(id)))
        }

        "exists_keystore" => {
            let param: ExistsKeystoreParam = decode_param(param_bytes)?;
            let id = manager.exists_keystore(&param.keystore, &param.password).await?;
            Ok(encode_message(exists_result(id)))
        }

        "export_mnemonic" => {
            let param: WalletKeyParam = decode_param(param_bytes)?;
            let export = manager
                .export_mnemonic(&param.id, &Auth::Password(param.password))
                .await?;
            Ok(encode_message(ExportMnemonicResult {
                mnemonic: export.mnemonic,
                path: export.path,
                address: export.address,
            }))
        }

        "export_private_key" => {
            let param: ExportPrivateKeyParam = decode_param(param_bytes)?;
            let private_key = manager
                .export_private_key(
                    &param.id,
                    &Auth::Password(param.password.clone()),
                    &param.chain_type,
                    &param.main_address,
                    &param.path,
                )
                .await?;
            Ok(encode_message(ExportPrivateKeyResult { private_key }))
        }

        "export_keystore" => {
            let param: WalletKeyParam = decode_param(param_bytes)?;
            let json = manager
                .export_keystore(&param.id, &Auth::Password(param.password))
                .await?;
            Ok(encode_message(ExportKeystoreResult { json }))
        }

        "derive_accounts" => {
            let param: DeriveParam = decode_param(param_bytes)?;
            let specs: Vec<DerivationSpec> = param
                .derivations
                .iter()
                .map(derivation_spec)
                .collect::<Result<_, _>>()?;
            let accounts = manager
                .derive_accounts(&param.id, &Auth::Password(param.password), &specs)
                .await?;
            Ok(encode_message(AccountsResponse {
                accounts: accounts.iter().map(account_response).collect(),
            }))
        }

        "list_accounts" => {
            let param: WalletKeyParam = decode_param(param_bytes)?;
            let accounts = manager.list_accounts(&param.id).await?;
            Ok(encode_message(AccountsResponse {
                accounts: accounts.iter().map(account_response).collect(),
            }))
        }

        "calc_external_address" => {
            let param: ExternalAddressParam = decode_param(param_bytes)?;
            let external = manager
                .calc_external_address(&param.id, &param.chain_type, param.external_idx)
                .await?;
            Ok(encode_message(ExternalAddress {
                address: external.address,
                derived_path: external.derived_path,
                r#type: external.kind,
            }))
        }

        "get_extended_public_key" => {
            let param: XpubParam = decode_param(param_bytes)?;
            let xpub = manager
                .extended_public_key(
                    &param.id,
                    &Auth::Password(param.password.clone()),
                    &param.chain_type,
                    &param.address,
                )
                .await?;
            Ok(encode_message(XpubResult { xpub }))
        }

        "remove_wallet" => {
            let param: WalletKeyParam = decode_param(param_bytes)?;
            let id = manager
                .remove_wallet(&param.id, &Auth::Password(param.password))
                .await?;
            Ok(encode_message(RemoveWalletResult { id }))
        }

        "verify_password" => {
            let param: WalletKeyParam = decode_param(param_bytes)?;
            let id = manager
                .verify_password(&param.id, &Auth::Password(param.password))
                .await?;
            Ok(encode_message(VerifyPasswordResult { id }))
        }

        "get_derived_key" => {
            let param: WalletKeyParam = decode_param(param_bytes)?;
            let derived_key = manager.get_derived_key(&param.id, &param.password).await?;
            Ok(encode_message(DerivedKeyResult {
                id: param.id,
                derived_key,
            }))
        }

        "cache_derived_key" => {
            let param: CacheDerivedKeyParam = decode_param(param_bytes)?;
            manager
                .cache_derived_key(&param.id, &param.derived_key, &param.temp_password)
                .await?;
            Ok(encode_message(DerivedKeyResult {
                id: param.id,
                derived_key: param.derived_key,
            }))
        }

        "verify_derived_key" => {
            let param: VerifyDerivedKeyParam = decode_param(param_bytes)?;
            manager.verify_derived_key(&param.id, &param.derived_key).await?;
            Ok(encode_message(DerivedKeyResult {
                id: param.id,
                derived_key: param.derived_key,
            }))
        }

        "clear_derived_keys" => {
            let param: ClearDerivedKeysParam = decode_param(param_bytes)?;
            let id = if param.id.is_empty() { None } else { Some(param.id.as_str()) };
            manager.clear_derived_keys(id).await;
            Ok(encode_message(Response {
                is_success: true,
                error: String::new(),
            }))
        }

        "sign_tx" => {
            let param: SignParam = decode_param(param_bytes)?;
            let auth = sign_auth(&param)?;
            let input = sign_input(&param)?;
            let output = manager
                .sign_transaction(&param.id, &auth, &param.chain_type, &param.address, input)
                .await?;
            Ok(encode_sign_output(output))
        }

        "personal_sign" => {
            let param: SignParam = decode_param(param_bytes)?;
            let auth = sign_auth(&param)?;
            let input: EthMessageInput = decode_param(
                param
                    .input
                    .as_ref()
                    .ok_or_else(|| WalletError::InvalidInput("missing message input".to_string()))?
                    .value
                    .as_slice(),
            )?;
            let output = manager
                .personal_sign(&param.id, &auth, &param.address, &input)
                .await?;
            Ok(encode_message(output))
        }

        "tron_sign_message" => {
            let param: SignParam = decode_param(param_bytes)?;
            let auth = sign_auth(&param)?;
            let input: TronMessageInput = decode_param(
                param
                    .input
                    .as_ref()
                    .ok_or_else(|| WalletError::InvalidInput("missing message input".to_string()))?
                    .value
                    .as_slice(),
            )?;
            let output = manager
                .tron_sign_message(&param.id, &auth, &param.address, &input)
                .await?;
            Ok(encode_message(output))
        }

        "eos_ec_sign" => {
            let param: SignParam = decode_param(param_bytes)?;
            let auth = sign_auth(&param)?;
            let input: EosMessageInput = decode_param(
                param
                    .input
                    .as_ref()
                    .ok_or_else(|| WalletError::InvalidInput("missing message input".to_string()))?
                    .value
                    .as_slice(),
            )?;
            let output = manager
                .eos_ec_sign(&param.id, &auth, &param.address, &input)
                .await?;
            Ok(encode_message(output))
        }

        other => Err(WalletError::InvalidInput(format!("unsupported_method: {}", other))),
    }
}

/// Bridge entry point: one serialized `KeyAction` in, one serialized result
/// (or `Response { is_success: false }`) out.
pub async fn dispatch(manager: &WalletManager, data: &[u8]) -> Vec<u8> {
    let action = match KeyAction::decode(data) {
        Ok(action) => action,
        Err(e) => {
            return encode_message(Response {
                is_success: false,
                error: format!("serialization_error: {}", e),
            })
        }
    };
    debug!("dispatching bridge method {}", action.method);

    match route(manager, &action).await {
        Ok(bytes) => bytes,
        Err(err) => encode_message(Response {
            is_success: false,
            error: err.to_string(),
        }),
    }
}
