//! Bitcoin-fork address encoding across networks and segwit modes.
//!
//! The `bitcoin` crate only knows Bitcoin's own prefixes, so forks carry an
//! explicit parameter set (base58 versions, bech32 hrp, WIF version) and
//! addresses/scripts are assembled from those.

use bech32::Hrp;
use bitcoin::hashes::{hash160, Hash};
use bitcoin::ScriptBuf;

use crate::chains::{base58check_decode, base58check_encode};
use crate::core::domain::{ChainType, SegWit};
use crate::core::errors::WalletError;

/// Network-specific prefixes for a bitcoin fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BtcForkNetwork {
    pub chain: ChainType,
    pub p2pkh_prefix: u8,
    pub p2sh_prefix: u8,
    pub hrp: &'static str,
    pub wif_prefix: u8,
    pub is_testnet: bool,
}

pub fn network_params(chain: ChainType, network: &str) -> Result<BtcForkNetwork, WalletError> {
    match (chain, network) {
        (ChainType::Bitcoin, "" | "MAINNET") => Ok(BtcForkNetwork {
            chain,
            p2pkh_prefix: 0x00,
            p2sh_prefix: 0x05,
            hrp: "bc",
            wif_prefix: 0x80,
            is_testnet: false,
        }),
        (ChainType::Bitcoin, "TESTNET") => Ok(BtcForkNetwork {
            chain,
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0xc4,
            hrp: "tb",
            wif_prefix: 0xef,
            is_testnet: true,
        }),
        (ChainType::Litecoin, "" | "MAINNET") => Ok(BtcForkNetwork {
            chain,
            p2pkh_prefix: 0x30,
            p2sh_prefix: 0x32,
            hrp: "ltc",
            wif_prefix: 0xb0,
            is_testnet: false,
        }),
        (ChainType::Litecoin, "TESTNET") => Ok(BtcForkNetwork {
            chain,
            p2pkh_prefix: 0x6f,
            p2sh_prefix: 0x3a,
            hrp: "tltc",
            wif_prefix: 0xef,
            is_testnet: true,
        }),
        _ => Err(WalletError::InvalidInput(format!(
            "unsupported network {} for {}",
            network, chain
        ))),
    }
}

fn hash160_of(bytes: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(bytes).to_byte_array()
}

/// p2wpkh redeem/witness script: `OP_0 <20-byte hash>`.
fn wpkh_script_bytes(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.push(0x00);
    script.push(0x14);
    script.extend_from_slice(pubkey_hash);
    script
}

/// Encode the address for a compressed public key under a segwit mode.
pub fn address_from_public_key(
    network: &BtcForkNetwork,
    seg_wit: SegWit,
    public_key: &[u8],
) -> Result<String, WalletError> {
    if public_key.len() != 33 && seg_wit != SegWit::None {
        return Err(WalletError::InvalidInput(
            "segwit addresses require a compressed public key".to_string(),
        ));
    }
    let pubkey_hash = hash160_of(public_key);
    match seg_wit {
        SegWit::None => {
            let mut payload = vec![network.p2pkh_prefix];
            payload.extend_from_slice(&pubkey_hash);
            Ok(base58check_encode(&payload))
        }
        SegWit::P2wpkh => {
            let redeem = wpkh_script_bytes(&pubkey_hash);
            let script_hash = hash160_of(&redeem);
            let mut payload = vec![network.p2sh_prefix];
            payload.extend_from_slice(&script_hash);
            Ok(base58check_encode(&payload))
        }
        SegWit::Bech32 => {
            let hrp = Hrp::parse(network.hrp)
                .map_err(|e| WalletError::CryptoError(format!("bad hrp: {:?}", e)))?;
            bech32::segwit::encode_v0(hrp, &pubkey_hash)
                .map_err(|e| WalletError::CryptoError(format!("bech32 encoding failed: {}", e)))
        }
    }
}

/// The locking script for any address of this network (p2pkh, p2sh or
/// native segwit).
pub fn script_pubkey_for_address(
    network: &BtcForkNetwork,
    address: &str,
) -> Result<ScriptBuf, WalletError> {
    if let Ok(payload) = base58check_decode(address) {
        if payload.len() != 21 {
            return Err(WalletError::InvalidInput(format!("bad address payload: {}", address)));
        }
        let version = payload[0];
        let hash = &payload[1..21];
        if version == network.p2pkh_prefix {
            let mut script = Vec::with_capacity(25);
            script.extend_from_slice(&[0x76, 0xa9, 0x14]);
            script.extend_from_slice(hash);
            script.extend_from_slice(&[0x88, 0xac]);
            return Ok(ScriptBuf::from(script));
        }
        if version == network.p2sh_prefix {
            let mut script = Vec::with_capacity(23);
            script.extend_from_slice(&[0xa9, 0x14]);
            script.extend_from_slice(hash);
            script.push(0x87);
            return Ok(ScriptBuf::from(script));
        }
        return Err(WalletError::InvalidInput(format!(
            "address version 0x{:02x} does not belong to this network",
            version
        )));
    }

    let (hrp, _version, program) = bech32::segwit::decode(address)
        .map_err(|_| WalletError::InvalidInput(format!("address_invalid: {}", address)))?;
    if hrp.as_str() != network.hrp {
        return Err(WalletError::InvalidInput(format!(
            "bech32 hrp {} does not belong to this network",
            hrp
        )));
    }
    if program.len() != 20 && program.len() != 32 {
        return Err(WalletError::InvalidInput("bad witness program length".to_string()));
    }
    let mut script = Vec::with_capacity(program.len() + 2);
    script.push(0x00);
    script.push(program.len() as u8);
    script.extend_from_slice(&program);
    Ok(ScriptBuf::from(script))
}

pub fn is_valid_address(network: &BtcForkNetwork, address: &str) -> bool {
    script_pubkey_for_address(network, address).is_ok()
}

/// The BIP143 wpkh script (and nested-segwit redeem script) for a key.
pub fn wpkh_script_for_public_key(public_key: &[u8]) -> ScriptBuf {
    ScriptBuf::from(wpkh_script_bytes(&hash160_of(public_key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::hd;

    const TEST_MNEMONIC: &str =
        "inject kidney empty canal shadow pact comfort wife crush horse wife sketch";
    const ABANDON_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn pubkey_at(mnemonic: &str, path: &str) -> Vec<u8> {
        let seed = hd::mnemonic_to_seed(mnemonic).unwrap();
        hd::derive_public_key(seed.as_ref(), path).unwrap()
    }

    #[test]
    fn test_btc_mainnet_p2pkh_reference_vector() {
        // BIP44 reference vector for the all-abandon mnemonic
        let network = network_params(ChainType::Bitcoin, "MAINNET").unwrap();
        let pubkey = pubkey_at(ABANDON_MNEMONIC, "m/44'/0'/0'/0/0");
        let address = address_from_public_key(&network, SegWit::None, &pubkey).unwrap();
        assert_eq!(address, "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
    }

    #[test]
    fn test_btc_mainnet_p2sh_segwit_reference_vector() {
        // BIP49 reference vector for the all-abandon mnemonic
        let network = network_params(ChainType::Bitcoin, "MAINNET").unwrap();
        let pubkey = pubkey_at(ABANDON_MNEMONIC, "m/49'/0'/0'/0/0");
        let address = address_from_public_key(&network, SegWit::P2wpkh, &pubkey).unwrap();
        assert_eq!(address, "37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf");
    }

    #[test]
    fn test_btc_mainnet_bech32_reference_vector() {
        // BIP84 reference vector for the all-abandon mnemonic
        let network = network_params(ChainType::Bitcoin, "MAINNET").unwrap();
        let pubkey = pubkey_at(ABANDON_MNEMONIC, "m/84'/0'/0'/0/0");
        let address = address_from_public_key(&network, SegWit::Bech32, &pubkey).unwrap();
        assert_eq!(address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
    }

    #[test]
    fn test_btc_bech32_second_vector() {
        let network = network_params(ChainType::Bitcoin, "MAINNET").unwrap();
        let pubkey = pubkey_at(TEST_MNEMONIC, "m/84'/0'/0'/0/0");
        let address = address_from_public_key(&network, SegWit::Bech32, &pubkey).unwrap();
        assert_eq!(address, "bc1q05ec6z8df2vlzkxjxfd2xr3veypzm93wqnazr2");
    }

    #[test]
    fn test_ltc_testnet_p2sh_segwit_vector() {
        let network = network_params(ChainType::Litecoin, "TESTNET").unwrap();
        let pubkey = pubkey_at(TEST_MNEMONIC, "m/44'/2'/0'/0/0");
        let address = address_from_public_key(&network, SegWit::P2wpkh, &pubkey).unwrap();
        assert_eq!(address, "QLfctE6KMv3ZzQod6UA37w3EPTuLS4tg1T");
    }

    #[test]
    fn test_ltc_testnet_p2pkh_vector() {
        // same prefix as bitcoin testnet; address comes from the ltc test path
        let network = network_params(ChainType::Litecoin, "TESTNET").unwrap();
        let pubkey = pubkey_at(TEST_MNEMONIC, "m/44'/1'/0'/0/0");
        let address = address_from_public_key(&network, SegWit::None, &pubkey).unwrap();
        assert_eq!(address, "mkeNU5nVnozJiaACDELLCsVUc8Wxoh1rQN");
    }

    #[test]
    fn test_script_pubkey_round_trip() {
        let network = network_params(ChainType::Bitcoin, "MAINNET").unwrap();
        for seg_wit in [SegWit::None, SegWit::P2wpkh, SegWit::Bech32] {
            let pubkey = pubkey_at(ABANDON_MNEMONIC, "m/84'/0'/0'/0/0");
            let address = address_from_public_key(&network, seg_wit, &pubkey).unwrap();
            let script = script_pubkey_for_address(&network, &address).unwrap();
            assert!(!script.is_empty());
        }
    }

    #[test]
    fn test_foreign_address_rejected() {
        let mainnet = network_params(ChainType::Bitcoin, "MAINNET").unwrap();
        // testnet p2pkh address on mainnet params
        assert!(!is_valid_address(&mainnet, "mkeNU5nVnozJiaACDELLCsVUc8Wxoh1rQN"));
        // garbage
        assert!(!is_valid_address(&mainnet, "definitely-not-an-address"));
        // wrong-hrp bech32
        assert!(!is_valid_address(&mainnet, "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));
    }

    #[test]
    fn test_unknown_network_rejected() {
        assert!(network_params(ChainType::Bitcoin, "SIGNET").is_err());
        assert!(network_params(ChainType::Ethereum, "MAINNET").is_err());
    }
}
