use std::fmt;

/// Custom error type for wallet engine operations.
#[derive(Debug)]
pub enum WalletError {
    /// Mnemonic failed BIP39 wordlist/checksum validation.
    InvalidMnemonic(String),
    /// Keystore JSON could not be parsed or has an unknown version.
    InvalidKeystoreFormat(String),
    /// Derivation path is malformed.
    InvalidDerivationPath(String),
    /// Chain tag not recognized.
    UnsupportedChainType(String),
    /// Same key material already imported and overwrite was not requested.
    WalletAlreadyExists(String),
    /// No wallet with the requested id.
    WalletNotFound(String),
    /// No derived account matching (chain, address).
    AccountNotFound(String),
    /// Password (or cached derived key) did not authenticate.
    IncorrectPassword,
    /// Selected inputs do not cover outputs + fee.
    InsufficientFunds(String),
    /// No held private key matches a required public key (EOS).
    MissingRequiredKey(String),
    /// Chain-specific transaction input failed validation.
    MalformedTransactionInput(String),
    /// Keystore file I/O errors.
    StorageError(String),
    /// Encryption/decryption/signing primitive errors.
    CryptoError(String),
    /// Serialization/deserialization errors.
    SerializationError(String),
    /// Request-level validation errors.
    InvalidInput(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::InvalidMnemonic(msg) => write!(f, "invalid_mnemonic: {}", msg),
            WalletError::InvalidKeystoreFormat(msg) => write!(f, "invalid_keystore: {}", msg),
            WalletError::InvalidDerivationPath(msg) => write!(f, "invalid_derivation_path: {}", msg),
            WalletError::UnsupportedChainType(msg) => write!(f, "unsupported_chain_type: {}", msg),
            WalletError::WalletAlreadyExists(id) => write!(f, "wallet_already_exists: {}", id),
            WalletError::WalletNotFound(id) => write!(f, "wallet_not_found: {}", id),
            WalletError::AccountNotFound(msg) => write!(f, "account_not_found: {}", msg),
            WalletError::IncorrectPassword => write!(f, "password_incorrect"),
            WalletError::InsufficientFunds(msg) => write!(f, "insufficient_funds: {}", msg),
            WalletError::MissingRequiredKey(msg) => write!(f, "missing_required_key: {}", msg),
            WalletError::MalformedTransactionInput(msg) => {
                write!(f, "malformed_tx_input: {}", msg)
            }
            WalletError::StorageError(msg) => write!(f, "storage_error: {}", msg),
            WalletError::CryptoError(msg) => write!(f, "crypto_error: {}", msg),
            WalletError::SerializationError(msg) => write!(f, "serialization_error: {}", msg),
            WalletError::InvalidInput(msg) => write!(f, "invalid_input: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

impl WalletError {
    /// Stable snake_case code reported across the bridge boundary.
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::InvalidMnemonic(_) => "invalid_mnemonic",
            WalletError::InvalidKeystoreFormat(_) => "invalid_keystore",
            WalletError::InvalidDerivationPath(_) => "invalid_derivation_path",
            WalletError::UnsupportedChainType(_) => "unsupported_chain_type",
            WalletError::WalletAlreadyExists(_) => "wallet_already_exists",
            WalletError::WalletNotFound(_) => "wallet_not_found",
            WalletError::AccountNotFound(_) => "account_not_found",
            WalletError::IncorrectPassword => "password_incorrect",
            WalletError::InsufficientFunds(_) => "insufficient_funds",
            WalletError::MissingRequiredKey(_) => "missing_required_key",
            WalletError::MalformedTransactionInput(_) => "malformed_tx_input",
            WalletError::StorageError(_) => "storage_error",
            WalletError::CryptoError(_) => "crypto_error",
            WalletError::SerializationError(_) => "serialization_error",
            WalletError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::SerializationError(err.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        WalletError::InvalidInput(format!("invalid hex: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_password_incorrect() {
        let err = WalletError::IncorrectPassword;
        assert_eq!(format!("{}", err), "password_incorrect");
        assert_eq!(err.code(), "password_incorrect");
    }

    #[test]
    fn test_display_wallet_not_found() {
        let err = WalletError::WalletNotFound("abc".to_string());
        assert_eq!(format!("{}", err), "wallet_not_found: abc");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: WalletError = io_err.into();
        assert!(matches!(err, WalletError::StorageError(_)));
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: WalletError = serde_err.into();
        assert_eq!(err.code(), "serialization_error");
    }
}
