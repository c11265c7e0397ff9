use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::ConfigError;

/// Tool settings, loaded once at startup from a JSON file and immutable for
/// the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    pub asset_service_url: String,
    #[serde(default)]
    pub client_account_url: Option<String>,
    #[serde(default)]
    pub blockchain_wallets_url: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    pub wallet_type: WalletType,
    pub db: DbConfig,
    pub result_file_path: String,
    pub error_file_path: String,
    #[serde(default)]
    pub include_zero_balances: bool,
    #[serde(default)]
    pub client_ids_file_path: Option<String>,
    #[serde(default)]
    pub bitcoin: Option<BitcoinConfig>,
    #[serde(default)]
    pub ethereum: Option<EthereumConfig>,
}

/// Which wallet population the run enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletType {
    /// Stored private wallets plus the legacy default wallet.
    Private,
    /// Bcn credential records, the legacy record and the wallet registry.
    Deposit,
    /// Wallet registry only.
    BilDeposit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbConfig {
    /// Path of the sqlite database holding the credential tables.
    #[serde(default)]
    pub client_personal_info_conn_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinConfig {
    pub network: String,
    pub ninja_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumConfig {
    pub ethereum_core_url: String,
}

impl ToolConfig {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(path.to_string()).into());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Checks every declared-required setting for the selected mode, once,
    /// before the batch loop begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.asset_service_url.is_empty() {
            return Err(ConfigError::MissingSetting("assetServiceUrl"));
        }

        if self.client_ids_file_path.is_none()
            && self.client_account_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::MissingSetting("clientAccountUrl"));
        }

        // With all assets in scope a zero-balance dump would be unbounded.
        if self.asset_id.is_none() && self.include_zero_balances {
            return Err(ConfigError::InvalidSetting {
                field: "includeZeroBalances",
                reason: "must be false when assetId is omitted".to_string(),
            });
        }

        match self.wallet_type {
            WalletType::Private | WalletType::Deposit => {
                if self
                    .db
                    .client_personal_info_conn_string
                    .as_deref()
                    .unwrap_or("")
                    .is_empty()
                {
                    return Err(ConfigError::MissingSetting("db.clientPersonalInfoConnString"));
                }
            }
            WalletType::BilDeposit => {}
        }

        if matches!(self.wallet_type, WalletType::Deposit | WalletType::BilDeposit)
            && self.blockchain_wallets_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::MissingSetting("blockchainWalletsUrl"));
        }

        if self.bitcoin.is_none() && self.ethereum.is_none() {
            return Err(ConfigError::MissingSetting("bitcoin or ethereum"));
        }

        if self.result_file_path.is_empty() {
            return Err(ConfigError::MissingSetting("resultFilePath"));
        }

        if self.error_file_path.is_empty() {
            return Err(ConfigError::MissingSetting("errorFilePath"));
        }

        Ok(())
    }
}
