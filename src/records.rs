/// Wallet credential records, as read from the storage backends.
///
/// One sum type over the four record shapes; readers extract their family's
/// addresses from each variant by pattern matching. Records are read-only to
/// this tool and live only within a single client's processing iteration.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assets::Blockchain;

#[derive(Debug, Clone)]
pub enum WalletCredentialRecord {
    PrivateWallet(PrivateWallet),
    LegacyCredentials(LegacyWalletCredentials),
    BcnCredentials(BcnCredentialsRecord),
    DepositWallet(RegisteredDepositWallet),
}

/// A stored private wallet row.
#[derive(Debug, Clone)]
pub struct PrivateWallet {
    pub client_id: String,
    pub address: String,
    pub blockchain: Blockchain,
    pub wallet_name: Option<String>,
    pub encoded_private_key: Option<String>,
    pub is_cold_storage: Option<bool>,
    pub number: Option<i64>,
}

/// The legacy wallet-credentials singleton record for a client. Address
/// fields are sparse; the per-asset contract columns are carried for record
/// fidelity even though only the readers' own fields feed extraction.
#[derive(Debug, Clone, Default)]
pub struct LegacyWalletCredentials {
    pub client_id: String,
    pub address: Option<String>,
    pub multi_sig: Option<String>,
    pub colored_multi_sig: Option<String>,
    pub eth_address: Option<String>,
    pub btc_conversion_address: Option<String>,
    pub solar_coin_address: Option<String>,
    pub chrono_bank_contract: Option<String>,
    pub quanta_contract: Option<String>,
}

/// A bcn-credentials row: one address pair per (client, asset).
#[derive(Debug, Clone)]
pub struct BcnCredentialsRecord {
    pub client_id: String,
    pub asset_id: String,
    pub address: Option<String>,
    pub asset_address: Option<String>,
    pub encoded_key: Option<String>,
}

/// A deposit wallet registered in the external blockchain wallet registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredDepositWallet {
    pub client_id: Uuid,
    /// Integration-layer chain id, e.g. "bitcoin" or "ethereum".
    pub blockchain_id: String,
    pub address: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl LegacyWalletCredentials {
    /// The implicit default private wallet the legacy record represents:
    /// its base address is a Bitcoin private wallet predating the
    /// private-wallets table.
    pub fn to_default_private_wallet(&self) -> Option<PrivateWallet> {
        let address = self.address.clone()?;
        Some(PrivateWallet {
            client_id: self.client_id.clone(),
            address,
            blockchain: Blockchain::Bitcoin,
            wallet_name: Some("default".to_string()),
            encoded_private_key: None,
            is_cold_storage: None,
            number: None,
        })
    }
}
