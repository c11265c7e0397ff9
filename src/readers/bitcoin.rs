/// Bitcoin-family balance reader backed by a Ninja-style indexer.
///
/// Observes native BTC plus Open Assets colored coins. Colored address
/// encodings are normalized to their underlying plain address before
/// querying, so a colored and a plain spelling of one wallet cost a single
/// indexer call.
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::assets::{convert_from_chain_units, Asset};
use crate::assets::Blockchain;
use crate::classifier::{BitcoinClassifier, BitcoinNetwork};
use crate::config::BitcoinConfig;
use crate::errors::{ConfigError, ReadError};
use crate::records::WalletCredentialRecord;

use super::{BalanceReader, BalanceResult};

/// Native bitcoin scaling: satoshis carry 8 digits of sub-unit precision.
const BTC_ASSET_ID: &str = "BTC";
const BTC_DECIMALS: u32 = 8;

#[derive(Debug, Deserialize)]
struct BalanceSummary {
    spendable: SpendableBalance,
}

#[derive(Debug, Deserialize)]
struct SpendableBalance {
    /// Satoshis.
    amount: i64,
    #[serde(default)]
    assets: Vec<ColoredBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColoredBalance {
    asset_id: String,
    quantity: i64,
}

pub struct BitcoinBalanceReader {
    http: reqwest::Client,
    base_url: String,
    classifier: BitcoinClassifier,
    related_assets: OnceCell<Vec<Asset>>,
}

impl BitcoinBalanceReader {
    pub fn new(config: &BitcoinConfig) -> Result<Self, ConfigError> {
        let network =
            BitcoinNetwork::parse(&config.network).ok_or(ConfigError::InvalidSetting {
                field: "bitcoin.network",
                reason: format!("unknown network '{}'", config.network),
            })?;

        if config.ninja_url.is_empty() {
            return Err(ConfigError::MissingSetting("bitcoin.ninjaUrl"));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.ninja_url.trim_end_matches('/').to_string(),
            classifier: BitcoinClassifier::new(network),
            related_assets: OnceCell::new(),
        })
    }

    fn push_if_valid(&self, out: &mut Vec<String>, candidate: Option<&str>) {
        if let Some(address) = candidate {
            if self.classifier.is_valid(address) {
                out.push(address.to_string());
            }
        }
    }

    async fn fetch_summary(&self, address: &str) -> Result<BalanceSummary, ReadError> {
        let url = format!("{}/balances/{}/summary", self.base_url, address);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ReadError::Retryable(format!(
                "indexer returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .json::<BalanceSummary>()
            .await
            .map_err(ReadError::from)
    }
}

#[async_trait]
impl BalanceReader for BitcoinBalanceReader {
    fn name(&self) -> &'static str {
        "bitcoin"
    }

    fn family(&self) -> Blockchain {
        Blockchain::Bitcoin
    }

    fn get_addresses(&self, record: &WalletCredentialRecord) -> Vec<String> {
        let mut addresses = Vec::new();

        match record {
            WalletCredentialRecord::PrivateWallet(wallet) => {
                self.push_if_valid(&mut addresses, Some(&wallet.address));
            }
            WalletCredentialRecord::LegacyCredentials(wallet) => {
                self.push_if_valid(&mut addresses, wallet.address.as_deref());
                self.push_if_valid(&mut addresses, wallet.multi_sig.as_deref());
                self.push_if_valid(&mut addresses, wallet.colored_multi_sig.as_deref());
                self.push_if_valid(&mut addresses, wallet.btc_conversion_address.as_deref());
            }
            WalletCredentialRecord::BcnCredentials(record) => {
                self.push_if_valid(&mut addresses, record.address.as_deref());
                self.push_if_valid(&mut addresses, record.asset_address.as_deref());
            }
            WalletCredentialRecord::DepositWallet(wallet) => {
                if wallet.blockchain_id.eq_ignore_ascii_case("bitcoin") {
                    self.push_if_valid(&mut addresses, Some(&wallet.address));
                }
            }
        }

        addresses
    }

    fn select_unique_addresses(&self, addresses: &[String]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::new();

        for address in addresses {
            if let Some(canonical) = self.classifier.canonicalize(address) {
                if seen.insert(canonical.canonical.clone()) {
                    unique.push(canonical.canonical);
                }
            }
        }

        unique
    }

    fn select_related_assets<'a>(&'a self, assets: &[Asset]) -> &'a [Asset] {
        self.related_assets.get_or_init(|| {
            assets
                .iter()
                .filter(|asset| {
                    asset.id == BTC_ASSET_ID
                        || asset
                            .block_chain_asset_id
                            .as_deref()
                            .map(|id| self.classifier.is_colored_asset_id(id))
                            .unwrap_or(false)
                })
                .cloned()
                .collect()
        })
    }

    async fn read_balance(
        &self,
        assets: &[Asset],
        address: &str,
    ) -> Result<Vec<BalanceResult>, ReadError> {
        // A malformed address at this point is a per-address fatal, not a
        // transient indexer problem.
        if !self.classifier.is_valid(address) {
            return Err(ReadError::Fatal(format!(
                "invalid bitcoin address format: {}",
                address
            )));
        }

        let summary = self.fetch_summary(address).await?;

        let mut results = Vec::new();

        for asset in assets {
            let Some(colored_id) = asset.block_chain_asset_id.as_deref() else {
                continue;
            };
            if !self.classifier.is_colored_asset_id(colored_id) {
                continue;
            }

            let quantity = summary
                .spendable
                .assets
                .iter()
                .find(|balance| balance.asset_id == colored_id)
                .map(|balance| balance.quantity)
                .unwrap_or(0);

            let amount =
                convert_from_chain_units(quantity as i128, asset.multiplier_power, asset.accuracy)
                    .map_err(ReadError::fatal)?;

            results.push(BalanceResult {
                address: address.to_string(),
                amount,
                asset_id: asset.id.clone(),
            });
        }

        if assets.iter().any(|asset| asset.id == BTC_ASSET_ID) {
            let amount = convert_from_chain_units(
                summary.spendable.amount as i128,
                BTC_DECIMALS,
                BTC_DECIMALS,
            )
            .map_err(ReadError::fatal)?;

            results.push(BalanceResult {
                address: address.to_string(),
                amount,
                asset_id: BTC_ASSET_ID.to_string(),
            });
        }

        Ok(results)
    }
}
