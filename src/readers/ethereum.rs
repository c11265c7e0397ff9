/// Ethereum-family balance reader backed by the internal core service.
///
/// Observes native ether plus ERC-20 tokens whose contract address is
/// published as the asset's chain-asset id. Two requests per address: one
/// for the native balance, one batched call for every related token
/// contract.
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::assets::{convert_from_chain_units_str, Asset, Blockchain};
use crate::classifier::EthereumClassifier;
use crate::config::EthereumConfig;
use crate::errors::{ConfigError, ReadError};
use crate::records::WalletCredentialRecord;

use super::{BalanceReader, BalanceResult};

/// Chain-asset id marking native ether in the asset directory.
const ETH_CHAIN_ASSET_ID: &str = "ETH";

#[derive(Debug, Deserialize)]
struct NativeBalance {
    /// Wei, as a decimal string.
    amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalanceRequest<'a> {
    address: &'a str,
    contract_addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBalanceResponse {
    #[serde(default)]
    balances: Vec<TokenBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalance {
    contract_address: String,
    balance: String,
}

pub struct EthereumBalanceReader {
    http: reqwest::Client,
    base_url: String,
    classifier: EthereumClassifier,
    related_assets: OnceCell<Vec<Asset>>,
}

impl EthereumBalanceReader {
    pub fn new(config: &EthereumConfig) -> Result<Self, ConfigError> {
        if config.ethereum_core_url.is_empty() {
            return Err(ConfigError::MissingSetting("ethereum.ethereumCoreUrl"));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.ethereum_core_url.trim_end_matches('/').to_string(),
            classifier: EthereumClassifier::new(),
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

    fn is_token_contract(&self, asset: &Asset) -> bool {
        asset.blockchain == Blockchain::Ethereum
            && asset
                .block_chain_asset_id
                .as_deref()
                .map(|id| id != ETH_CHAIN_ASSET_ID && self.classifier.is_valid(id))
                .unwrap_or(false)
    }

    async fn fetch_native_balance(&self, address: &str) -> Result<NativeBalance, ReadError> {
        let url = format!("{}/api/rpc/balance/{}", self.base_url, address);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ReadError::Retryable(format!(
                "ethereum core returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .json::<NativeBalance>()
            .await
            .map_err(ReadError::from)
    }

    async fn fetch_token_balances(
        &self,
        address: &str,
        contracts: Vec<String>,
    ) -> Result<TokenBalanceResponse, ReadError> {
        let url = format!("{}/api/erc20/balance", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&TokenBalanceRequest {
                address,
                contract_addresses: contracts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReadError::Retryable(format!(
                "ethereum core returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .json::<TokenBalanceResponse>()
            .await
            .map_err(ReadError::from)
    }
}

#[async_trait]
impl BalanceReader for EthereumBalanceReader {
    fn name(&self) -> &'static str {
        "ethereum"
    }

    fn family(&self) -> Blockchain {
        Blockchain::Ethereum
    }

    fn get_addresses(&self, record: &WalletCredentialRecord) -> Vec<String> {
        let mut addresses = Vec::new();

        match record {
            WalletCredentialRecord::PrivateWallet(wallet) => {
                self.push_if_valid(&mut addresses, Some(&wallet.address));
            }
            WalletCredentialRecord::LegacyCredentials(wallet) => {
                self.push_if_valid(&mut addresses, wallet.eth_address.as_deref());
            }
            WalletCredentialRecord::BcnCredentials(record) => {
                self.push_if_valid(&mut addresses, record.address.as_deref());
                self.push_if_valid(&mut addresses, record.asset_address.as_deref());
            }
            WalletCredentialRecord::DepositWallet(wallet) => {
                if wallet.blockchain_id.eq_ignore_ascii_case("ethereum") {
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
                    asset.blockchain == Blockchain::Ethereum
                        && (asset.block_chain_asset_id.as_deref() == Some(ETH_CHAIN_ASSET_ID)
                            || self.is_token_contract(asset))
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
        let canonical = self.classifier.canonicalize(address).ok_or_else(|| {
            ReadError::Fatal(format!("invalid ethereum address format: {}", address))
        })?;
        let address = canonical.canonical.as_str();

        let mut results = Vec::new();

        // contract address (lowercased) -> asset
        let mut assets_by_contract: HashMap<String, &Asset> = HashMap::new();
        for asset in assets.iter().filter(|a| self.is_token_contract(a)) {
            if let Some(contract) = asset.block_chain_asset_id.as_deref() {
                assets_by_contract.insert(contract.to_ascii_lowercase(), asset);
            }
        }

        if !assets_by_contract.is_empty() {
            let contracts = assets_by_contract.keys().cloned().collect();
            let token_balances = self.fetch_token_balances(address, contracts).await?;

            for balance in token_balances.balances {
                let contract = balance.contract_address.to_ascii_lowercase();
                let Some(asset) = assets_by_contract.get(&contract) else {
                    // Unsolicited contract in the response; ignore.
                    continue;
                };

                let amount = convert_from_chain_units_str(
                    &balance.balance,
                    asset.multiplier_power,
                    asset.accuracy,
                )
                .map_err(ReadError::fatal)?;

                results.push(BalanceResult {
                    address: address.to_string(),
                    amount,
                    asset_id: asset.id.clone(),
                });
            }
        }

        if let Some(eth_asset) = assets
            .iter()
            .find(|a| a.block_chain_asset_id.as_deref() == Some(ETH_CHAIN_ASSET_ID))
        {
            let native = self.fetch_native_balance(address).await?;
            let amount = convert_from_chain_units_str(
                &native.amount,
                eth_asset.multiplier_power,
                eth_asset.accuracy,
            )
            .map_err(ReadError::fatal)?;

            results.push(BalanceResult {
                address: address.to_string(),
                amount,
                asset_id: eth_asset.id.clone(),
            });
        }

        Ok(results)
    }
}
