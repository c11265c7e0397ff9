/// Balance readers, one per blockchain family.
///
/// A reader owns everything family-specific: which address fields of a
/// credential record belong to it, how addresses canonicalize and dedupe,
/// which assets it can observe, and how to turn an indexer response into
/// decimal amounts. The batch driver only ever talks to the trait.
pub mod bitcoin;
pub mod ethereum;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::assets::{Asset, Blockchain};
use crate::config::ToolConfig;
use crate::errors::{ConfigError, ReadError};
use crate::records::WalletCredentialRecord;

pub use bitcoin::BitcoinBalanceReader;
pub use ethereum::EthereumBalanceReader;

/// One observed balance: an address/amount pair for one asset, already in
/// human-readable units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceResult {
    pub address: String,
    pub amount: Decimal,
    pub asset_id: String,
}

#[async_trait]
pub trait BalanceReader: Send + Sync {
    /// Reader name for log lines.
    fn name(&self) -> &'static str;

    /// The chain family this reader observes.
    fn family(&self) -> Blockchain;

    /// Every address of this reader's family found in a credential record,
    /// filtered by the classifier's validity check. Fields that do not
    /// apply to a record shape yield nothing.
    fn get_addresses(&self, record: &WalletCredentialRecord) -> Vec<String>;

    /// Canonicalizes and deduplicates raw addresses, preserving first-seen
    /// order. Variant encodings of one underlying address collapse to a
    /// single entry.
    fn select_unique_addresses(&self, addresses: &[String]) -> Vec<String>;

    /// The subset of the global asset list this reader can observe,
    /// including the chain's native asset. Computed once per reader and
    /// memoized for the run.
    fn select_related_assets<'a>(&'a self, assets: &[Asset]) -> &'a [Asset];

    /// Queries the indexer for one address and returns one result per
    /// matched asset plus the chain's native asset.
    async fn read_balance(
        &self,
        assets: &[Asset],
        address: &str,
    ) -> Result<Vec<BalanceResult>, ReadError>;
}

/// Constructs the reader for every chain with settings present. Missing or
/// unparsable chain settings fail fast as configuration errors.
pub fn create_balance_readers(
    config: &ToolConfig,
) -> Result<Vec<Box<dyn BalanceReader>>, ConfigError> {
    let mut readers: Vec<Box<dyn BalanceReader>> = Vec::new();

    if let Some(bitcoin) = &config.bitcoin {
        readers.push(Box::new(BitcoinBalanceReader::new(bitcoin)?));
    }

    if let Some(ethereum) = &config.ethereum {
        readers.push(Box::new(EthereumBalanceReader::new(ethereum)?));
    }

    if readers.is_empty() {
        return Err(ConfigError::MissingSetting("bitcoin or ethereum"));
    }

    Ok(readers)
}

/// In single-asset mode the target asset's chain must have an enabled
/// reader.
pub fn ensure_reader_for_asset(
    readers: &[Box<dyn BalanceReader>],
    asset: &Asset,
) -> Result<(), ConfigError> {
    if readers.iter().any(|r| r.family() == asset.blockchain) {
        return Ok(());
    }

    Err(ConfigError::InvalidSetting {
        field: "assetId",
        reason: format!(
            "no balance reader configured for asset {} on {:?}",
            asset.id, asset.blockchain
        ),
    })
}
