/// Asset directory access and fixed-point amount conversion.
///
/// Assets are loaded once per run and immutable thereafter. Amounts are
/// `rust_decimal::Decimal` end to end; the chain-side integer representation
/// is only ever touched here.
use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Blockchain family an asset lives on. Families without a configured
/// reader are tolerated in the directory and ignored by both readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Blockchain {
    Bitcoin,
    Ethereum,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub blockchain: Blockchain,
    /// Chain-specific asset id: an Open Assets id on Bitcoin, an ERC-20
    /// contract address (or "ETH" for native ether) on Ethereum.
    #[serde(default)]
    pub block_chain_asset_id: Option<String>,
    pub multiplier_power: u32,
    pub accuracy: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("accuracy {accuracy} exceeds multiplier power {multiplier_power}")]
    AccuracyExceedsMultiplier { multiplier_power: u32, accuracy: u32 },
    #[error("amount '{0}' is not a chain integer")]
    InvalidRawAmount(String),
    #[error("precision {0} is outside the supported decimal range")]
    PrecisionOutOfRange(u32),
}

/// `rust_decimal` supports at most 28 fractional digits; directory entries
/// declaring more are malformed and must fail as values, not panics.
const MAX_DECIMAL_SCALE: u32 = 28;

fn pow10(exponent: u32) -> Result<i128, ConversionError> {
    10_i128
        .checked_pow(exponent)
        .ok_or(ConversionError::PrecisionOutOfRange(exponent))
}

/// Converts a raw on-chain integer quantity into a decimal amount in
/// human-readable units: truncating division by `10^(multiplierPower -
/// accuracy)`, then `accuracy` digits of sub-unit precision.
pub fn convert_from_chain_units(
    raw: i128,
    multiplier_power: u32,
    accuracy: u32,
) -> Result<Decimal, ConversionError> {
    if accuracy > multiplier_power {
        return Err(ConversionError::AccuracyExceedsMultiplier {
            multiplier_power,
            accuracy,
        });
    }
    if accuracy > MAX_DECIMAL_SCALE {
        return Err(ConversionError::PrecisionOutOfRange(accuracy));
    }

    let scaled = raw / pow10(multiplier_power - accuracy)?;
    Ok(Decimal::from_i128_with_scale(scaled, accuracy))
}

/// String form of the above, for backends that return integers as decimal
/// strings (wei amounts overflow 64 bits).
pub fn convert_from_chain_units_str(
    raw: &str,
    multiplier_power: u32,
    accuracy: u32,
) -> Result<Decimal, ConversionError> {
    let value: i128 = raw
        .trim()
        .parse()
        .map_err(|_| ConversionError::InvalidRawAmount(raw.to_string()))?;
    convert_from_chain_units(value, multiplier_power, accuracy)
}

/// Inverse of `convert_from_chain_units` for amounts with at most
/// `accuracy` fractional digits.
pub fn convert_to_chain_units(
    amount: Decimal,
    multiplier_power: u32,
    accuracy: u32,
) -> Result<i128, ConversionError> {
    if accuracy > multiplier_power {
        return Err(ConversionError::AccuracyExceedsMultiplier {
            multiplier_power,
            accuracy,
        });
    }
    if accuracy > MAX_DECIMAL_SCALE {
        return Err(ConversionError::PrecisionOutOfRange(accuracy));
    }

    let mut scaled = amount * Decimal::from_i128_with_scale(pow10(accuracy)?, 0);
    scaled = scaled.trunc();
    let value = i128::try_from(scaled.mantissa() / pow10(scaled.scale())?)
        .map_err(|_| ConversionError::InvalidRawAmount(amount.to_string()))?;

    value
        .checked_mul(pow10(multiplier_power - accuracy)?)
        .ok_or_else(|| ConversionError::InvalidRawAmount(amount.to_string()))
}

/// HTTP client for the asset directory.
pub struct AssetsClient {
    http: reqwest::Client,
    base_url: String,
}

impl AssetsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `None` when the directory has no asset with this id.
    pub async fn get(&self, asset_id: &str) -> Result<Option<Asset>> {
        let url = format!("{}/api/assets/{}", self.base_url, asset_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Asset service request failed: {}", url))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(anyhow!(
                "Asset service returned {} for {}",
                response.status(),
                url
            ));
        }

        let asset = response
            .json::<Asset>()
            .await
            .context("Failed to decode asset")?;

        Ok(Some(asset))
    }

    pub async fn get_all(&self) -> Result<Vec<Asset>> {
        let url = format!("{}/api/assets", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Asset service request failed: {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Asset service returned {} for {}",
                response.status(),
                url
            ));
        }

        response
            .json::<Vec<Asset>>()
            .await
            .context("Failed to decode asset list")
    }
}
