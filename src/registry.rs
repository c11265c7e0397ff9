/// Blockchain wallet registry client.
///
/// The registry is an external paginated service keyed by client GUID. A
/// not-found or validation-error response means "this client has no deposit
/// wallets" and is mapped to an empty result, not a failure.
use anyhow::{anyhow, Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::records::RegisteredDepositWallet;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletsPage {
    pub wallets: Vec<RegisteredDepositWallet>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

pub struct BlockchainWalletsClient {
    http: reqwest::Client,
    base_url: String,
}

impl BlockchainWalletsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One page of a client's registered wallets. `None` when the registry
    /// does not know the client.
    pub async fn try_get_client_wallets(
        &self,
        client_id: Uuid,
        take: u32,
        continuation_token: Option<&str>,
    ) -> Result<Option<WalletsPage>> {
        let url = format!("{}/api/wallets/client/{}", self.base_url, client_id);
        let mut request = self.http.get(&url).query(&[("take", take.to_string())]);
        if let Some(token) = continuation_token {
            request = request.query(&[("continuation", token)]);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Wallet registry request failed: {}", url))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => return Ok(None),
            status if !status.is_success() => {
                return Err(anyhow!("Wallet registry returned {} for {}", status, url));
            }
            _ => {}
        }

        let page = response
            .json::<WalletsPage>()
            .await
            .context("Failed to decode wallet registry page")?;

        Ok(Some(page))
    }

    /// Drains every page of a client's registered wallets.
    pub async fn get_all_client_wallets(
        &self,
        client_id: Uuid,
        page_size: u32,
    ) -> Result<Vec<RegisteredDepositWallet>> {
        let mut wallets = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = match self
                .try_get_client_wallets(client_id, page_size, continuation_token.as_deref())
                .await?
            {
                Some(page) => page,
                None => break,
            };

            wallets.extend(page.wallets);
            continuation_token = page.continuation_token;

            if continuation_token.is_none() {
                break;
            }
        }

        Ok(wallets)
    }
}
