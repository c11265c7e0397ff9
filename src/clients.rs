/// Client identity enumeration.
///
/// Client ids come either from the paginated client-account directory or
/// from a static file with one id per line. Both are exposed through the
/// `IdentitySource` trait the batch driver drains: every call yields the
/// next page, `None` once the population is exhausted. A static file is a
/// single page.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdsPage {
    pub ids: Vec<String>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// HTTP client for the client-account directory.
pub struct ClientAccountClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClientAccountClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_ids(&self, continuation_token: Option<&str>) -> Result<IdsPage> {
        let url = format!("{}/api/clients/ids", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(token) = continuation_token {
            request = request.query(&[("continuation", token)]);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Client account request failed: {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Client account directory returned {} for {}",
                response.status(),
                url
            ));
        }

        response
            .json::<IdsPage>()
            .await
            .context("Failed to decode client id page")
    }
}

/// A paged source of client ids.
#[async_trait]
pub trait IdentitySource: Send {
    /// The next batch of client ids, or `None` when enumeration is done.
    async fn next_page(&mut self) -> Result<Option<Vec<String>>>;
}

/// Token-driven enumeration of the client-account directory.
pub struct DirectorySource {
    client: ClientAccountClient,
    continuation_token: Option<String>,
    exhausted: bool,
}

impl DirectorySource {
    pub fn new(client: ClientAccountClient) -> Self {
        Self {
            client,
            continuation_token: None,
            exhausted: false,
        }
    }
}

#[async_trait]
impl IdentitySource for DirectorySource {
    async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .client
            .get_ids(self.continuation_token.as_deref())
            .await?;

        self.continuation_token = page.continuation_token;
        // A null token marks the terminal page; it is still processed.
        self.exhausted = self.continuation_token.is_none();

        Ok(Some(page.ids))
    }
}

/// Static pre-supplied id list: one pass, no pagination.
pub struct FileSource {
    path: String,
    consumed: bool,
}

impl FileSource {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            consumed: false,
        }
    }
}

#[async_trait]
impl IdentitySource for FileSource {
    async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read client ids file: {}", self.path))?;

        let ids = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Some(ids))
    }
}
