pub mod dto;
#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::CatalogConfig;
pub use dto::{NutrientLevels, Nutriments, ProductPayload};
use dto::{ProductResponse, SearchResponse};

/// Remote food catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// `Ok(None)` when the catalog has no product for `code`.
    async fn lookup_by_code(&self, code: &str) -> anyhow::Result<Option<ProductPayload>>;
    async fn search_by_name(&self, query: &str) -> anyhow::Result<Vec<ProductPayload>>;
}

/// OpenFoodFacts over HTTP.
#[derive(Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl OpenFoodFactsClient {
    pub fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("build catalog http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }
}

#[async_trait]
impl CatalogClient for OpenFoodFactsClient {
    async fn lookup_by_code(&self, code: &str) -> anyhow::Result<Option<ProductPayload>> {
        let url = format!("{}/api/v0/product/{}.json", self.base_url, code);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json::<ProductResponse>()
            .await
            .context("decode product payload")?;
        debug!(%code, status = resp.status, "catalog lookup");
        Ok(match resp {
            ProductResponse {
                status: 1,
                product: Some(product),
            } => Some(product),
            _ => None,
        })
    }

    async fn search_by_name(&self, query: &str) -> anyhow::Result<Vec<ProductPayload>> {
        let url = format!("{}/cgi/search.pl", self.base_url);
        let page_size = self.page_size.to_string();
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json::<SearchResponse>()
            .await
            .context("decode search payload")?;
        debug!(%query, hits = resp.products.len(), "catalog search");
        Ok(resp.products)
    }
}
