use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CatalogClient, Nutriments, ProductPayload};

/// In-process catalog that records every call it receives.
#[derive(Default)]
pub struct FakeCatalog {
    products: HashMap<String, ProductPayload>,
    search_hits: Vec<ProductPayload>,
    fail_with: Option<String>,
    delay: Option<Duration>,
    lookups: AtomicUsize,
    searches: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, code: &str, product: ProductPayload) -> Self {
        self.products.insert(code.to_string(), product);
        self
    }

    pub fn with_search_hits(mut self, hits: Vec<ProductPayload>) -> Self {
        self.search_hits = hits;
        self
    }

    pub fn failing(mut self, detail: &str) -> Self {
        self.fail_with = Some(detail.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.lookup_calls() + self.search_queries().len()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn lookup_by_code(&self, code: &str) -> anyhow::Result<Option<ProductPayload>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(detail) = &self.fail_with {
            anyhow::bail!("{detail}");
        }
        Ok(self.products.get(code).cloned())
    }

    async fn search_by_name(&self, query: &str) -> anyhow::Result<Vec<ProductPayload>> {
        self.searches.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(detail) = &self.fail_with {
            anyhow::bail!("{detail}");
        }
        Ok(self.search_hits.clone())
    }
}

/// A catalog product with the given per-100 g energy and salt.
pub fn product(name: &str, kcal: f64, salt_g: f64) -> ProductPayload {
    ProductPayload {
        product_name: Some(name.to_string()),
        brands: Some("Acme".to_string()),
        nutriments: Some(Nutriments {
            energy_kcal: Some(kcal),
            proteins: Some(10.0),
            carbohydrates: Some(20.0),
            fat: Some(5.0),
            salt: Some(salt_g),
            ..Nutriments::default()
        }),
        ..ProductPayload::default()
    }
}
