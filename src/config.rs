use std::time::Duration;

use serde::Deserialize;

use crate::food::LabelPatterns;

/// `RUST_LOG` fallback for the binary.
pub const DEFAULT_LOG_FILTER: &str = "nutrilog=info,sqlx=warn";

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub page_size: u32,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.org".into(),
            timeout_secs: 30,
            page_size: 20,
            user_agent: concat!("nutrilog/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub min_query_len: usize,
    pub max_suggestions: usize,
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            min_query_len: 3,
            max_suggestions: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>, // in-memory ledger when unset
    pub catalog: CatalogConfig,
    pub search: SearchConfig,
    pub notice_ttl_ms: u64,
    pub label: LabelPatterns,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            catalog: CatalogConfig::default(),
            search: SearchConfig::default(),
            notice_ttl_ms: 3000,
            label: LabelPatterns::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();
        let catalog = CatalogConfig {
            base_url: std::env::var("CATALOG_BASE_URL").unwrap_or(d.catalog.base_url),
            timeout_secs: env_parse("CATALOG_TIMEOUT_SECS").unwrap_or(d.catalog.timeout_secs),
            page_size: env_parse("CATALOG_PAGE_SIZE").unwrap_or(d.catalog.page_size),
            user_agent: std::env::var("CATALOG_USER_AGENT").unwrap_or(d.catalog.user_agent),
        };
        let search = SearchConfig {
            debounce_ms: env_parse("SEARCH_DEBOUNCE_MS").unwrap_or(d.search.debounce_ms),
            min_query_len: env_parse("SEARCH_MIN_QUERY_LEN").unwrap_or(d.search.min_query_len),
            max_suggestions: env_parse("SEARCH_MAX_SUGGESTIONS")
                .unwrap_or(d.search.max_suggestions),
        };
        let label = LabelPatterns {
            kcal_tokens: env_list("LABEL_KCAL_TOKENS").unwrap_or(d.label.kcal_tokens),
            kj_tokens: env_list("LABEL_KJ_TOKENS").unwrap_or(d.label.kj_tokens),
        };
        if search.max_suggestions == 0 {
            anyhow::bail!("SEARCH_MAX_SUGGESTIONS must be at least 1");
        }
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            catalog,
            search,
            notice_ttl_ms: env_parse("NOTICE_TTL_MS").unwrap_or(d.notice_ttl_ms),
            label,
        })
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = std::env::var(key).ok()?;
    Some(
        raw.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn default_log_filter_parses() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.search.debounce(), Duration::from_millis(500));
        assert_eq!(cfg.search.min_query_len, 3);
        assert_eq!(cfg.search.max_suggestions, 5);
        assert_eq!(cfg.notice_ttl(), Duration::from_secs(3));
        assert!(cfg.catalog.user_agent.starts_with("nutrilog/"));
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn env_list_splits_and_trims() {
        std::env::set_var("NUTRILOG_TEST_TOKENS", " kcal, ккал ,,kkal ");
        assert_eq!(
            env_list("NUTRILOG_TEST_TOKENS"),
            Some(vec!["kcal".to_string(), "ккал".to_string(), "kkal".to_string()])
        );
        assert_eq!(env_list("NUTRILOG_TEST_TOKENS_UNSET"), None);
    }
}
