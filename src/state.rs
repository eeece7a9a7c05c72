use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::catalog::{CatalogClient, OpenFoodFactsClient};
use crate::config::AppConfig;
use crate::food::{FoodResolver, LabelParser};
use crate::ledger::{InMemoryLedgerStore, Ledger, LedgerStore, PgLedgerStore};
use crate::scan::ScanSession;
use crate::search::SearchController;

/// Wired-up engine. Collaborators are passed in, never global.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: FoodResolver,
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let catalog = Arc::new(OpenFoodFactsClient::new(&config.catalog)?) as Arc<dyn CatalogClient>;

        let store: Arc<dyn LedgerStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                // a failed migration leaves the schema as it was
                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    warn!(error = %e, "migration failed; continuing");
                }
                info!("ledger backed by postgres");
                Arc::new(PgLedgerStore::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; ledger is in-memory and lost on exit");
                Arc::new(InMemoryLedgerStore::new())
            }
        };

        Self::from_parts(config, catalog, store)
    }

    pub fn from_parts(
        config: AppConfig,
        catalog: Arc<dyn CatalogClient>,
        store: Arc<dyn LedgerStore>,
    ) -> anyhow::Result<Self> {
        let parser = LabelParser::new(&config.label).context("compile label patterns")?;
        Ok(Self {
            resolver: FoodResolver::new(catalog, parser),
            ledger: Arc::new(Ledger::new(store)),
            config: Arc::new(config),
        })
    }

    pub fn search_controller(&self) -> SearchController {
        SearchController::new(self.resolver.clone(), self.config.search.clone())
    }

    pub fn scan_session(&self) -> ScanSession {
        ScanSession::new(
            self.resolver.clone(),
            self.ledger.clone(),
            self.config.notice_ttl(),
        )
    }
}
