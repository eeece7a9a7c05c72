use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::SearchConfig;
use crate::errors::ResolveError;
use crate::food::{FoodResolver, NutrientQuantity};

/// What the presentation layer renders under a search box.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuggestionState {
    pub suggestions: Vec<NutrientQuantity>,
    pub searching: bool,
}

/// Debounced type-ahead over the resolver's name search.
///
/// Each keystroke bumps a generation counter. A timer only fires its request
/// when its generation is still the latest, and a response is only applied
/// when no newer keystroke arrived while it was in flight.
pub struct SearchController {
    resolver: FoodResolver,
    config: SearchConfig,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<SuggestionState>>,
}

impl SearchController {
    pub fn new(resolver: FoodResolver, config: SearchConfig) -> Self {
        let (tx, _) = watch::channel(SuggestionState::default());
        Self {
            resolver,
            config,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SuggestionState {
        self.state.borrow().clone()
    }

    /// Schedules a search for `text`, superseding any pending one.
    ///
    /// Returns the timer task, or `None` when the query is too short and the
    /// suggestions were cleared instead. Must be called inside a tokio runtime.
    pub fn on_query_changed(&self, text: &str) -> Option<JoinHandle<()>> {
        let query = text.trim().to_string();
        let short = query.chars().count() < self.config.min_query_len;
        let mut my_gen = 0;
        self.state.send_modify(|s| {
            my_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if short {
                s.suggestions.clear();
                s.searching = false;
            } else {
                s.searching = true;
            }
        });
        if short {
            return None;
        }

        let resolver = self.resolver.clone();
        let generation = self.generation.clone();
        let state = self.state.clone();
        let debounce = self.config.debounce();
        let limit = self.config.max_suggestions;

        Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if generation.load(Ordering::SeqCst) != my_gen {
                return;
            }
            debug!(%query, "debounce elapsed, searching");
            let result = resolver.resolve_by_name(&query).await;
            // checked under the watch lock, which every state change also takes
            state.send_if_modified(|s| {
                if generation.load(Ordering::SeqCst) != my_gen {
                    debug!(%query, "stale search result dropped");
                    return false;
                }
                s.searching = false;
                match result {
                    Ok(mut hits) => {
                        hits.truncate(limit);
                        s.suggestions = hits;
                    }
                    Err(ResolveError::NotFound { .. }) => s.suggestions.clear(),
                    Err(e) => debug!(error = %e, "suggestion search failed"),
                }
                true
            });
        }))
    }

    /// Drops suggestions after the user picked one.
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            s.suggestions.clear();
            s.searching = false;
        });
    }
}

#[cfg(test)]
mod search_tests {
    use std::time::Duration;

    use super::*;
    use crate::catalog::fake::{product, FakeCatalog};
    use crate::catalog::ProductPayload;
    use crate::food::LabelParser;

    fn hits(n: usize) -> Vec<ProductPayload> {
        (0..n).map(|i| product(&format!("apple {i}"), 52.0, 0.0)).collect()
    }

    fn controller(catalog: &Arc<FakeCatalog>) -> SearchController {
        let resolver = FoodResolver::new(catalog.clone(), LabelParser::default());
        SearchController::new(resolver, SearchConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_sends_one_request_with_last_text() {
        let catalog = Arc::new(FakeCatalog::new().with_search_hits(hits(8)));
        let ctl = controller(&catalog);

        let mut handles = Vec::new();
        for q in ["app", "appl", "apple"] {
            handles.extend(ctl.on_query_changed(q));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(catalog.search_queries(), vec!["apple".to_string()]);
        let snap = ctl.snapshot();
        assert_eq!(snap.suggestions.len(), 5);
        assert_eq!(snap.suggestions[0].name, "apple 0");
        assert!(!snap.searching);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_sent_before_the_quiet_period() {
        let catalog = Arc::new(FakeCatalog::new().with_search_hits(hits(1)));
        let ctl = controller(&catalog);
        let handle = ctl.on_query_changed("kiwi").unwrap();

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(catalog.search_queries().is_empty());
        assert!(ctl.snapshot().searching);

        handle.await.unwrap();
        assert_eq!(catalog.search_queries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_clears_without_request() {
        let catalog = Arc::new(FakeCatalog::new().with_search_hits(hits(2)));
        let ctl = controller(&catalog);
        ctl.on_query_changed("apple").unwrap().await.unwrap();
        assert_eq!(ctl.snapshot().suggestions.len(), 2);

        assert!(ctl.on_query_changed("ap").is_none());
        assert!(ctl.on_query_changed("  a ").is_none());
        assert_eq!(ctl.snapshot(), SuggestionState::default());
        assert_eq!(catalog.search_queries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_result_is_ignored_after_input_moves_on() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_search_hits(hits(3))
                .with_delay(Duration::from_secs(1)),
        );
        let ctl = controller(&catalog);

        let first = ctl.on_query_changed("pear").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await; // request in flight
        let second = ctl.on_query_changed("peach").unwrap();

        first.await.unwrap();
        // the older request completed but must not touch the state
        let snap = ctl.snapshot();
        assert!(snap.suggestions.is_empty());
        assert!(snap.searching);

        second.await.unwrap();
        assert_eq!(
            catalog.search_queries(),
            vec!["pear".to_string(), "peach".to_string()]
        );
        let snap = ctl.snapshot();
        assert_eq!(snap.suggestions.len(), 3);
        assert!(!snap.searching);
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_does_not_overwrite_a_cleared_box() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_search_hits(hits(3))
                .with_delay(Duration::from_secs(1)),
        );
        let ctl = controller(&catalog);

        let pending = ctl.on_query_changed("pear").unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(ctl.on_query_changed("pe").is_none());
        let mut rx = ctl.subscribe();
        rx.borrow_and_update();

        pending.await.unwrap();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(ctl.snapshot(), SuggestionState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_only_clears_searching_flag() {
        let catalog = Arc::new(FakeCatalog::new().failing("dns error"));
        let ctl = controller(&catalog);
        let mut rx = ctl.subscribe();

        ctl.on_query_changed("banana").unwrap().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert!(!snap.searching);
        assert!(snap.suggestions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_results_clears_previous_suggestions() {
        let catalog = Arc::new(FakeCatalog::new());
        let ctl = controller(&catalog);
        ctl.state.send_modify(|s| s.suggestions = vec![NutrientQuantity::blank("old", "")]);

        ctl.on_query_changed("durian").unwrap().await.unwrap();
        assert!(ctl.snapshot().suggestions.is_empty());
    }
}
