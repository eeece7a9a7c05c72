use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use time::Date;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::errors::{LedgerError, ResolveError};
use crate::food::{FoodResolver, NutrientQuantity, PortionRequest, RecognizedText, ResolutionOutcome};
use crate::ledger::{Ledger, LedgerEntry, MealType};

/// State rendered by the scan screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanView {
    pub candidate: Option<NutrientQuantity>,
    pub loading: bool,
    pub notice: Option<String>, // transient, auto-dismissed
    pub meal_type: MealType,
}

impl Default for ScanView {
    fn default() -> Self {
        Self {
            candidate: None,
            loading: false,
            notice: None,
            meal_type: MealType::Snack,
        }
    }
}

#[derive(Default)]
struct Inner {
    view: ScanView,
    last_barcode: Option<String>,
    epoch: u64,        // bumped by reset(); results from an older epoch are stale
    notice_seq: u64,
}

/// One scanning flow: detect, review the candidate, confirm into the ledger.
pub struct ScanSession {
    resolver: FoodResolver,
    ledger: Arc<Ledger>,
    notice_ttl: Duration,
    inner: Arc<Mutex<Inner>>,
    view_tx: Arc<watch::Sender<ScanView>>,
}

impl ScanSession {
    pub fn new(resolver: FoodResolver, ledger: Arc<Ledger>, notice_ttl: Duration) -> Self {
        let (tx, _) = watch::channel(ScanView::default());
        Self {
            resolver,
            ledger,
            notice_ttl,
            inner: Arc::new(Mutex::new(Inner::default())),
            view_tx: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> ScanView {
        self.view_tx.borrow().clone()
    }

    pub fn set_meal_type(&self, meal_type: MealType) {
        self.update(|inner| inner.view.meal_type = meal_type);
    }

    /// Handles a decoded barcode.
    ///
    /// Returns `None` when the code was ignored: a lookup is already running,
    /// the same code was just matched, or the session was reset meanwhile.
    pub async fn on_barcode_detected(
        &self,
        code: &str,
    ) -> Option<Result<NutrientQuantity, ResolveError>> {
        let epoch = {
            let mut inner = self.lock();
            if inner.view.loading || inner.last_barcode.as_deref() == Some(code) {
                return None;
            }
            inner.last_barcode = Some(code.to_string());
            inner.view.loading = true;
            inner.view.notice = None;
            self.view_tx.send_replace(inner.view.clone());
            inner.epoch
        };
        debug!(%code, "barcode detected");

        let result = self.resolver.resolve_by_barcode(code).await;

        let mut inner = self.lock();
        if inner.epoch != epoch || inner.last_barcode.as_deref() != Some(code) {
            debug!(%code, "stale barcode result dropped");
            return None;
        }
        inner.view.loading = false;
        match &result {
            Ok(food) => inner.view.candidate = Some(food.clone()),
            Err(e) => {
                // forget the code so the next scan of it retries
                inner.last_barcode = None;
                self.post_notice(&mut inner, e.to_string());
            }
        }
        self.view_tx.send_replace(inner.view.clone());
        Some(result)
    }

    /// Handles OCR output from a captured photo.
    pub async fn on_label_text(&self, ocr: &RecognizedText) -> ResolutionOutcome {
        let epoch = {
            let mut inner = self.lock();
            inner.view.loading = true;
            inner.view.notice = None;
            self.view_tx.send_replace(inner.view.clone());
            inner.epoch
        };

        let outcome = self.resolver.resolve_from_label_text(ocr).await;

        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.view.loading = false;
            inner.view.candidate = Some(match &outcome {
                ResolutionOutcome::LabelEnergy(food) | ResolutionOutcome::CatalogMatch(food) => {
                    food.clone()
                }
                ResolutionOutcome::ManualEntryRequired => NutrientQuantity::blank("", ""),
            });
            self.view_tx.send_replace(inner.view.clone());
        }
        outcome
    }

    /// Replaces the candidate with an empty user-entered record.
    pub fn start_manual_entry(&self) {
        self.update(|inner| inner.view.candidate = Some(NutrientQuantity::blank("", "")));
    }

    /// Makes a search suggestion (or an edited record) the candidate.
    pub fn select(&self, food: NutrientQuantity) {
        self.update(|inner| inner.view.candidate = Some(food));
    }

    /// Logs the candidate at `portion` and clears it.
    pub async fn confirm(
        &self,
        portion: &PortionRequest,
        day: Date,
    ) -> Result<LedgerEntry, LedgerError> {
        let (food, meal_type) = {
            let inner = self.lock();
            match &inner.view.candidate {
                Some(food) => (food.clone(), inner.view.meal_type),
                None => return Err(LedgerError::InvalidInput("nothing to log".into())),
            }
        };

        match self.ledger.log_food(&food, portion, meal_type, day).await {
            Ok(entry) => {
                info!(name = %entry.name, kcal = entry.calories, meal = %meal_type, "food logged");
                self.update(|inner| {
                    inner.view.candidate = None;
                    inner.last_barcode = None;
                });
                Ok(entry)
            }
            Err(e) => {
                let mut inner = self.lock();
                if matches!(e, LedgerError::StaleTotal(_)) {
                    // already saved, logging it again would double count
                    inner.view.candidate = None;
                    inner.last_barcode = None;
                }
                self.post_notice(&mut inner, e.to_string());
                self.view_tx.send_replace(inner.view.clone());
                Err(e)
            }
        }
    }

    /// Back to a clean scanner. In-flight results become stale.
    pub fn reset(&self) {
        self.update(|inner| {
            inner.epoch += 1;
            inner.last_barcode = None;
            inner.view.candidate = None;
            inner.view.loading = false;
            inner.view.notice = None;
        });
    }

    fn update(&self, f: impl FnOnce(&mut Inner)) {
        let mut inner = self.lock();
        f(&mut inner);
        self.view_tx.send_replace(inner.view.clone());
    }

    // caller publishes the view
    fn post_notice(&self, inner: &mut Inner, message: String) {
        inner.notice_seq += 1;
        let seq = inner.notice_seq;
        inner.view.notice = Some(message);

        let state = self.inner.clone();
        let tx = self.view_tx.clone();
        let ttl = self.notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut inner = state.lock().unwrap_or_else(|p| p.into_inner());
            if inner.notice_seq == seq {
                inner.view.notice = None;
                tx.send_replace(inner.view.clone());
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod scan_tests {
    use time::macros::date;

    use super::*;
    use crate::catalog::fake::{product, FakeCatalog};
    use crate::food::{LabelParser, Source};
    use crate::ledger::InMemoryLedgerStore;

    const CODE: &str = "5201234567890";
    const TTL: Duration = Duration::from_secs(3);

    fn session(catalog: &Arc<FakeCatalog>) -> (Arc<Ledger>, Arc<ScanSession>) {
        let ledger = Arc::new(Ledger::new(Arc::new(InMemoryLedgerStore::new())));
        let resolver = FoodResolver::new(catalog.clone(), LabelParser::default());
        (ledger.clone(), Arc::new(ScanSession::new(resolver, ledger, TTL)))
    }

    #[tokio::test(start_paused = true)]
    async fn matched_code_is_not_looked_up_again() {
        let catalog = Arc::new(FakeCatalog::new().with_product(CODE, product("Feta", 264.0, 0.5)));
        let (_, scan) = session(&catalog);

        let food = scan.on_barcode_detected(CODE).await.unwrap().unwrap();
        assert_eq!(food.sodium_mg, 200.0);
        assert!(scan.on_barcode_detected(CODE).await.is_none());
        assert_eq!(catalog.lookup_calls(), 1);
        assert_eq!(scan.view().candidate, Some(food));
    }

    #[tokio::test(start_paused = true)]
    async fn detections_during_a_lookup_are_ignored() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_product(CODE, product("Feta", 264.0, 0.5))
                .with_delay(Duration::from_millis(200)),
        );
        let (_, scan) = session(&catalog);

        let first = {
            let scan = scan.clone();
            tokio::spawn(async move { scan.on_barcode_detected(CODE).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(scan.view().loading);
        assert!(scan.on_barcode_detected("4006381333931").await.is_none());

        assert!(first.await.unwrap().unwrap().is_ok());
        assert_eq!(catalog.lookup_calls(), 1);
        assert!(!scan.view().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_allows_retry_and_notice_auto_dismisses() {
        let catalog = Arc::new(FakeCatalog::new());
        let (_, scan) = session(&catalog);

        let err = scan.on_barcode_detected(CODE).await.unwrap().unwrap_err();
        assert_eq!(err, ResolveError::not_found(CODE));
        let view = scan.view();
        assert_eq!(view.notice.as_deref(), Some("no results found for '5201234567890'"));
        assert!(!view.loading);

        // same code again is a fresh attempt
        assert!(scan.on_barcode_detected(CODE).await.is_some());
        assert_eq!(catalog.lookup_calls(), 2);

        tokio::time::sleep(TTL + Duration::from_millis(10)).await;
        assert_eq!(scan.view().notice, None);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_notice_survives_older_timer() {
        let catalog = Arc::new(FakeCatalog::new().failing("offline"));
        let (_, scan) = session(&catalog);

        scan.on_barcode_detected("1").await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        scan.on_barcode_detected("2").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        // first timer fired at 3s, second notice is still due until 5s
        assert!(scan.view().notice.is_some());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(scan.view().notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn result_after_reset_is_dropped() {
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_product(CODE, product("Feta", 264.0, 0.5))
                .with_delay(Duration::from_millis(500)),
        );
        let (_, scan) = session(&catalog);

        let pending = {
            let scan = scan.clone();
            tokio::spawn(async move { scan.on_barcode_detected(CODE).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        scan.reset();

        assert!(pending.await.unwrap().is_none());
        assert_eq!(scan.view(), ScanView::default());
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_logs_scaled_candidate() {
        let catalog = Arc::new(FakeCatalog::new().with_product(CODE, product("Feta", 264.0, 0.5)));
        let (ledger, scan) = session(&catalog);
        let totals = ledger.daily_total("2024-02-12").await.unwrap();

        scan.set_meal_type(MealType::Lunch);
        scan.on_barcode_detected(CODE).await.unwrap().unwrap();
        let entry = scan
            .confirm(&PortionRequest::grams(50.0).unwrap(), date!(2024 - 02 - 12))
            .await
            .unwrap();

        assert_eq!(entry.calories, 132);
        assert_eq!(entry.sodium_mg, 100.0);
        assert_eq!(entry.meal_type, MealType::Lunch);
        assert_eq!(totals.current().calories, 132);
        assert!(scan.view().candidate.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn saved_entry_with_stale_total_is_not_offered_again() {
        let catalog = Arc::new(FakeCatalog::new().with_product(CODE, product("Feta", 264.0, 0.5)));
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = Arc::new(Ledger::new(store.clone()));
        let resolver = FoodResolver::new(catalog.clone(), LabelParser::default());
        let scan = ScanSession::new(resolver, ledger.clone(), TTL);
        let _totals = ledger.daily_total("2024-02-12").await.unwrap();

        scan.on_barcode_detected(CODE).await.unwrap().unwrap();
        store.set_fail_reads(true);
        let err = scan
            .confirm(&PortionRequest::grams(50.0).unwrap(), date!(2024 - 02 - 12))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::StaleTotal(_)));
        assert!(scan.view().candidate.is_none());
        assert!(scan.view().notice.is_some());
        store.set_fail_reads(false);
        assert_eq!(ledger.entries_for_day("2024-02-12").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_without_candidate_is_invalid() {
        let (_, scan) = session(&Arc::new(FakeCatalog::new()));
        let err = scan
            .confirm(&PortionRequest::grams(50.0).unwrap(), date!(2024 - 02 - 12))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_label_falls_back_to_manual_template() {
        let (_, scan) = session(&Arc::new(FakeCatalog::new()));
        let outcome = scan
            .on_label_text(&RecognizedText::from_plain_text("blurry"))
            .await;
        assert_eq!(outcome, ResolutionOutcome::ManualEntryRequired);

        let candidate = scan.view().candidate.unwrap();
        assert_eq!(candidate.name, "");
        assert_eq!(candidate.calories, 0);
        assert_eq!(candidate.source, Source::UserEntered);
    }

    #[tokio::test(start_paused = true)]
    async fn selected_suggestion_becomes_candidate() {
        let (_, scan) = session(&Arc::new(FakeCatalog::new()));
        scan.select(NutrientQuantity::blank("Banana", ""));
        assert_eq!(scan.view().candidate.unwrap().name, "Banana");
        scan.start_manual_entry();
        assert_eq!(scan.view().candidate.unwrap().name, "");
    }
}
