use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::{Date, OffsetDateTime};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, instrument, warn};

use super::repo::LedgerStore;
use super::repo_types::{parse_day_key, DailyTotal, LedgerEntry, MealType};
use crate::errors::LedgerError;
use crate::food::{scale_portion, NutrientQuantity, PortionRequest};

/// Live view of one day's total.
///
/// Holds the current value from the moment it is created and sees a new
/// value after every committed append or remove touching that day.
pub struct DailyTotalSubscription {
    rx: watch::Receiver<DailyTotal>,
}

impl DailyTotalSubscription {
    pub fn current(&self) -> DailyTotal {
        self.rx.borrow().clone()
    }

    /// Waits for the next total. `None` once the ledger is dropped.
    pub async fn changed(&mut self) -> Option<DailyTotal> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stream yielding the current total first, then every update.
    pub fn into_stream(self) -> WatchStream<DailyTotal> {
        WatchStream::new(self.rx)
    }
}

/// One day's push channel.
struct DayChannel {
    tx: watch::Sender<DailyTotal>,
    // serialises recompute + publish for this day only
    recompute: tokio::sync::Mutex<()>,
}

impl DayChannel {
    fn new(day: &str) -> Self {
        Self {
            tx: watch::channel(DailyTotal::zero(day)).0,
            recompute: tokio::sync::Mutex::new(()),
        }
    }
}

/// Append-only food log with per-day push aggregation.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    watchers: Mutex<HashMap<String, Arc<DayChannel>>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Durably writes `entry`. Subscribers of its day see the new total.
    ///
    /// `StaleTotal` means the entry was committed but the day's total could
    /// not be recomputed; do not append it again.
    #[instrument(skip(self, entry), fields(id = %entry.id, day = %entry.day))]
    pub async fn append(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        validate(entry)?;
        if let Err(e) = self.store.insert(entry).await {
            warn!(error = %e, "ledger append failed");
            return Err(LedgerError::storage(&e));
        }
        info!(name = %entry.name, kcal = entry.calories, "ledger append");
        self.publish(&entry.day).await
    }

    /// Deletes `entry` by id. Returns false when it was already gone.
    #[instrument(skip(self, entry), fields(id = %entry.id, day = %entry.day))]
    pub async fn remove(&self, entry: &LedgerEntry) -> Result<bool, LedgerError> {
        let removed = match self.store.delete(entry.id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "ledger remove failed");
                return Err(LedgerError::storage(&e));
            }
        };
        if removed {
            info!("ledger remove");
            self.publish(&entry.day).await?;
        }
        Ok(removed)
    }

    /// Scales `record` to `portion` and appends the snapshot under `day`.
    pub async fn log_food(
        &self,
        record: &NutrientQuantity,
        portion: &PortionRequest,
        meal_type: MealType,
        day: Date,
    ) -> Result<LedgerEntry, LedgerError> {
        let scaled = scale_portion(record, portion);
        let entry = LedgerEntry::from_scaled(
            record,
            &scaled,
            portion.to_grams(),
            meal_type,
            OffsetDateTime::now_utc(),
            day,
        );
        self.append(&entry).await?;
        Ok(entry)
    }

    pub async fn entries_for_day(&self, day: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.store
            .list_for_day(day)
            .await
            .map_err(|e| LedgerError::storage(&e))
    }

    /// Subscribes to `day`'s total. Days with no entries total zero.
    pub async fn daily_total(&self, day: &str) -> Result<DailyTotalSubscription, LedgerError> {
        // subscribe before unlocking the map so publish never drops this channel
        let (channel, mut rx) = {
            let mut watchers = self.lock_watchers();
            let channel = watchers
                .entry(day.to_string())
                .or_insert_with(|| Arc::new(DayChannel::new(day)))
                .clone();
            let rx = channel.tx.subscribe();
            (channel, rx)
        };
        let _guard = channel.recompute.lock().await;
        let total = self.compute(day).await?;
        // existing subscribers only hear about it if it actually moved
        channel.tx.send_if_modified(|current| {
            if *current == total {
                return false;
            }
            *current = total;
            true
        });
        let _ = rx.borrow_and_update();
        Ok(DailyTotalSubscription { rx })
    }

    async fn compute(&self, day: &str) -> Result<DailyTotal, LedgerError> {
        let entries = self.entries_for_day(day).await?;
        Ok(DailyTotal::from_entries(day, &entries))
    }

    // Recomputes from committed state; an incremental counter would drift under concurrent writes.
    async fn publish(&self, day: &str) -> Result<(), LedgerError> {
        let channel = {
            let mut watchers = self.lock_watchers();
            let Some(channel) = watchers.get(day).cloned() else {
                return Ok(());
            };
            if channel.tx.receiver_count() == 0 {
                watchers.remove(day);
                return Ok(());
            }
            channel
        };
        let _guard = channel.recompute.lock().await;
        match self.compute(day).await {
            Ok(total) => {
                debug!(%day, kcal = total.calories, entries = total.entries, "daily total");
                channel.tx.send_replace(total);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, %day, "daily total recompute failed");
                Err(LedgerError::StaleTotal(e.to_string()))
            }
        }
    }

    fn lock_watchers(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<DayChannel>>> {
        self.watchers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn validate(entry: &LedgerEntry) -> Result<(), LedgerError> {
    if parse_day_key(&entry.day).is_none() {
        return Err(LedgerError::InvalidInput(format!(
            "bad day key '{}'",
            entry.day
        )));
    }
    if !entry.portion_grams.is_finite() || entry.portion_grams <= 0.0 {
        return Err(LedgerError::InvalidInput(format!(
            "portion must be positive, got {}",
            entry.portion_grams
        )));
    }
    if entry.calories < 0 {
        return Err(LedgerError::InvalidInput(format!(
            "calories must not be negative, got {}",
            entry.calories
        )));
    }
    let amounts = [
        ("protein_g", entry.protein_g),
        ("carbs_g", entry.carbs_g),
        ("fat_g", entry.fat_g),
        ("fiber_g", entry.fiber_g),
        ("sugar_g", entry.sugar_g),
        ("sodium_mg", entry.sodium_mg),
        ("saturated_fat_g", entry.saturated_fat_g),
    ];
    for (field, value) in amounts {
        if !value.is_finite() || value < 0.0 {
            return Err(LedgerError::InvalidInput(format!(
                "{field} must be a non-negative number, got {value}"
            )));
        }
    }
    Ok(())
}
